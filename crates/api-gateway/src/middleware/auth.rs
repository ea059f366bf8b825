//! Edge authentication.
//!
//! Runs on every request routed to an upstream, in this order:
//!
//! 1. Strip caller-supplied identity headers.
//! 2. Public path: forward with no token required.
//! 3. No verification key: 503, whatever the token.
//! 4. Require `Authorization: Bearer <token>`.
//! 5. Verify locally against the cached key.
//! 6. Inject `X-User-ID` and `X-User-Role` from the verified claims.

use crate::errors::GatewayError;
use crate::observability::metrics::{record_auth_decision, record_error};
use crate::public_paths::PublicPaths;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use common::jwt::{TokenError, TokenVerifier};
use common::types::{USER_ID_HEADER, USER_ROLE_HEADER};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Authentication state, built once at boot and never mutated.
#[derive(Clone)]
pub struct AuthState {
    /// `None` when the boot-time key fetch failed; protected paths then fail
    /// closed for the life of the process.
    pub verifier: Option<Arc<TokenVerifier>>,

    pub public_paths: PublicPaths,
}

/// Remove identity headers the caller may have forged.
fn strip_identity_headers(headers: &mut HeaderMap) {
    headers.remove(USER_ID_HEADER);
    headers.remove(USER_ROLE_HEADER);
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is case-insensitive.
fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, GatewayError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            tracing::debug!(target: "gateway.middleware.auth", "Missing Authorization header");
            GatewayError::MissingCredentials
        })?;

    let (scheme, token) = value.split_once(' ').ok_or_else(|| {
        tracing::debug!(target: "gateway.middleware.auth", "Invalid Authorization header format");
        GatewayError::MissingCredentials
    })?;

    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        tracing::debug!(target: "gateway.middleware.auth", "Invalid Authorization header format");
        return Err(GatewayError::MissingCredentials);
    }

    Ok(token)
}

fn reject_token(kind: TokenError) -> GatewayError {
    match kind {
        TokenError::InvalidSignature => {
            tracing::warn!(target: "gateway.middleware.auth", kind = kind.kind(), "Token rejected");
        }
        TokenError::Expired | TokenError::Malformed | TokenError::IssuedInFuture => {
            tracing::debug!(target: "gateway.middleware.auth", kind = kind.kind(), "Token rejected");
        }
    }
    record_auth_decision(kind.kind());
    GatewayError::InvalidToken
}

/// Run the decision sequence, injecting identity headers on success.
fn authorize(state: &AuthState, req: &mut Request) -> Result<(), GatewayError> {
    strip_identity_headers(req.headers_mut());

    if state.public_paths.is_public(req.uri().path()) {
        record_auth_decision("public");
        return Ok(());
    }

    let Some(verifier) = state.verifier.as_ref() else {
        record_auth_decision("key_unavailable");
        return Err(GatewayError::KeyDistributionFailure(
            "verification key was not loaded at boot".to_string(),
        ));
    };

    let token = extract_bearer_token(req.headers()).inspect_err(|_| {
        record_auth_decision("missing_credentials");
    })?;

    let claims = verifier.verify(token).map_err(reject_token)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| reject_token(TokenError::Malformed))?;
    let user_id_value =
        HeaderValue::from_str(&user_id.to_string()).map_err(|_| GatewayError::Internal)?;

    let headers = req.headers_mut();
    headers.insert(USER_ID_HEADER, user_id_value);
    headers.insert(
        USER_ROLE_HEADER,
        HeaderValue::from_static(claims.role.as_str()),
    );

    tracing::debug!(target: "gateway.middleware.auth", role = %claims.role, "Request authenticated");
    record_auth_decision("authenticated");
    Ok(())
}

/// Authentication middleware for every proxied request.
#[instrument(skip_all, name = "gateway.middleware.auth", fields(path = %req.uri().path()))]
pub async fn authenticate(
    State(state): State<Arc<AuthState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    if let Err(e) = authorize(&state, &mut req) {
        record_error("authenticate", e.status_code());
        return Err(e);
    }

    Ok(next.run(req).await)
}
