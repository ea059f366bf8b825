//! Login, signup, refresh and logout endpoints.
//!
//! Handlers only translate HTTP to `IssuerService` calls; none of them log
//! request bodies.

use crate::errors::AuthError;
use crate::models::{LoginRequest, RefreshTokenRequest, SignUpRequest, TokenResponse};
use crate::observability::metrics::record_error;
use crate::observability::ErrorCategory;
use crate::routes::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::instrument;

/// Count a failed operation by category and response status.
pub(crate) fn observe<T>(operation: &str, result: Result<T, AuthError>) -> Result<T, AuthError> {
    if let Err(e) = &result {
        record_error(operation, ErrorCategory::from(e).as_str(), e.status_code());
    }
    result
}

/// POST /api/auth/login
#[instrument(name = "auth.login", skip_all, fields(status))]
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let result = state
        .issuer
        .authenticate(&payload.email, &payload.password)
        .await;

    tracing::Span::current().record("status", if result.is_ok() { "success" } else { "error" });
    Ok(Json(observe("login", result)?))
}

/// POST /api/auth/signup/user
///
/// Users are active immediately and receive a token pair.
#[instrument(name = "auth.signup.user", skip_all)]
pub async fn handle_signup_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let tokens = observe("signup_user", state.issuer.signup_user(payload).await)?;
    Ok(Json(tokens))
}

/// POST /api/auth/signup/maintainer
///
/// Returns 202 Accepted with no body; the account awaits approval.
#[instrument(name = "auth.signup.maintainer", skip_all)]
pub async fn handle_signup_maintainer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignUpRequest>,
) -> Result<StatusCode, AuthError> {
    observe(
        "signup_maintainer",
        state.issuer.signup_maintainer(payload).await,
    )?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/auth/refresh
///
/// 403 when the refresh token is unknown, already used, or expired.
#[instrument(name = "auth.refresh", skip_all, fields(status))]
pub async fn handle_refresh(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let result = state.issuer.rotate(&payload.refresh_token).await;

    tracing::Span::current().record("status", if result.is_ok() { "success" } else { "error" });
    Ok(Json(observe("refresh", result)?))
}

/// POST /api/auth/logout
///
/// Discards the refresh token. Always 204 so the endpoint cannot be used to
/// probe for live secrets.
#[instrument(name = "auth.logout", skip_all)]
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RefreshTokenRequest>,
) -> Result<StatusCode, AuthError> {
    observe("logout", state.issuer.revoke(&payload.refresh_token).await)?;
    Ok(StatusCode::NO_CONTENT)
}
