//! Identity injected by the gateway into forwarded requests.
//!
//! Services behind the gateway never see bearer tokens. They read the
//! `X-User-ID` / `X-User-Role` pair written by the gateway after it verified
//! the token, and they trust it only because the gateway is the sole network
//! path to them.

use crate::types::{Role, USER_ID_HEADER, USER_ROLE_HEADER};
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Authenticated caller as asserted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayIdentity {
    pub user_id: Uuid,
    pub role: Role,
}

/// Rejection when the identity headers are absent or unparsable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityRejection {
    #[error("Missing identity header: {0}")]
    Missing(&'static str),

    #[error("Invalid identity header: {0}")]
    Invalid(&'static str),
}

impl GatewayIdentity {
    /// Parse the identity headers.
    ///
    /// # Errors
    ///
    /// Returns `IdentityRejection` if either header is missing, not UTF-8,
    /// not a UUID (id), or not a known role.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, IdentityRejection> {
        let user_id = headers
            .get(USER_ID_HEADER)
            .ok_or(IdentityRejection::Missing(USER_ID_HEADER))?
            .to_str()
            .ok()
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or(IdentityRejection::Invalid(USER_ID_HEADER))?;

        let role = headers
            .get(USER_ROLE_HEADER)
            .ok_or(IdentityRejection::Missing(USER_ROLE_HEADER))?
            .to_str()
            .ok()
            .and_then(|v| v.parse::<Role>().ok())
            .ok_or(IdentityRejection::Invalid(USER_ROLE_HEADER))?;

        Ok(Self { user_id, role })
    }
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        tracing::debug!(target: "common.identity", reason = %self, "Rejecting request without gateway identity");
        let body = json!({
            "error": {
                "code": "UNAUTHORIZED",
                "message": "Authentication required",
            }
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for GatewayIdentity
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}
