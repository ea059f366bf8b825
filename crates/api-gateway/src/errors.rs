//! API gateway error types.
//!
//! Every token failure produces the same 401 body; the specific reason is
//! only logged and counted.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The verification key could not be fetched or parsed at boot.
    /// Protected traffic is refused for the life of the process.
    #[error("Public key distribution failed: {0}")]
    KeyDistributionFailure(String),

    #[error("Missing or malformed Authorization header")]
    MissingCredentials,

    /// Signature, expiry, structure or claim failure. The kind is logged by
    /// the caller, never returned.
    #[error("Invalid access token")]
    InvalidToken,

    #[error("No route for path")]
    RouteNotFound,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl GatewayError {
    /// HTTP status code for this error (for metrics labels).
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::KeyDistributionFailure(_) => 503,
            GatewayError::MissingCredentials | GatewayError::InvalidToken => 401,
            GatewayError::RouteNotFound => 404,
            GatewayError::PayloadTooLarge => 413,
            GatewayError::UpstreamUnavailable(_) => 502,
            GatewayError::Internal => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: &'static str,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            GatewayError::KeyDistributionFailure(reason) => {
                tracing::error!(target: "gateway.security", reason = %reason, "Rejecting protected request: no verification key");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Authentication is temporarily unavailable",
                )
            }
            GatewayError::MissingCredentials | GatewayError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required",
            ),
            GatewayError::RouteNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND", "Not found"),
            GatewayError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "Request body too large",
            ),
            GatewayError::UpstreamUnavailable(reason) => {
                tracing::warn!(target: "gateway.proxy", reason = %reason, "Upstream request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "BAD_GATEWAY",
                    "Upstream service unavailable",
                )
            }
            GatewayError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred",
            ),
        };

        let mut response = (
            status,
            Json(ErrorResponse {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"maintenance-match\""),
            );
        }

        response
    }
}
