//! Auth service error types.
//!
//! Client-facing messages are generic. Underlying causes are logged
//! server-side in `IntoResponse`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Signing key could not be loaded. Fatal at boot.
    #[error("Failed to load signing key: {0}")]
    KeyLoadFailure(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptographic error: {0}")]
    Crypto(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Refresh token not found")]
    RefreshTokenNotFound,

    #[error("Refresh token expired")]
    RefreshTokenExpired,

    #[error("Email address already in use")]
    EmailInUse,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AuthError {
    /// HTTP status code for this error (for metrics labels).
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::KeyLoadFailure(_)
            | AuthError::Database(_)
            | AuthError::Crypto(_) => 500,
            AuthError::InvalidCredentials => 401,
            AuthError::RefreshTokenNotFound | AuthError::RefreshTokenExpired => 403,
            AuthError::EmailInUse | AuthError::BadRequest(_) => 400,
            AuthError::NotFound(_) => 404,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthError::KeyLoadFailure(err) | AuthError::Crypto(err) => {
                tracing::error!(target: "auth.crypto", error = %err, "Cryptographic operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CRYPTO_ERROR",
                    "An internal cryptographic error occurred".to_string(),
                )
            }
            AuthError::Database(err) => {
                tracing::error!(target: "auth.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "An internal database error occurred".to_string(),
                )
            }
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid email or password".to_string(),
            ),
            // Not found and expired are indistinguishable to the caller
            AuthError::RefreshTokenNotFound | AuthError::RefreshTokenExpired => (
                StatusCode::FORBIDDEN,
                "INVALID_REFRESH_TOKEN",
                "The refresh token is invalid or expired".to_string(),
            ),
            AuthError::EmailInUse => (
                StatusCode::BAD_REQUEST,
                "EMAIL_IN_USE",
                "Email address already in use.".to_string(),
            ),
            AuthError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            AuthError::NotFound(resource) => (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone()),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"maintenance-match\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        AuthError::Database(err.to_string())
    }
}
