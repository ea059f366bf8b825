//! Observability for the auth service.
//!
//! Instrumentation uses `#[instrument(skip_all)]` with explicit fields.
//! Secrets, tokens, passwords and email addresses never appear in spans,
//! events, or metric labels.

pub mod metrics;

use crate::errors::AuthError;

/// Error category for the `error_category` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad credentials or refresh tokens
    Authentication,
    /// Rejected input (validation, duplicate email, unknown resource)
    Request,
    /// Key or signing failures
    Cryptographic,
    /// Storage failures
    Internal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Request => "request",
            ErrorCategory::Cryptographic => "cryptographic",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&AuthError> for ErrorCategory {
    fn from(err: &AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials
            | AuthError::RefreshTokenNotFound
            | AuthError::RefreshTokenExpired => ErrorCategory::Authentication,
            AuthError::EmailInUse | AuthError::BadRequest(_) | AuthError::NotFound(_) => {
                ErrorCategory::Request
            }
            AuthError::KeyLoadFailure(_) | AuthError::Crypto(_) => ErrorCategory::Cryptographic,
            AuthError::Database(_) => ErrorCategory::Internal,
        }
    }
}
