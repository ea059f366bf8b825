//! Gateway middleware.

pub mod auth;
pub mod http_metrics;

pub use auth::{authenticate, AuthState};
pub use http_metrics::http_metrics_middleware;
