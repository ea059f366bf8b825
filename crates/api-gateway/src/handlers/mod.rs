//! Handlers served by the gateway itself.

mod health;
mod metrics;

pub use health::{health_check, HealthResponse};
pub use metrics::metrics_handler;
