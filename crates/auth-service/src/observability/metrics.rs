//! Metrics definitions for the auth service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code:
//! - `flow`: login, signup, refresh
//! - `status`: success, error
//! - `outcome`: success, not_found, expired, error
//! - `operation`: hash, verify (bcrypt); handler names (errors)
//! - `error_category`: authentication, request, cryptographic, internal
//! - `status_code`: HTTP status of the error response

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle used by `/metrics`.
///
/// # Errors
///
/// Returns error if a recorder is already installed in this process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("auth_token_issuance".to_string()),
            &[0.010, 0.025, 0.050, 0.100, 0.250, 0.350, 0.500, 1.000, 2.000],
        )
        .map_err(|e| format!("Failed to set token issuance buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("auth_bcrypt".to_string()),
            &[0.050, 0.100, 0.200, 0.300, 0.500, 1.000],
        )
        .map_err(|e| format!("Failed to set bcrypt buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record a token pair issuance attempt.
///
/// Metric: `auth_token_issuance_total`, `auth_token_issuance_duration_seconds`
/// Labels: `flow`, `status`
pub fn record_token_issuance(flow: &str, status: &str, duration: Duration) {
    histogram!("auth_token_issuance_duration_seconds", "flow" => flow.to_string(), "status" => status.to_string())
        .record(duration.as_secs_f64());

    counter!("auth_token_issuance_total", "flow" => flow.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record the outcome of a refresh token rotation.
///
/// Metric: `auth_refresh_rotations_total`
/// Labels: `outcome`
pub fn record_refresh_rotation(outcome: &str) {
    counter!("auth_refresh_rotations_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a logout (refresh token revocation).
///
/// Metric: `auth_refresh_revocations_total`
/// Labels: `found`
pub fn record_refresh_revocation(found: bool) {
    counter!("auth_refresh_revocations_total", "found" => found.to_string()).increment(1);
}

/// Record bcrypt duration.
///
/// Metric: `auth_bcrypt_duration_seconds`
/// Labels: `operation`
pub fn record_bcrypt_duration(operation: &str, duration: Duration) {
    histogram!("auth_bcrypt_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}

/// Record a request to the public-key endpoint.
///
/// Metric: `auth_public_key_requests_total`
pub fn record_public_key_request() {
    counter!("auth_public_key_requests_total").increment(1);
}

// ============================================================================
// Error Metrics
// ============================================================================

/// Record an error returned by a handler.
///
/// Metric: `auth_errors_total`
/// Labels: `operation`, `error_category`, `status_code`
pub fn record_error(operation: &str, error_category: &str, status_code: u16) {
    counter!("auth_errors_total",
        "operation" => operation.to_string(),
        "error_category" => error_category.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}
