//! Metrics definitions for the API gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gateway_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! - `outcome` (auth): public, authenticated, key_unavailable,
//!   missing_credentials, invalid_signature, expired, malformed,
//!   issued_in_future
//! - `route`: configured route prefixes, or "unmatched"
//! - `status`: success, client_error, server_error, upstream_error
//! - `method`: standard HTTP methods, else "OTHER"
//! - `operation` (errors): authenticate, proxy

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
            Matcher::Prefix("gateway_".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set gateway buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record an edge authentication decision.
///
/// Metric: `gateway_auth_decisions_total`
/// Labels: `outcome`
pub fn record_auth_decision(outcome: &'static str) {
    counter!("gateway_auth_decisions_total", "outcome" => outcome).increment(1);
}

/// Record an error response produced by the gateway itself.
///
/// Metric: `gateway_errors_total`
/// Labels: `operation`, `status_code`
pub fn record_error(operation: &'static str, status_code: u16) {
    counter!("gateway_errors_total",
        "operation" => operation,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Record a forwarded request.
///
/// Metric: `gateway_upstream_requests_total`, `gateway_upstream_request_duration_seconds`
/// Labels: `route`, `status`
pub fn record_upstream_request(route: &str, status: &'static str, duration: Duration) {
    histogram!("gateway_upstream_request_duration_seconds",
        "route" => route.to_string(),
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("gateway_upstream_requests_total",
        "route" => route.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record any HTTP response served by the gateway.
///
/// Metric: `gateway_http_requests_total`, `gateway_http_request_duration_seconds`
/// Labels: `method`, `status`
pub fn record_http_request(method: &str, status_code: u16, duration: Duration) {
    let method = normalize_method(method);
    let status = categorize_status_code(status_code);

    histogram!("gateway_http_request_duration_seconds",
        "method" => method,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("gateway_http_requests_total",
        "method" => method,
        "status" => status
    )
    .increment(1);
}

/// Categorize an HTTP status code.
pub fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        100..=399 => "success",
        400..=499 => "client_error",
        _ => "server_error",
    }
}

fn normalize_method(method: &str) -> &'static str {
    match method {
        "GET" => "GET",
        "POST" => "POST",
        "PUT" => "PUT",
        "PATCH" => "PATCH",
        "DELETE" => "DELETE",
        "HEAD" => "HEAD",
        "OPTIONS" => "OPTIONS",
        _ => "OTHER",
    }
}
