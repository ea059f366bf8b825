//! HTTP routes for the API gateway.

use crate::handlers;
use crate::middleware::{authenticate, http_metrics_middleware, AuthState};
use crate::proxy::{self, ProxyState};
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Build the gateway router.
///
/// - `/health`, `/metrics` - served by the gateway itself, unauthenticated
/// - everything else - edge authentication, then the reverse proxy
/// - TraceLayer, 30 second timeout, HTTP metrics (outermost)
pub fn build_routes(
    auth_state: Arc<AuthState>,
    proxy_state: Arc<ProxyState>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let proxied = Router::new()
        .fallback(proxy::forward)
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            authenticate,
        ))
        .with_state(proxy_state);

    let health_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .with_state(auth_state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    health_routes
        .merge(metrics_routes)
        .fallback_service(proxied)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
