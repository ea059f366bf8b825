//! HTTP routes for the auth service.

use crate::handlers::{auth_handler, health, me_handler, metrics, public_key_handler};
use crate::services::IssuerService;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub issuer: Arc<IssuerService>,

    /// Present only when running against PostgreSQL; used by `/health`.
    pub pool: Option<PgPool>,
}

/// Build the application routes.
///
/// - `/api/auth/*` - login, signup, refresh, logout, public key (public)
/// - `/api/users/me` - current identity, trusts gateway-injected headers
/// - `/health`, `/metrics` - operational, unversioned
/// - TraceLayer for request logging, 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/api/auth/login", post(auth_handler::handle_login))
        .route("/api/auth/signup/user", post(auth_handler::handle_signup_user))
        .route(
            "/api/auth/signup/maintainer",
            post(auth_handler::handle_signup_maintainer),
        )
        .route("/api/auth/refresh", post(auth_handler::handle_refresh))
        .route("/api/auth/logout", post(auth_handler::handle_logout))
        .route(
            "/api/auth/public-key",
            get(public_key_handler::handle_get_public_key),
        )
        .route("/api/users/me", get(me_handler::handle_get_me))
        .route("/health", get(health::health_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .with_state(metrics_handle);

    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
