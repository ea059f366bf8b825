//! Liveness/readiness endpoint.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::instrument;

/// GET /health
///
/// With PostgreSQL configured, pings the database and reports 503 when it
/// is unreachable. In-memory deployments are always healthy.
#[instrument(name = "auth.health", skip_all)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let Some(pool) = &state.pool else {
        return (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                storage: "memory".to_string(),
            }),
        );
    };

    if sqlx::query("SELECT 1").fetch_one(pool).await.is_ok() {
        (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                storage: "postgres".to_string(),
            }),
        )
    } else {
        tracing::warn!(target: "auth.health", "Database ping failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy".to_string(),
                storage: "postgres".to_string(),
            }),
        )
    }
}
