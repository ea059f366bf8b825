use crate::middleware::AuthState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub public_key_loaded: bool,
}

/// Liveness probe.
///
/// GET /health
///
/// Always 200 so the process is not restarted in a loop; `degraded` means
/// protected traffic is being refused for lack of a verification key.
#[tracing::instrument(skip_all, name = "gateway.health")]
pub async fn health_check(State(state): State<Arc<AuthState>>) -> Json<HealthResponse> {
    let public_key_loaded = state.verifier.is_some();
    Json(HealthResponse {
        status: if public_key_loaded { "healthy" } else { "degraded" }.to_string(),
        public_key_loaded,
    })
}
