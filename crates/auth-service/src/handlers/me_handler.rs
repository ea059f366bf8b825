//! Current identity handler.
//!
//! Reads the identity the gateway injected after verifying the bearer token.

use crate::errors::AuthError;
use crate::handlers::auth_handler::observe;
use crate::models::ProfileResponse;
use crate::routes::AppState;
use axum::{extract::State, Json};
use common::identity::GatewayIdentity;
use std::sync::Arc;
use tracing::instrument;

/// GET /api/users/me
#[instrument(name = "auth.me", skip_all, fields(role = %identity.role))]
pub async fn handle_get_me(
    State(state): State<Arc<AppState>>,
    identity: GatewayIdentity,
) -> Result<Json<ProfileResponse>, AuthError> {
    let found = observe(
        "get_me",
        state
            .issuer
            .identities()
            .find_by_id(identity.user_id)
            .await
            .and_then(|found| {
                found.ok_or_else(|| AuthError::NotFound("User not found".to_string()))
            }),
    )?;

    Ok(Json(found.into()))
}
