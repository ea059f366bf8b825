use crate::observability::metrics::record_public_key_request;
use crate::routes::AppState;
use axum::{
    extract::State,
    http::header::{HeaderMap, HeaderValue, CACHE_CONTROL},
    Json,
};
use common::types::PublicKeyResponse;
use std::sync::Arc;
use tracing::instrument;

/// Handle public key request
///
/// GET /api/auth/public-key
///
/// Returns the issuer's RSA public key as base64 DER (SubjectPublicKeyInfo).
/// Unauthenticated; the key is public by nature. Cacheable for an hour.
#[instrument(name = "auth.public_key.get", skip_all, fields(key_id = %state.issuer.keys().key_id()))]
pub async fn handle_get_public_key(
    State(state): State<Arc<AppState>>,
) -> (HeaderMap, Json<PublicKeyResponse>) {
    record_public_key_request();

    let mut headers = HeaderMap::new();
    headers.insert(
        CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=3600"),
    );

    (
        headers,
        Json(PublicKeyResponse {
            public_key: state.issuer.keys().public_key_base64(),
        }),
    )
}
