//! Client for the auth service's public key endpoint.
//!
//! The gateway fetches the key exactly once, before it accepts traffic. There
//! is no cache refresh: key rotation is a restart-time operation.

use crate::errors::GatewayError;
use common::jwt::TokenVerifier;
use common::types::PublicKeyResponse;
use std::time::Duration;
use tracing::instrument;

/// Timeout for the boot-time fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PublicKeyClient {
    url: String,
    http_client: reqwest::Client,
}

impl PublicKeyClient {
    pub fn new(url: String) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "gateway.auth.public_key", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self { url, http_client }
    }

    /// Fetch the key and build a verifier from it.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::KeyDistributionFailure` on any transport error,
    /// non-2xx status, unreadable body, or unusable key.
    #[instrument(skip_all, fields(url = %self.url))]
    pub async fn fetch_once(&self) -> Result<TokenVerifier, GatewayError> {
        tracing::debug!(target: "gateway.auth.public_key", "Fetching public key");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| GatewayError::KeyDistributionFailure(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(GatewayError::KeyDistributionFailure(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        let body: PublicKeyResponse = response.json().await.map_err(|e| {
            GatewayError::KeyDistributionFailure(format!("unreadable response body: {e}"))
        })?;

        let verifier = TokenVerifier::from_base64_der(&body.public_key)
            .map_err(|e| GatewayError::KeyDistributionFailure(format!("unusable key: {e}")))?;

        tracing::info!(
            target: "gateway.auth.public_key",
            key_id = %verifier.key_id(),
            "Public key loaded"
        );
        Ok(verifier)
    }
}
