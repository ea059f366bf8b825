//! Test server harness for E2E testing
//!
//! Provides TestAuthServer for spawning real auth service instances in tests.

use crate::crypto_fixtures::SIGNING_KEY_PEM;
use auth_service::config::MIN_BCRYPT_COST;
use auth_service::crypto::{self, SigningKeyPair};
use auth_service::models::{Identity, NewIdentity, TokenResponse};
use auth_service::observability::metrics::init_metrics_recorder;
use auth_service::repositories::{
    IdentityStore, InMemoryIdentityStore, InMemoryRefreshTokenStore, PgIdentityStore,
    PgRefreshTokenStore, RefreshTokenStore,
};
use auth_service::routes::{self, AppState};
use auth_service::services::{IssuerService, IssuerSettings};
use common::secret::SecretString;
use common::types::Role;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Settings used by every harness instance: short-ish TTLs and the cheapest
/// accepted bcrypt cost.
pub fn test_issuer_settings() -> IssuerSettings {
    IssuerSettings {
        access_token_ttl_seconds: 900,
        refresh_token_ttl_seconds: 86_400,
        bcrypt_cost: MIN_BCRYPT_COST,
    }
}

/// Test harness for spawning the auth service in E2E tests
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_login_flow() -> Result<(), anyhow::Error> {
///     let server = TestAuthServer::spawn().await?;
///     server.create_user("alice@example.com", "correct-horse-battery").await?;
///
///     let response = reqwest::Client::new()
///         .post(format!("{}/api/auth/login", server.url()))
///         .json(&json!({"email": "alice@example.com", "password": "correct-horse-battery"}))
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthServer {
    addr: SocketAddr,
    issuer: Arc<IssuerService>,
    client: reqwest::Client,
    _handle: JoinHandle<()>,
}

impl TestAuthServer {
    /// Spawn a server on in-memory stores.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Sign with the fixture signing key
    /// - Start the HTTP server in the background
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        let identities: Arc<dyn IdentityStore> = Arc::new(InMemoryIdentityStore::new());
        let refresh_tokens: Arc<dyn RefreshTokenStore> =
            Arc::new(InMemoryRefreshTokenStore::new());
        Self::spawn_with_stores(identities, refresh_tokens, None).await
    }

    /// Spawn a server on PostgreSQL stores (typically from `#[sqlx::test]`).
    pub async fn spawn_with_pool(pool: PgPool) -> Result<Self, anyhow::Error> {
        let identities: Arc<dyn IdentityStore> = Arc::new(PgIdentityStore::new(pool.clone()));
        let refresh_tokens: Arc<dyn RefreshTokenStore> =
            Arc::new(PgRefreshTokenStore::new(pool.clone()));
        Self::spawn_with_stores(identities, refresh_tokens, Some(pool)).await
    }

    async fn spawn_with_stores(
        identities: Arc<dyn IdentityStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        pool: Option<PgPool>,
    ) -> Result<Self, anyhow::Error> {
        let keys = SigningKeyPair::from_pkcs8_pem(SIGNING_KEY_PEM)
            .map_err(|e| anyhow::anyhow!("Failed to load fixture signing key: {}", e))?;

        let issuer = Arc::new(IssuerService::new(
            Arc::new(keys),
            identities,
            refresh_tokens,
            test_issuer_settings(),
        )?);

        let state = Arc::new(AppState {
            issuer: Arc::clone(&issuer),
            pool,
        });

        let app = routes::build_routes(state, test_metrics_handle());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            issuer,
            client: reqwest::Client::new(),
            _handle: handle,
        })
    }

    /// Get the base URL of the test server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shared HTTP client
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// The issuer behind the server, for direct store access in tests.
    pub fn issuer(&self) -> &IssuerService {
        &self.issuer
    }

    /// Create an active USER identity with the given password.
    pub async fn create_user(&self, email: &str, password: &str) -> Result<Identity, anyhow::Error> {
        self.create_identity(email, password, Role::User, true).await
    }

    /// Create an identity directly in the store, bypassing signup validation.
    pub async fn create_identity(
        &self,
        email: &str,
        password: &str,
        role: Role,
        is_active: bool,
    ) -> Result<Identity, anyhow::Error> {
        let password_hash = crypto::hash_password(
            &SecretString::from(password.to_string()),
            self.issuer.settings().bcrypt_cost,
        )?;

        let identity = self
            .issuer
            .identities()
            .create(NewIdentity {
                email: email.to_string(),
                phone_number: crate::test_ids::TEST_PHONE_NUMBER.to_string(),
                first_name: "Test".to_string(),
                last_name: "Identity".to_string(),
                password_hash,
                role,
                is_active,
            })
            .await?;

        Ok(identity)
    }

    /// Log in over HTTP and return the token pair.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, anyhow::Error> {
        let response = self
            .client
            .post(format!("{}/api/auth/login", self.url()))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        anyhow::ensure!(
            response.status().is_success(),
            "login failed with status {}",
            response.status()
        );
        Ok(response.json().await?)
    }
}

impl Drop for TestAuthServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

/// Install the Prometheus recorder once per process; later servers get a
/// standalone handle.
fn test_metrics_handle() -> PrometheusHandle {
    match init_metrics_recorder() {
        Ok(handle) => handle,
        Err(_) => {
            use metrics_exporter_prometheus::PrometheusBuilder;
            PrometheusBuilder::new().build_recorder().handle()
        }
    }
}
