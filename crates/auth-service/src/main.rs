//! Auth Service
//!
//! Entry point. Loads the signing key (fatal on failure), selects PostgreSQL
//! or in-memory stores, and serves the auth API.

use auth_service::config::Config;
use auth_service::crypto::SigningKeyPair;
use auth_service::observability::metrics::init_metrics_recorder;
use auth_service::repositories::{
    IdentityStore, InMemoryIdentityStore, InMemoryRefreshTokenStore, PgIdentityStore,
    PgRefreshTokenStore, RefreshTokenStore,
};
use auth_service::routes::{self, AppState};
use auth_service::services::{IssuerService, IssuerSettings};
use sqlx::PgPool;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Auth Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        access_token_ttl_seconds = config.access_token_ttl_seconds,
        refresh_token_ttl_seconds = config.refresh_token_ttl_seconds,
        bcrypt_cost = config.bcrypt_cost,
        "Configuration loaded successfully"
    );

    // No signing key, no service
    let keys = SigningKeyPair::load(&config.private_key_path, config.public_key_path.as_deref())
        .map_err(|e| {
            error!(target: "auth.security", "Failed to load signing key: {}", e);
            e
        })?;

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let (pool, identities, refresh_tokens) = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let pool = connect_database(database_url).await?;

            sqlx::migrate!("../../migrations").run(&pool).await.map_err(|e| {
                error!("Failed to run database migrations: {}", e);
                e
            })?;
            info!("Database connection established");

            let identities: Arc<dyn IdentityStore> = Arc::new(PgIdentityStore::new(pool.clone()));
            let refresh_tokens: Arc<dyn RefreshTokenStore> =
                Arc::new(PgRefreshTokenStore::new(pool.clone()));
            (Some(pool), identities, refresh_tokens)
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory stores; all state is lost on restart");
            let identities: Arc<dyn IdentityStore> = Arc::new(InMemoryIdentityStore::new());
            let refresh_tokens: Arc<dyn RefreshTokenStore> =
                Arc::new(InMemoryRefreshTokenStore::new());
            (None, identities, refresh_tokens)
        }
    };

    let issuer = IssuerService::new(
        Arc::new(keys),
        identities,
        refresh_tokens,
        IssuerSettings::from(&config),
    )?;

    let state = Arc::new(AppState {
        issuer: Arc::new(issuer),
        pool,
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Auth Service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Auth Service shutdown complete");

    Ok(())
}

async fn connect_database(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let db_url_with_timeout = add_query_timeout(database_url, 5);
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&db_url_with_timeout)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    let drain_secs: u64 = std::env::var("AUTH_DRAIN_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    }
}

/// Adds statement_timeout to the database URL.
fn add_query_timeout(url: &str, timeout_secs: u32) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!(
        "{}{}options=-c%20statement_timeout%3D{}s",
        url, separator, timeout_secs
    )
}
