//! API Gateway
//!
//! Entry point. Fetches the verification key once before accepting traffic,
//! then serves the authenticating reverse proxy.

use api_gateway::auth::PublicKeyClient;
use api_gateway::config::Config;
use api_gateway::middleware::AuthState;
use api_gateway::observability::metrics::init_metrics_recorder;
use api_gateway::proxy::{ProxyState, RouteTable};
use api_gateway::public_paths::PublicPaths;
use api_gateway::routes;
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
                .unwrap_or_else(|_| "api_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting API Gateway");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        auth_public_key_url = %config.auth_public_key_url,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        routes = config.routes.len(),
        public_paths = config.public_paths.len(),
        "Configuration loaded successfully"
    );

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    // One fetch, before any traffic. Failure is not fatal to the process but
    // every protected request is refused until restart.
    let clock_skew = Duration::from_secs(config.jwt_clock_skew_seconds.unsigned_abs());
    let verifier = match PublicKeyClient::new(config.auth_public_key_url.clone())
        .fetch_once()
        .await
    {
        Ok(verifier) => Some(Arc::new(verifier.with_clock_skew(clock_skew))),
        Err(e) => {
            error!(
                target: "gateway.security",
                error = %e,
                "FAILED TO FETCH PUBLIC KEY; protected routes will be refused until restart"
            );
            None
        }
    };

    let auth_state = Arc::new(AuthState {
        verifier,
        public_paths: PublicPaths::new(config.public_paths.clone()),
    });
    let proxy_state = Arc::new(ProxyState::new(RouteTable::new(config.routes.clone())));

    let app = routes::build_routes(auth_state, proxy_state, metrics_handle);

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("API Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.drain_seconds))
        .await?;

    info!("API Gateway shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
/// Returns when a shutdown signal is received and drain period is complete.
async fn shutdown_signal(drain_secs: u64) {
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

    if drain_secs > 0 {
        warn!("Draining connections for {} seconds...", drain_secs);
        tokio::time::sleep(Duration::from_secs(drain_secs)).await;
        info!("Drain period complete");
    } else {
        info!("Skipping drain period (GATEWAY_DRAIN_SECONDS=0)");
    }
}
