//! Token verifier
//!
//! Host adapter exposing bearer token verification and username/password
//! authentication over HTTP.

use common::observability::init_tracing;
use std::net::SocketAddr;
use std::sync::Arc;
use token_verifier::authenticator::Authenticator;
use token_verifier::config::Config;
use token_verifier::observability::metrics::init_metrics_recorder;
use token_verifier::routes::{self, AppState};
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    init_tracing(&config.logging, &["token_verifier", "common"])?;

    info!("Starting token verifier");
    info!(
        bind_address = %config.bind_address,
        jwks_url = %config.jwks_url,
        allowed_issuers = ?config.allowed_issuers,
        required_scopes = ?config.required_scopes,
        jwks_cache_seconds = config.jwks_cache_lifetime.as_secs(),
        static_users = config.static_users.len(),
        "Configuration loaded successfully"
    );

    if config.allow_any_issuer && config.allowed_issuers.is_empty() {
        warn!("ALLOW_ANY_ISSUER is set: tokens from any issuer will be accepted");
    }

    let metrics_handle = init_metrics_recorder().map_err(|e| {
        error!("Failed to initialize metrics recorder: {}", e);
        e
    })?;

    let bind_address = config.bind_address.clone();

    let state = Arc::new(AppState {
        authenticator: Arc::new(Authenticator::from_config(&config)),
    });

    let app = routes::build_routes(state, metrics_handle);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Token verifier listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Token verifier shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
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
}
