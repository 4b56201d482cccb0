//! HTTP routes for the token verifier.
//!
//! Defines the Axum router and application state.

use crate::authenticator::Authenticator;
use crate::handlers;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Credential dispatcher; builds the JWT verifier on first use.
    pub authenticator: Arc<Authenticator>,
}

/// Build the application routes.
///
/// - `/health` - Liveness probe
/// - `/metrics` - Prometheus metrics endpoint
/// - `/v1/token/verify` - Bearer token check
/// - `/v1/authenticate` - Username/password check (JWT or static)
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/v1/token/verify", post(handlers::verify_token))
        .route("/v1/authenticate", post(handlers::authenticate))
        .with_state(state);

    // Metrics route with its own state
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
