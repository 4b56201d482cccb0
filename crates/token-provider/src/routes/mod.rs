//! HTTP routes for the token provider.

use crate::handlers;
use axum::{
    routing::{get, post},
    Router,
};
use common::host::TokenProvider;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Outbound token source.
    pub provider: Arc<dyn TokenProvider>,
}

/// Build the application routes.
///
/// - `/health` - Liveness probe
/// - `/metrics` - Prometheus metrics endpoint
/// - `/v1/token` - Obtain an outbound token
/// - TraceLayer for request logging
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/v1/token", post(handlers::get_token))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
