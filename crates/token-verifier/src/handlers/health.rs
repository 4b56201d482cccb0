//! Liveness handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Liveness probe.
///
/// Does not touch the identity provider. Reports whether the JWT verifier
/// has been built, which happens on the first token call.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        verifier_initialized: state.authenticator.is_verifier_initialized(),
    })
}
