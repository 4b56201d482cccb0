//! Liveness handler.

use crate::models::HealthResponse;
use axum::Json;

/// Liveness probe. Does not contact the identity provider.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}
