//! Outbound token handler.

use crate::models::TokenBody;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Handler for POST /v1/token
///
/// Always 200; failure is carried in `success` and `status`.
#[tracing::instrument(skip_all, name = "provider.http.get_token")]
pub async fn get_token(State(state): State<Arc<AppState>>) -> Json<TokenBody> {
    Json(TokenBody::from(state.provider.get_token().await))
}
