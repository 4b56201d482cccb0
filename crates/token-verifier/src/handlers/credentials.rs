//! Credential handlers.
//!
//! Both endpoints answer 200 with `{success, status}` for every credential
//! outcome, accepted or not. Only an unreadable body produces an error
//! status.

use crate::errors::ApiError;
use crate::models::{AuthenticateRequest, VerifyTokenRequest};
use crate::routes::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use common::host::{PasswordAuthenticator, TokenInfo, VerifyResponse};
use std::sync::Arc;

/// Handler for POST /v1/token/verify
#[tracing::instrument(skip_all, name = "verifier.http.verify_token")]
pub async fn verify_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyTokenRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state.authenticator.verify_token(&request.token).await;
    Ok(Json(response))
}

/// Handler for POST /v1/authenticate
#[tracing::instrument(skip_all, name = "verifier.http.authenticate")]
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AuthenticateRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(request) = payload?;
    let response = state
        .authenticator
        .authenticate(&request.username, &request.password)
        .await;
    Ok(Json(response))
}
