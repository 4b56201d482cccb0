//! Host adapter request and response bodies.
//!
//! Request types carry raw credentials; their `Debug` impls redact them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Liveness response for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,

    /// Whether the JWT verifier has been built yet.
    pub verifier_initialized: bool,
}

/// Body of `POST /v1/token/verify`.
#[derive(Clone, Deserialize)]
pub struct VerifyTokenRequest {
    pub token: String,
}

impl fmt::Debug for VerifyTokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyTokenRequest")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Body of `POST /v1/authenticate`.
#[derive(Clone, Deserialize)]
pub struct AuthenticateRequest {
    #[serde(default)]
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AuthenticateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticateRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}
