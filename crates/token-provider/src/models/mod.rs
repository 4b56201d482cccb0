//! Host adapter response bodies.

use common::host::TokenResponse;
use common::secret::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Liveness response for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Body of `POST /v1/token`. The token is redacted in Debug output.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenBody {
    pub success: bool,
    pub status: i32,
    pub token: String,
}

impl fmt::Debug for TokenBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBody")
            .field("success", &self.success)
            .field("status", &self.status)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl From<TokenResponse> for TokenBody {
    fn from(response: TokenResponse) -> Self {
        Self {
            success: response.success,
            status: response.status,
            token: response.token.expose_secret().to_string(),
        }
    }
}
