//! Call contracts exposed to the host process.
//!
//! The host (a Kafka proxy) delegates three questions to this workspace:
//! is this bearer token valid, is this username/password valid, and give me
//! a token to send upstream. Each answer is a success flag plus a stable
//! [`AuthStatus`] code. How the host reaches these traits (plugin framing,
//! HTTP, in-process) is the adapter's concern.

use crate::secret::SecretString;
use crate::status::AuthStatus;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a verification or authentication call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Whether the credential was accepted.
    pub success: bool,

    /// Stable status code (see [`AuthStatus`]).
    pub status: i32,
}

impl VerifyResponse {
    /// Accepted response.
    #[must_use]
    pub fn accepted() -> Self {
        Self {
            success: true,
            status: AuthStatus::Ok.code(),
        }
    }

    /// Rejected response with the given status.
    #[must_use]
    pub fn rejected(status: AuthStatus) -> Self {
        Self {
            success: false,
            status: status.code(),
        }
    }

    /// Decode the status code.
    #[must_use]
    pub fn auth_status(&self) -> Option<AuthStatus> {
        AuthStatus::from_code(self.status)
    }
}

/// Result of an outbound token request.
///
/// The token is redacted in `Debug` output.
#[derive(Debug, Clone)]
pub struct TokenResponse {
    /// Whether a token was obtained.
    pub success: bool,

    /// Stable status code (see [`AuthStatus`]).
    pub status: i32,

    /// The access token; empty on failure.
    pub token: SecretString,
}

impl TokenResponse {
    /// Successful response carrying a token.
    #[must_use]
    pub fn issued(token: SecretString) -> Self {
        Self {
            success: true,
            status: AuthStatus::Ok.code(),
            token,
        }
    }

    /// Failed response with an empty token.
    #[must_use]
    pub fn failed(status: AuthStatus) -> Self {
        Self {
            success: false,
            status: status.code(),
            token: SecretString::from(""),
        }
    }
}

/// `verifyBearerToken(token)` contract (OAUTHBEARER mechanism).
#[async_trait]
pub trait TokenInfo: Send + Sync {
    /// Verify a bearer token.
    async fn verify_token(&self, token: &str) -> VerifyResponse;
}

/// `authenticate(username, secret)` contract (SASL/PLAIN mechanism).
#[async_trait]
pub trait PasswordAuthenticator: Send + Sync {
    /// Authenticate a username and secret; the secret may be a bearer token.
    async fn authenticate(&self, username: &str, password: &str) -> VerifyResponse;
}

/// `obtainOutboundToken()` contract.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Obtain a token to present to the upstream service.
    async fn get_token(&self) -> TokenResponse;
}
