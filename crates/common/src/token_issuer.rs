//! OAuth 2.0 Client Credentials grant.
//!
//! Exchanges a client ID and secret for a short-lived access token at the
//! identity provider's token endpoint. Used when this process must
//! authenticate outbound (e.g. the proxy authenticating to Kafka brokers).
//!
//! # Example
//!
//! ```rust,ignore
//! use common::secret::SecretString;
//! use common::token_issuer::{default_token_url, CredentialIssuer};
//!
//! let issuer = CredentialIssuer::new()?;
//! let token = issuer
//!     .obtain_token(
//!         &default_token_url("my-tenant"),
//!         "my-client",
//!         &SecretString::from("secret"),
//!         "api://kafka/.default",
//!     )
//!     .await?;
//! ```
//!
//! # Behavior
//!
//! - No retry is performed here; retry policy belongs to the caller
//! - Non-200 responses and empty access tokens are errors
//! - Requests are bounded by a 30 second timeout
//!
//! # Security
//!
//! - Client secret is held as `SecretString` (never logged)
//! - The issued token is returned as `SecretString`
//! - Error response bodies are logged at trace level only, truncated

use crate::secret::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, trace, warn};

// =============================================================================
// Constants
// =============================================================================

/// Default HTTP request timeout for token issuance.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout for HTTP client.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum number of characters of an error body kept for diagnostics.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Base URL of the Microsoft identity platform.
pub const ENTRA_AUTHORITY: &str = "https://login.microsoftonline.com";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while obtaining a token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Transport failure or unexpected HTTP status.
    #[error("HTTP client error: {0}")]
    HttpError(String),

    /// Credentials rejected by the identity provider (400, 401).
    #[error("Authentication rejected: {0}")]
    AuthenticationRejected(String),

    /// Token response parsing failed.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Response parsed but carried an empty access token.
    #[error("Received empty access token")]
    EmptyToken,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

// =============================================================================
// Token Types
// =============================================================================

/// Access token obtained from the token endpoint.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The bearer token.
    pub access_token: SecretString,

    /// Lifetime in seconds as reported by the identity provider.
    pub expires_in: u64,

    /// Token type, normally `Bearer`.
    pub token_type: String,
}

/// OAuth 2.0 token response.
#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: u64,
}

impl std::fmt::Debug for OAuthTokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthTokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Token endpoint for a tenant on the Microsoft identity platform (v2.0).
#[must_use]
pub fn default_token_url(tenant_id: &str) -> String {
    format!("{ENTRA_AUTHORITY}/{tenant_id}/oauth2/v2.0/token")
}

// =============================================================================
// Credential Issuer
// =============================================================================

/// Client for the client-credentials grant.
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    http_client: reqwest::Client,
}

impl CredentialIssuer {
    /// Create an issuer with the default 30 second timeout.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` if the HTTP client cannot be built.
    pub fn new() -> Result<Self, TokenError> {
        Self::with_http_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Create an issuer with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` if the HTTP client cannot be built.
    pub fn with_http_timeout(timeout: Duration) -> Result<Self, TokenError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| TokenError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { http_client })
    }

    /// Obtain an access token via the client-credentials grant.
    ///
    /// POSTs `client_id`, `client_secret`, `scope`, and
    /// `grant_type=client_credentials` as a form body.
    ///
    /// # Errors
    ///
    /// - `HttpError` - transport failure, 5xx, or any other non-200 status
    /// - `AuthenticationRejected` - 400 or 401 from the token endpoint
    /// - `InvalidResponse` - body is not a token response
    /// - `EmptyToken` - response carried an empty `access_token`
    #[instrument(skip_all, fields(client_id = %client_id))]
    pub async fn obtain_token(
        &self,
        token_url: &str,
        client_id: &str,
        client_secret: &SecretString,
        scope: &str,
    ) -> Result<IssuedToken, TokenError> {
        debug!(
            target: "common.token_issuer",
            url = %token_url,
            scope = %scope,
            "Requesting token from identity provider"
        );

        let form_body = [
            ("client_id", client_id),
            ("client_secret", client_secret.expose_secret()),
            ("scope", scope),
            ("grant_type", "client_credentials"),
        ];

        let response = self
            .http_client
            .post(token_url)
            .form(&form_body)
            .send()
            .await
            .map_err(|e| {
                debug!(target: "common.token_issuer", error = %e, "HTTP request failed");
                TokenError::HttpError(e.to_string())
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::OK {
            let token_response: OAuthTokenResponse = response.json().await.map_err(|e| {
                warn!(target: "common.token_issuer", error = %e, "Failed to parse token response");
                TokenError::InvalidResponse(e.to_string())
            })?;

            if token_response.access_token.is_empty() {
                warn!(target: "common.token_issuer", "Token endpoint returned an empty access token");
                return Err(TokenError::EmptyToken);
            }

            debug!(
                target: "common.token_issuer",
                expires_in_secs = token_response.expires_in,
                "Token acquired successfully"
            );

            return Ok(IssuedToken {
                access_token: SecretString::from(token_response.access_token),
                expires_in: token_response.expires_in,
                token_type: token_response.token_type,
            });
        }

        // Body is diagnostic only; never part of the returned error
        let body = response.text().await.unwrap_or_else(|e| {
            trace!(target: "common.token_issuer", error = %e, "Failed to read error response body");
            "<failed to read body>".to_string()
        });
        trace!(
            target: "common.token_issuer",
            body = %truncate(&body, MAX_ERROR_BODY_CHARS),
            "Token endpoint error response body"
        );

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::BAD_REQUEST
        {
            warn!(target: "common.token_issuer", status = %status, "Authentication rejected by identity provider");
            Err(TokenError::AuthenticationRejected(format!("Status {status}")))
        } else if status.is_server_error() {
            warn!(target: "common.token_issuer", status = %status, "Identity provider returned server error");
            Err(TokenError::HttpError(format!("Token endpoint server error: {status}")))
        } else {
            warn!(target: "common.token_issuer", status = %status, "Unexpected response from token endpoint");
            Err(TokenError::HttpError(format!("Unexpected status: {status}")))
        }
    }
}

/// Truncate to at most `max_chars` characters, marking the cut.
fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", s.get(..idx).unwrap_or_default()),
        None => s.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
