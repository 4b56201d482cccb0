//! Outbound token provider.
//!
//! Each call performs a fresh client-credentials grant; nothing is cached
//! between calls. Issuance failures are reported as `InternalError` so the
//! host may retry.

use crate::config::Config;
use crate::observability::metrics::record_token_request;
use async_trait::async_trait;
use common::host::{TokenProvider, TokenResponse};
use common::secret::SecretString;
use common::status::AuthStatus;
use common::token_issuer::{CredentialIssuer, TokenError};
use std::fmt;
use tracing::instrument;

/// [`TokenProvider`] backed by the Entra token endpoint.
pub struct EntraTokenProvider {
    issuer: CredentialIssuer,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
    scope: String,
}

impl fmt::Debug for EntraTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntraTokenProvider")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scope", &self.scope)
            .finish()
    }
}

impl EntraTokenProvider {
    pub fn new(issuer: CredentialIssuer, config: &Config) -> Self {
        Self {
            issuer,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            scope: config.scope.clone(),
        }
    }

    /// Build with the default 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Configuration` if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self, TokenError> {
        Ok(Self::new(CredentialIssuer::new()?, config))
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }
}

#[async_trait]
impl TokenProvider for EntraTokenProvider {
    #[instrument(skip_all)]
    async fn get_token(&self) -> TokenResponse {
        let result = self
            .issuer
            .obtain_token(
                &self.token_url,
                &self.client_id,
                &self.client_secret,
                &self.scope,
            )
            .await;

        match result {
            Ok(issued) => {
                tracing::debug!(
                    target: "provider.token",
                    expires_in_secs = issued.expires_in,
                    "Obtained outbound token"
                );
                record_token_request(true);
                TokenResponse::issued(issued.access_token)
            }
            Err(e) => {
                tracing::error!(target: "provider.token", error = %e, "Failed to obtain outbound token");
                record_token_request(false);
                TokenResponse::failed(AuthStatus::InternalError)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;
    use serde_json::json;
    use std::collections::HashMap;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> EntraTokenProvider {
        let vars = HashMap::from([
            ("ENTRA_CLIENT_ID".to_string(), "client-1".to_string()),
            ("ENTRA_CLIENT_SECRET".to_string(), "s3cret".to_string()),
            ("ENTRA_TENANT_ID".to_string(), "tenant-1".to_string()),
            ("TOKEN_SCOPE".to_string(), "api://kafka/.default".to_string()),
            ("TOKEN_URL".to_string(), format!("{}/token", server.uri())),
        ]);
        EntraTokenProvider::from_config(&Config::from_vars(&vars).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_get_token_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("client_id=client-1"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "eyJ.outbound.token",
                "token_type": "Bearer",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider_for(&server).get_token().await;

        assert!(response.success);
        assert_eq!(response.status, 0);
        assert_eq!(response.token.expose_secret(), "eyJ.outbound.token");
    }

    #[tokio::test]
    async fn test_get_token_failure_is_internal_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("AADSTS7000215"))
            .mount(&server)
            .await;

        let response = provider_for(&server).get_token().await;

        assert!(!response.success);
        assert_eq!(response.status, AuthStatus::InternalError.code());
        assert!(response.token.expose_secret().is_empty());
    }

    #[tokio::test]
    async fn test_each_call_requests_a_new_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "t",
                "expires_in": 60
            })))
            .expect(2)
            .mount(&server)
            .await;

        let provider = provider_for(&server);
        assert!(provider.get_token().await.success);
        assert!(provider.get_token().await.success);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let vars = HashMap::from([
            ("ENTRA_CLIENT_ID".to_string(), "client-1".to_string()),
            ("ENTRA_CLIENT_SECRET".to_string(), "s3cret".to_string()),
            ("ENTRA_TENANT_ID".to_string(), "tenant-1".to_string()),
            ("TOKEN_SCOPE".to_string(), "scope".to_string()),
        ]);
        let provider =
            EntraTokenProvider::from_config(&Config::from_vars(&vars).unwrap()).unwrap();
        assert!(!format!("{provider:?}").contains("s3cret"));
    }
}
