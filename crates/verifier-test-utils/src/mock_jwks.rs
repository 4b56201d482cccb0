//! Mock key discovery endpoint
//!
//! Wraps a wiremock server that publishes a JWKS document at the same path
//! the Microsoft identity platform uses.

use crate::crypto_fixtures::{jwks_document, TestKeypair};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the key discovery document.
pub const JWKS_PATH: &str = "/common/discovery/v2.0/keys";

/// Mock JWKS endpoint.
pub struct MockJwks {
    server: MockServer,
}

impl MockJwks {
    /// Start a server with no mounted responses.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Start a server publishing the given keys.
    pub async fn with_keys(keys: &[&TestKeypair]) -> Self {
        let mock = Self::start().await;
        mock.publish(keys).await;
        mock
    }

    /// Full URL of the key discovery document.
    pub fn jwks_url(&self) -> String {
        format!("{}{JWKS_PATH}", self.server.uri())
    }

    /// Underlying wiremock server.
    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Replace all responses with a document containing the given keys.
    pub async fn publish(&self, keys: &[&TestKeypair]) {
        let entries = keys.iter().map(|k| k.jwk_json()).collect();
        self.publish_document(jwks_document(entries)).await;
    }

    /// Replace all responses with an arbitrary JSON body.
    pub async fn publish_document(&self, document: serde_json::Value) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(document))
            .mount(&self.server)
            .await;
    }

    /// Publish keys and require exactly `times` fetches before drop.
    pub async fn publish_expecting(&self, keys: &[&TestKeypair], times: u64, delay: Duration) {
        let entries = keys.iter().map(|k| k.jwk_json()).collect();
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(jwks_document(entries))
                    .set_delay(delay),
            )
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Replace all responses with the given error status.
    pub async fn fail_with(&self, status: u16) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Number of requests received so far.
    pub async fn fetch_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default()
    }
}
