//! Builder patterns for test token construction
//!
//! Provides a fluent API for Entra-shaped access token claims.

use crate::crypto_fixtures::TestKeypair;
use chrono::{Duration, Utc};
use jsonwebtoken::Algorithm;
use serde_json::{json, Map, Value};

/// Tenant used by default in test tokens.
pub const TEST_TENANT_ID: &str = "00000000-0000-0000-0000-00000000000a";

/// Client (audience) used by default in test tokens.
pub const TEST_CLIENT_ID: &str = "11111111-2222-3333-4444-555555555555";

/// Issuer for [`TEST_TENANT_ID`] on the v2.0 endpoint.
pub fn test_issuer() -> String {
    format!("https://login.microsoftonline.com/{TEST_TENANT_ID}/v2.0")
}

/// Builder for creating test JWT claims
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("alice")
///     .with_scope("kafka.produce kafka.consume")
///     .expires_in(3600)
///     .sign(&TestKeypair::primary(PRIMARY_KID));
/// ```
pub struct TestTokenBuilder {
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a builder with a valid issuer, audience, subject, and a one
    /// hour lifetime.
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("iss".to_string(), json!(test_issuer()));
        claims.insert("aud".to_string(), json!(TEST_CLIENT_ID));
        claims.insert("sub".to_string(), json!("test-subject"));
        claims.insert("tid".to_string(), json!(TEST_TENANT_ID));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert("nbf".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );
        Self { claims }
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set the issuer
    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    /// Set a single audience
    pub fn with_audience(self, audience: &str) -> Self {
        self.with_claim("aud", json!(audience))
    }

    /// Set an audience array
    pub fn with_audiences(self, audiences: &[&str]) -> Self {
        self.with_claim("aud", json!(audiences))
    }

    /// Set the delegated scopes (`scp`, space-separated)
    pub fn with_scope(self, scope: &str) -> Self {
        self.with_claim("scp", json!(scope))
    }

    /// Set the application roles
    pub fn with_roles(self, roles: &[&str]) -> Self {
        self.with_claim("roles", json!(roles))
    }

    /// Set the `email` claim
    pub fn with_email(self, email: &str) -> Self {
        self.with_claim("email", json!(email))
    }

    /// Set the `preferred_username` claim
    pub fn with_preferred_username(self, username: &str) -> Self {
        self.with_claim("preferred_username", json!(username))
    }

    /// Set the `upn` claim
    pub fn with_upn(self, upn: &str) -> Self {
        self.with_claim("upn", json!(upn))
    }

    /// Set the `appid` claim (v1 tokens)
    pub fn with_app_id(self, app_id: &str) -> Self {
        self.with_claim("appid", json!(app_id))
    }

    /// Set the `azp` claim (v2 tokens)
    pub fn with_azp(self, azp: &str) -> Self {
        self.with_claim("azp", json!(azp))
    }

    /// Set the `oid` claim
    pub fn with_object_id(self, oid: &str) -> Self {
        self.with_claim("oid", json!(oid))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.with_claim("exp", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set not-before in seconds from now
    pub fn not_before_in(self, seconds: i64) -> Self {
        self.with_claim("nbf", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        Value::Object(self.claims)
    }

    /// Build and sign with RS256
    pub fn sign(self, key: &TestKeypair) -> String {
        key.sign_token(&self.build())
    }

    /// Build and sign with the given algorithm
    pub fn sign_with(self, key: &TestKeypair, alg: Algorithm) -> String {
        key.sign_token_with(alg, &self.build())
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_creates_valid_claims() {
        let claims = TestTokenBuilder::new()
            .for_user("alice")
            .with_scope("kafka.produce")
            .build();

        assert_eq!(claims["sub"], "alice");
        assert_eq!(claims["scp"], "kafka.produce");
        assert_eq!(claims["aud"], TEST_CLIENT_ID);
        assert_eq!(claims["iss"], test_issuer());
        assert!(claims["exp"].as_i64().unwrap() > Utc::now().timestamp());
    }

    #[test]
    fn test_builder_default() {
        let claims = TestTokenBuilder::default().build();
        assert_eq!(claims["sub"], "test-subject");
    }

    #[test]
    fn test_without_claim() {
        let claims = TestTokenBuilder::new().without_claim("aud").build();
        assert!(claims.get("aud").is_none());
    }

    #[test]
    fn test_audience_array() {
        let claims = TestTokenBuilder::new().with_audiences(&["a", "b"]).build();
        assert_eq!(claims["aud"], json!(["a", "b"]));
    }
}
