//! Bearer token verification.
//!
//! Verifies Entra-issued RS/PS-signed JWTs using keys from the [`KeyStore`]
//! and enforces the [`Policy`].
//!
//! # Stages
//!
//! ```text
//! Parse -> ResolveKey -> CheckSignature -> CheckIssuer -> CheckAudience
//!       -> CheckScopes -> ExtractClaims -> accept
//! ```
//!
//! Any stage can reject; the rejection is a [`VerifyError`] naming the stage.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only RSA signature algorithms are accepted
//! - `exp` is required; `exp` and `nbf` are validated with 60 s leeway
//! - A missing or unknown key fails closed

use crate::auth::claims::{Claims, RawClaims};
use crate::auth::jwks::{KeyStore, KeyStoreError};
use crate::auth::policy::Policy;
use crate::observability::metrics::record_token_validation;
use async_trait::async_trait;
use common::host::{TokenInfo, VerifyResponse};
use common::jwt::{decode_header, JwtValidationError};
use common::status::AuthStatus;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, Validation};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

/// Clock skew tolerance for `exp` and `nbf`, in seconds.
pub const CLOCK_SKEW_LEEWAY_SECONDS: u64 = 60;

/// Verification stage at which a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyStage {
    Parse,
    ResolveKey,
    CheckSignature,
    CheckIssuer,
    CheckAudience,
    CheckScopes,
}

impl fmt::Display for VerifyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerifyStage::Parse => "parse",
            VerifyStage::ResolveKey => "resolve_key",
            VerifyStage::CheckSignature => "check_signature",
            VerifyStage::CheckIssuer => "check_issuer",
            VerifyStage::CheckAudience => "check_audience",
            VerifyStage::CheckScopes => "check_scopes",
        };
        f.write_str(name)
    }
}

/// Reason a token was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Token is empty")]
    EmptyToken,

    #[error("Token is malformed")]
    Malformed,

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Token header has no key ID")]
    MissingKid,

    #[error("No verification key for kid {kid}")]
    KeyNotFound { kid: String },

    #[error("Signature or claim validation failed: {0}")]
    InvalidSignature(String),

    #[error("Token has expired")]
    Expired,

    #[error("Issuer is not allowed: {issuer}")]
    IssuerNotAllowed { issuer: String },

    #[error("Token audience does not match")]
    AudienceMismatch,

    #[error("Missing required scopes: {}", .missing.join(" "))]
    MissingScopes { missing: Vec<String> },
}

impl VerifyError {
    /// Stage that produced this rejection.
    pub fn stage(&self) -> VerifyStage {
        match self {
            VerifyError::EmptyToken
            | VerifyError::Malformed
            | VerifyError::UnsupportedAlgorithm(_)
            | VerifyError::MissingKid => VerifyStage::Parse,
            VerifyError::KeyNotFound { .. } => VerifyStage::ResolveKey,
            VerifyError::InvalidSignature(_) | VerifyError::Expired => VerifyStage::CheckSignature,
            VerifyError::IssuerNotAllowed { .. } => VerifyStage::CheckIssuer,
            VerifyError::AudienceMismatch => VerifyStage::CheckAudience,
            VerifyError::MissingScopes { .. } => VerifyStage::CheckScopes,
        }
    }

    /// Host status code for this rejection.
    pub fn status(&self) -> AuthStatus {
        match self {
            VerifyError::EmptyToken => AuthStatus::EmptyCredential,
            VerifyError::Malformed
            | VerifyError::UnsupportedAlgorithm(_)
            | VerifyError::MissingKid
            | VerifyError::KeyNotFound { .. }
            | VerifyError::InvalidSignature(_) => AuthStatus::InvalidCredential,
            VerifyError::Expired => AuthStatus::ExpiredCredential,
            VerifyError::IssuerNotAllowed { .. }
            | VerifyError::AudienceMismatch
            | VerifyError::MissingScopes { .. } => AuthStatus::Unauthorized,
        }
    }

    /// Bounded metric label.
    pub fn as_label(&self) -> &'static str {
        match self {
            VerifyError::EmptyToken => "empty_token",
            VerifyError::Malformed => "malformed",
            VerifyError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            VerifyError::MissingKid => "missing_kid",
            VerifyError::KeyNotFound { .. } => "key_not_found",
            VerifyError::InvalidSignature(_) => "invalid_signature",
            VerifyError::Expired => "expired",
            VerifyError::IssuerNotAllowed { .. } => "issuer_not_allowed",
            VerifyError::AudienceMismatch => "audience_mismatch",
            VerifyError::MissingScopes { .. } => "missing_scopes",
        }
    }
}

impl From<JwtValidationError> for VerifyError {
    fn from(e: JwtValidationError) -> Self {
        match e {
            JwtValidationError::MissingKid => VerifyError::MissingKid,
            JwtValidationError::TokenTooLarge | JwtValidationError::MalformedToken => {
                VerifyError::Malformed
            }
        }
    }
}

/// Map a header `alg` to an accepted RSA algorithm.
fn rsa_algorithm(alg: &str) -> Option<Algorithm> {
    match alg {
        "RS256" => Some(Algorithm::RS256),
        "RS384" => Some(Algorithm::RS384),
        "RS512" => Some(Algorithm::RS512),
        "PS256" => Some(Algorithm::PS256),
        "PS384" => Some(Algorithm::PS384),
        "PS512" => Some(Algorithm::PS512),
        _ => None,
    }
}

/// Bearer token verifier.
pub struct Verifier {
    key_store: Arc<KeyStore>,
    policy: Policy,
}

impl Verifier {
    pub fn new(key_store: Arc<KeyStore>, policy: Policy) -> Self {
        if policy.accepts_any_issuer() {
            tracing::warn!(
                target: "verifier.auth.jwt",
                "No allowed issuers configured, tokens from any issuer will be accepted"
            );
        }
        Self { key_store, policy }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.key_store
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns the [`VerifyError`] of the first failing stage.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Claims, VerifyError> {
        let start = Instant::now();
        let result = self.verify_stages(token).await;

        match &result {
            Ok(_) => {
                tracing::debug!(target: "verifier.auth.jwt", "Token validated successfully");
                record_token_validation("accepted", start.elapsed());
            }
            Err(e) => {
                tracing::debug!(
                    target: "verifier.auth.jwt",
                    stage = %e.stage(),
                    error = %e,
                    "Token rejected"
                );
                record_token_validation(e.as_label(), start.elapsed());
            }
        }

        result
    }

    async fn verify_stages(&self, token: &str) -> Result<Claims, VerifyError> {
        // Parse
        if token.is_empty() {
            return Err(VerifyError::EmptyToken);
        }
        let header = decode_header(token)?;
        let algorithm = rsa_algorithm(&header.alg)
            .ok_or_else(|| VerifyError::UnsupportedAlgorithm(header.alg.clone()))?;
        let kid = header.kid()?;

        // Resolve key
        let key = self.key_store.get_key(kid).await.map_err(|e| {
            if let KeyStoreError::RefreshFailed(cause) = &e {
                tracing::warn!(target: "verifier.auth.jwt", error = %cause, "Key lookup failed during JWKS refresh");
            }
            VerifyError::KeyNotFound {
                kid: kid.to_string(),
            }
        })?;

        // Check signature, exp, nbf
        let mut validation = Validation::new(algorithm);
        validation.leeway = CLOCK_SKEW_LEEWAY_SECONDS;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let raw = decode::<RawClaims>(token, key.decoding_key(), &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => VerifyError::Expired,
                _ => VerifyError::InvalidSignature(e.to_string()),
            })?
            .claims;

        // Check issuer
        let issuer = raw.iss.as_deref().unwrap_or_default();
        if !self.policy.issuer_allowed(issuer) {
            return Err(VerifyError::IssuerNotAllowed {
                issuer: issuer.to_string(),
            });
        }

        // Check audience
        let audiences = raw.aud.clone().map(|aud| aud.into_vec()).unwrap_or_default();
        if !self.policy.audience_matches(audiences.as_slice()) {
            return Err(VerifyError::AudienceMismatch);
        }

        // Check scopes
        let missing = self.policy.missing_scopes(raw.scopes().as_slice());
        if !missing.is_empty() {
            return Err(VerifyError::MissingScopes { missing });
        }

        // Extract claims
        Ok(Claims::from(raw))
    }
}

#[async_trait]
impl TokenInfo for Verifier {
    async fn verify_token(&self, token: &str) -> VerifyResponse {
        match self.verify(token).await {
            Ok(_) => VerifyResponse::accepted(),
            Err(e) => VerifyResponse::rejected(e.status()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::auth::jwks::{KeySource, KeySourceError, VerificationKey};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use common::jwt::MAX_JWT_SIZE_BYTES;
    use std::time::Duration;
    use verifier_test_utils::{
        test_issuer, TestKeypair, TestTokenBuilder, PRIMARY_KID, SECONDARY_KID, TEST_CLIENT_ID,
        TEST_RSA_EXPONENT,
    };

    struct StaticSource(Vec<TestKeypair>);

    #[async_trait]
    impl KeySource for StaticSource {
        async fn fetch_keys(&self) -> Result<Vec<VerificationKey>, KeySourceError> {
            self.0
                .iter()
                .map(|k| VerificationKey::from_rsa_components(k.kid(), k.modulus(), TEST_RSA_EXPONENT))
                .collect()
        }
    }

    fn primary() -> TestKeypair {
        TestKeypair::primary(PRIMARY_KID)
    }

    fn verifier_with(policy: Policy) -> Verifier {
        let store = KeyStore::new(
            Arc::new(StaticSource(vec![primary()])),
            Duration::from_secs(3600),
        );
        Verifier::new(Arc::new(store), policy)
    }

    fn default_policy() -> Policy {
        Policy::new(TEST_CLIENT_ID).with_allowed_issuers(vec![test_issuer()])
    }

    fn verifier() -> Verifier {
        verifier_with(default_policy())
    }

    fn unsigned_token(header: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(r#"{"sub":"x"}"#)
        )
    }

    #[tokio::test]
    async fn test_valid_token_accepted() {
        let token = TestTokenBuilder::new()
            .for_user("user-1")
            .with_email("alice@example.com")
            .with_roles(&["Kafka.Producer"])
            .sign(&primary());

        let claims = verifier().verify(&token).await.unwrap();
        assert_eq!(claims.subject, "user-1");
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.roles, vec!["Kafka.Producer"]);
        assert_eq!(claims.issuer, test_issuer());
    }

    #[tokio::test]
    async fn test_pss_algorithms_accepted() {
        for alg in [Algorithm::PS256, Algorithm::PS384, Algorithm::PS512, Algorithm::RS512] {
            let token = TestTokenBuilder::new().sign_with(&primary(), alg);
            assert!(verifier().verify(&token).await.is_ok(), "{alg:?} rejected");
        }
    }

    #[tokio::test]
    async fn test_empty_token() {
        let err = verifier().verify("").await.unwrap_err();
        assert_eq!(err, VerifyError::EmptyToken);
        assert_eq!(err.status(), AuthStatus::EmptyCredential);
        assert_eq!(err.stage(), VerifyStage::Parse);
    }

    #[tokio::test]
    async fn test_malformed_token() {
        let err = verifier().verify("not-a-jwt").await.unwrap_err();
        assert_eq!(err, VerifyError::Malformed);
        assert_eq!(err.status(), AuthStatus::InvalidCredential);
    }

    #[tokio::test]
    async fn test_oversized_token_rejected() {
        let token = format!("eyJ{}", "a".repeat(MAX_JWT_SIZE_BYTES));
        assert_eq!(verifier().verify(&token).await.unwrap_err(), VerifyError::Malformed);
    }

    #[tokio::test]
    async fn test_alg_none_rejected() {
        let token = unsigned_token(r#"{"alg":"none","kid":"test-key-primary"}"#);
        let err = verifier().verify(&token).await.unwrap_err();
        assert_eq!(err, VerifyError::UnsupportedAlgorithm("none".to_string()));
    }

    #[tokio::test]
    async fn test_hs256_rejected() {
        let token = unsigned_token(r#"{"alg":"HS256","kid":"test-key-primary"}"#);
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::UnsupportedAlgorithm(_)));
    }

    #[tokio::test]
    async fn test_missing_kid() {
        let token = primary().sign_token_without_kid(&TestTokenBuilder::new().build());
        let err = verifier().verify(&token).await.unwrap_err();
        assert_eq!(err, VerifyError::MissingKid);
        assert_eq!(err.status(), AuthStatus::InvalidCredential);
    }

    #[tokio::test]
    async fn test_unknown_kid() {
        let token = TestTokenBuilder::new().sign(&TestKeypair::secondary(SECONDARY_KID));
        let err = verifier().verify(&token).await.unwrap_err();
        assert_eq!(
            err,
            VerifyError::KeyNotFound {
                kid: SECONDARY_KID.to_string()
            }
        );
        assert_eq!(err.stage(), VerifyStage::ResolveKey);
        assert_eq!(err.status(), AuthStatus::InvalidCredential);
    }

    #[tokio::test]
    async fn test_wrong_key_signature_rejected() {
        // Signed by the secondary key but claiming the primary kid
        let forged = TestKeypair::secondary(PRIMARY_KID);
        let token = TestTokenBuilder::new().sign(&forged);
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidSignature(_)));
        assert_eq!(err.stage(), VerifyStage::CheckSignature);
    }

    #[tokio::test]
    async fn test_tampered_payload_rejected() {
        let token = TestTokenBuilder::new().for_user("alice").sign(&primary());
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = URL_SAFE_NO_PAD.encode(
            TestTokenBuilder::new().for_user("mallory").build().to_string(),
        );
        parts[1] = &forged_payload;
        let tampered = parts.join(".");

        let err = verifier().verify(&tampered).await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidSignature(_)));
    }

    #[tokio::test]
    async fn test_expired_token() {
        let token = TestTokenBuilder::new().expires_in(-3600).sign(&primary());
        let err = verifier().verify(&token).await.unwrap_err();
        assert_eq!(err, VerifyError::Expired);
        assert_eq!(err.status(), AuthStatus::ExpiredCredential);
    }

    #[tokio::test]
    async fn test_expiry_within_leeway_accepted() {
        let token = TestTokenBuilder::new().expires_in(-30).sign(&primary());
        assert!(verifier().verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_exp_rejected() {
        let token = TestTokenBuilder::new().without_claim("exp").sign(&primary());
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidSignature(_)));
    }

    #[tokio::test]
    async fn test_not_yet_valid_rejected() {
        let token = TestTokenBuilder::new().not_before_in(3600).sign(&primary());
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::InvalidSignature(_)));
    }

    #[tokio::test]
    async fn test_issuer_not_allowed() {
        let token = TestTokenBuilder::new()
            .with_issuer("https://evil.example/v2.0")
            .sign(&primary());
        let err = verifier().verify(&token).await.unwrap_err();
        assert_eq!(
            err,
            VerifyError::IssuerNotAllowed {
                issuer: "https://evil.example/v2.0".to_string()
            }
        );
        assert_eq!(err.status(), AuthStatus::Unauthorized);
    }

    #[tokio::test]
    async fn test_issuer_trailing_slash_accepted() {
        let token = TestTokenBuilder::new()
            .with_issuer(&format!("{}/", test_issuer()))
            .sign(&primary());
        assert!(verifier().verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_issuer_rejected_when_restricted() {
        let token = TestTokenBuilder::new().without_claim("iss").sign(&primary());
        let err = verifier().verify(&token).await.unwrap_err();
        assert!(matches!(err, VerifyError::IssuerNotAllowed { .. }));
    }

    #[tokio::test]
    async fn test_any_issuer_when_allow_list_empty() {
        let verifier = verifier_with(Policy::new(TEST_CLIENT_ID));
        let token = TestTokenBuilder::new()
            .with_issuer("https://anywhere.example")
            .sign(&primary());
        assert!(verifier.verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_app_id_uri_audience_accepted() {
        let token = TestTokenBuilder::new()
            .with_audience(&format!("api://{TEST_CLIENT_ID}"))
            .sign(&primary());
        assert!(verifier().verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_audience_array_accepted() {
        let token = TestTokenBuilder::new()
            .with_audiences(&["https://graph.microsoft.com", TEST_CLIENT_ID])
            .sign(&primary());
        assert!(verifier().verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_audience_mismatch() {
        let token = TestTokenBuilder::new()
            .with_audience("some-other-client")
            .sign(&primary());
        let err = verifier().verify(&token).await.unwrap_err();
        assert_eq!(err, VerifyError::AudienceMismatch);
        assert_eq!(err.stage(), VerifyStage::CheckAudience);
        assert_eq!(err.status(), AuthStatus::Unauthorized);
    }

    #[tokio::test]
    async fn test_missing_audience_rejected() {
        let token = TestTokenBuilder::new().without_claim("aud").sign(&primary());
        assert_eq!(
            verifier().verify(&token).await.unwrap_err(),
            VerifyError::AudienceMismatch
        );
    }

    #[tokio::test]
    async fn test_required_scopes() {
        let verifier = verifier_with(
            default_policy().with_required_scopes(vec!["read".to_string(), "write".to_string()]),
        );

        let partial = TestTokenBuilder::new().with_scope("read").sign(&primary());
        let err = verifier.verify(&partial).await.unwrap_err();
        assert_eq!(
            err,
            VerifyError::MissingScopes {
                missing: vec!["write".to_string()]
            }
        );
        assert_eq!(err.status(), AuthStatus::Unauthorized);

        let superset = TestTokenBuilder::new()
            .with_scope("read write admin")
            .sign(&primary());
        assert!(verifier.verify(&superset).await.is_ok());
    }

    #[tokio::test]
    async fn test_token_info_maps_status() {
        let verifier = verifier();

        let ok = verifier
            .verify_token(&TestTokenBuilder::new().sign(&primary()))
            .await;
        assert_eq!(ok, VerifyResponse::accepted());

        let expired = verifier
            .verify_token(&TestTokenBuilder::new().expires_in(-3600).sign(&primary()))
            .await;
        assert_eq!(expired, VerifyResponse::rejected(AuthStatus::ExpiredCredential));

        let empty = verifier.verify_token("").await;
        assert_eq!(empty.status, 1);
    }

    #[test]
    fn test_missing_scopes_display() {
        let err = VerifyError::MissingScopes {
            missing: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Missing required scopes: a b");
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(VerifyStage::CheckSignature.to_string(), "check_signature");
    }
}
