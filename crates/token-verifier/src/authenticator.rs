//! Credential dispatch for the host.
//!
//! A secret shaped like a JWT (`eyJ` prefix, exactly two `.`) is verified as
//! a bearer token and the caller-supplied username is ignored. Anything else
//! is checked against the static credential table.
//!
//! The verifier is built on the first JWT-mode call, so an unreachable
//! identity provider does not block startup.

use crate::auth::jwks::{HttpKeySource, KeySource, KeyStore};
use crate::auth::jwt::Verifier;
use crate::auth::policy::Policy;
use crate::config::Config;
use crate::observability::metrics::record_authentication;
use async_trait::async_trait;
use common::host::{PasswordAuthenticator, TokenInfo, VerifyResponse};
use common::jwt::looks_like_jwt;
use common::secret::{ExposeSecret, SecretString};
use common::status::AuthStatus;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use subtle::{Choice, ConstantTimeEq};
use tokio::sync::OnceCell;
use tracing::instrument;

/// Compared against when the username is unknown, so every check does one
/// full comparison.
const UNKNOWN_USER_PASSWORD: &str = "\u{0}unknown-user\u{0}";

/// Username to expected password. Immutable after construction.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    users: HashMap<String, SecretString>,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut usernames: Vec<&str> = self.users.keys().map(String::as_str).collect();
        usernames.sort_unstable();
        f.debug_struct("StaticCredentials")
            .field("users", &usernames)
            .finish()
    }
}

impl StaticCredentials {
    pub fn new(users: impl IntoIterator<Item = (String, SecretString)>) -> Self {
        Self {
            users: users.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Exact, constant-time password check. Always false for an empty table.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let (expected, known) = match self.users.get(username) {
            Some(expected) => (expected.expose_secret(), Choice::from(1)),
            None => (UNKNOWN_USER_PASSWORD, Choice::from(0)),
        };
        (expected.as_bytes().ct_eq(password.as_bytes()) & known).into()
    }
}

/// Host-facing authenticator.
pub struct Authenticator {
    key_source: Arc<dyn KeySource>,
    policy: Policy,
    static_credentials: StaticCredentials,
    verifier: OnceCell<Arc<Verifier>>,
}

impl Authenticator {
    pub fn new(
        key_source: Arc<dyn KeySource>,
        policy: Policy,
        static_credentials: StaticCredentials,
    ) -> Self {
        Self {
            key_source,
            policy,
            static_credentials,
            verifier: OnceCell::new(),
        }
    }

    /// Build from configuration, fetching keys over HTTP.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(HttpKeySource::new(config.jwks_url.clone())),
            config.policy(),
            StaticCredentials::new(config.static_users.clone()),
        )
    }

    pub fn static_credentials(&self) -> &StaticCredentials {
        &self.static_credentials
    }

    /// Whether the verifier has been built.
    pub fn is_verifier_initialized(&self) -> bool {
        self.verifier.initialized()
    }

    /// The verifier, built on first use.
    ///
    /// Concurrent first callers wait for a single initialization. Keys are
    /// not fetched here; the first lookup performs the initial fetch.
    pub async fn verifier(&self) -> Arc<Verifier> {
        self.verifier
            .get_or_init(|| async {
                tracing::info!(target: "verifier.authenticator", "Initializing JWT verifier");
                let key_store = Arc::new(KeyStore::new(
                    Arc::clone(&self.key_source),
                    self.policy.cache_lifetime(),
                ));
                Arc::new(Verifier::new(key_store, self.policy.clone()))
            })
            .await
            .clone()
    }

    async fn authenticate_jwt(&self, token: &str) -> VerifyResponse {
        match self.verifier().await.verify(token).await {
            Ok(claims) => {
                tracing::debug!(
                    target: "verifier.authenticator",
                    scopes = ?claims.scopes,
                    "JWT authentication succeeded"
                );
                VerifyResponse::accepted()
            }
            Err(e) => {
                tracing::debug!(target: "verifier.authenticator", error = %e, "JWT authentication failed");
                VerifyResponse::rejected(e.status())
            }
        }
    }

    fn authenticate_static(&self, username: &str, password: &str) -> VerifyResponse {
        if self.static_credentials.is_empty() {
            tracing::warn!(
                target: "verifier.authenticator",
                "No static users configured, rejecting username/password authentication"
            );
            return VerifyResponse::rejected(AuthStatus::InvalidCredential);
        }

        if self.static_credentials.verify(username, password) {
            tracing::debug!(target: "verifier.authenticator", username = %username, "Static authentication succeeded");
            VerifyResponse::accepted()
        } else {
            tracing::debug!(target: "verifier.authenticator", username = %username, "Static authentication failed");
            VerifyResponse::rejected(AuthStatus::InvalidCredential)
        }
    }
}

#[async_trait]
impl PasswordAuthenticator for Authenticator {
    #[instrument(skip_all)]
    async fn authenticate(&self, username: &str, password: &str) -> VerifyResponse {
        if looks_like_jwt(password) {
            let response = self.authenticate_jwt(password).await;
            record_authentication("jwt", response.success);
            response
        } else {
            let response = self.authenticate_static(username, password);
            record_authentication("static", response.success);
            response
        }
    }
}

#[async_trait]
impl TokenInfo for Authenticator {
    #[instrument(skip_all)]
    async fn verify_token(&self, token: &str) -> VerifyResponse {
        if token.is_empty() {
            return VerifyResponse::rejected(AuthStatus::EmptyCredential);
        }
        self.verifier().await.verify_token(token).await
    }
}
