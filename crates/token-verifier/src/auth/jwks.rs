//! Key discovery and the verification key cache.
//!
//! [`HttpKeySource`] fetches the identity provider's JWKS document and
//! decodes the RSA entries into [`VerificationKey`]s. [`KeyStore`] holds the
//! current [`KeySet`] and refreshes it from a [`KeySource`] when a key is
//! missing or the set has outlived its cache lifetime.
//!
//! # Concurrency
//!
//! The store is guarded by a single `tokio::sync::RwLock`. Lookups take the
//! read lock. A refresh holds the write lock for the whole fetch, so at most
//! one fetch is in flight per store. Callers that queued behind a refresh
//! they did not start re-use its result instead of fetching again.
//!
//! # Security
//!
//! - Only RSA keys are accepted; other key types are skipped
//! - A failed refresh never replaces the current key set
//! - HTTPS should be used in production (enforced by deployment config)

use crate::observability::metrics::record_jwks_refresh;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

/// Default key cache lifetime (1 hour).
pub const DEFAULT_CACHE_LIFETIME: Duration = Duration::from_secs(3600);

/// Request timeout for key discovery.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Key type of the only keys this store accepts.
const RSA_KEY_TYPE: &str = "RSA";

// =============================================================================
// Errors
// =============================================================================

/// Errors fetching or decoding a key set.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeySourceError {
    #[error("Key discovery request failed: {0}")]
    Http(String),

    #[error("Key discovery endpoint returned status {0}")]
    UnexpectedStatus(u16),

    #[error("Key discovery document is malformed: {0}")]
    MalformedDocument(String),

    #[error("Key {kid} has an invalid {field}: {reason}")]
    InvalidKey {
        kid: String,
        field: &'static str,
        reason: String,
    },
}

/// Errors looking up a key in the store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyStoreError {
    /// The key set was refreshed (or is fresh) and has no such key.
    #[error("No verification key for kid {kid}")]
    NotFound { kid: String },

    /// The key is not cached and the refresh that should have found it failed.
    #[error("Key set refresh failed: {0}")]
    RefreshFailed(#[from] KeySourceError),
}

// =============================================================================
// Wire format
// =============================================================================

/// JSON Web Key as published by the key-discovery endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for the keys we use).
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Key use (should be "sig").
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url, unpadded).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url, unpadded).
    #[serde(default)]
    pub e: Option<String>,
}

/// Key-discovery document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    /// List of JSON Web Keys.
    pub keys: Vec<Jwk>,
}

// =============================================================================
// Verification keys
// =============================================================================

/// RSA public key ready for signature verification. Immutable.
#[derive(Clone)]
pub struct VerificationKey {
    kid: String,
    modulus: Vec<u8>,
    exponent: Vec<u8>,
    decoding_key: DecodingKey,
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationKey")
            .field("kid", &self.kid)
            .field("modulus_bits", &(self.modulus.len() * 8))
            .field("exponent", &ExponentDebug(&self.exponent))
            .finish_non_exhaustive()
    }
}

impl VerificationKey {
    /// Build a key from base64url-encoded RSA components.
    ///
    /// # Errors
    ///
    /// Returns `KeySourceError::InvalidKey` if either component is not
    /// valid unpadded base64url, the modulus is empty, or the exponent is
    /// zero. Exponents of any width are accepted.
    pub fn from_rsa_components(kid: &str, n: &str, e: &str) -> Result<Self, KeySourceError> {
        let invalid = |field: &'static str, reason: String| KeySourceError::InvalidKey {
            kid: kid.to_string(),
            field,
            reason,
        };

        let modulus = URL_SAFE_NO_PAD
            .decode(n)
            .map_err(|e| invalid("modulus", e.to_string()))?;
        if modulus.is_empty() {
            return Err(invalid("modulus", "empty".to_string()));
        }

        let exponent = URL_SAFE_NO_PAD
            .decode(e)
            .map_err(|e| invalid("exponent", e.to_string()))?;
        if exponent.iter().all(|&byte| byte == 0) {
            return Err(invalid("exponent", "zero".to_string()));
        }

        let decoding_key = DecodingKey::from_rsa_raw_components(&modulus, &exponent);

        Ok(Self {
            kid: kid.to_string(),
            modulus,
            exponent,
            decoding_key,
        })
    }

    /// Key ID.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Big-endian modulus bytes.
    pub fn modulus(&self) -> &[u8] {
        &self.modulus
    }

    /// Big-endian public exponent bytes.
    pub fn exponent(&self) -> &[u8] {
        &self.exponent
    }

    /// Public exponent as an integer; `None` when wider than 64 bits.
    pub fn exponent_u64(&self) -> Option<u64> {
        exponent_value(&self.exponent)
    }

    /// Prepared key for `jsonwebtoken::decode`.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// Accumulate a big-endian unsigned exponent. Leading zero bytes are
/// permitted; `None` once the value passes `u64::MAX`.
fn exponent_value(bytes: &[u8]) -> Option<u64> {
    bytes.iter().try_fold(0u64, |acc, &byte| {
        acc.checked_mul(256)?.checked_add(u64::from(byte))
    })
}

struct ExponentDebug<'a>(&'a [u8]);

impl fmt::Debug for ExponentDebug<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match exponent_value(self.0) {
            Some(value) => write!(f, "{value}"),
            None => write!(f, "<{} bytes>", self.0.len()),
        }
    }
}

/// Decode a key-discovery document into RSA verification keys.
///
/// Non-RSA entries are skipped. RSA entries without a `kid` are skipped with
/// a warning.
///
/// # Errors
///
/// Returns `MalformedDocument` if the body is not a JWKS document and
/// `InvalidKey` if an RSA entry has unusable components.
pub fn parse_jwks_document(body: &[u8]) -> Result<Vec<VerificationKey>, KeySourceError> {
    let document: JwksDocument = serde_json::from_slice(body)
        .map_err(|e| KeySourceError::MalformedDocument(e.to_string()))?;

    let mut keys = Vec::with_capacity(document.keys.len());
    for jwk in document.keys {
        if jwk.kty != RSA_KEY_TYPE {
            tracing::debug!(target: "verifier.auth.jwks", kty = %jwk.kty, "Skipping non-RSA key");
            continue;
        }

        let Some(kid) = jwk.kid.as_deref().filter(|kid| !kid.is_empty()) else {
            tracing::warn!(target: "verifier.auth.jwks", "Skipping RSA key without kid");
            continue;
        };

        let n = jwk.n.as_deref().ok_or_else(|| KeySourceError::InvalidKey {
            kid: kid.to_string(),
            field: "modulus",
            reason: "missing".to_string(),
        })?;
        let e = jwk.e.as_deref().ok_or_else(|| KeySourceError::InvalidKey {
            kid: kid.to_string(),
            field: "exponent",
            reason: "missing".to_string(),
        })?;

        keys.push(VerificationKey::from_rsa_components(kid, n, e)?);
    }

    Ok(keys)
}

// =============================================================================
// Key set
// =============================================================================

/// Snapshot of the keys from one successful fetch.
///
/// Replaced wholesale on refresh; never mutated in place.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: HashMap<String, VerificationKey>,
    fetched_at: Option<Instant>,
}

impl KeySet {
    /// Build a key set. A later key with a repeated kid replaces the earlier one.
    pub fn new(keys: Vec<VerificationKey>, fetched_at: Instant) -> Self {
        let keys = keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();
        Self {
            keys,
            fetched_at: Some(fetched_at),
        }
    }

    /// Key set that has never been fetched.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a key by kid.
    pub fn get(&self, kid: &str) -> Option<&VerificationKey> {
        self.keys.get(kid)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set has no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// When the set was fetched; `None` if it never was.
    pub fn fetched_at(&self) -> Option<Instant> {
        self.fetched_at
    }

    /// Whether the set was fetched less than `lifetime` ago.
    pub fn is_fresh(&self, lifetime: Duration) -> bool {
        self.fetched_at
            .is_some_and(|fetched_at| fetched_at.elapsed() < lifetime)
    }
}

// =============================================================================
// Key source
// =============================================================================

/// Source of verification keys.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the current keys.
    async fn fetch_keys(&self) -> Result<Vec<VerificationKey>, KeySourceError>;
}

/// Fetches keys from a JWKS URL over HTTP.
pub struct HttpKeySource {
    jwks_url: String,
    http_client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a key source for the given JWKS URL.
    pub fn new(jwks_url: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "verifier.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url: jwks_url.into(),
            http_client,
        }
    }

    /// The JWKS URL.
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    #[instrument(skip_all)]
    async fn fetch_keys(&self) -> Result<Vec<VerificationKey>, KeySourceError> {
        tracing::debug!(target: "verifier.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "verifier.auth.jwks", error = %e, "Failed to fetch JWKS");
                KeySourceError::Http(e.to_string())
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::error!(target: "verifier.auth.jwks", status = %status, "JWKS endpoint returned error");
            return Err(KeySourceError::UnexpectedStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            tracing::error!(target: "verifier.auth.jwks", error = %e, "Failed to read JWKS response");
            KeySourceError::Http(e.to_string())
        })?;

        parse_jwks_document(&body).inspect_err(|e| {
            tracing::error!(target: "verifier.auth.jwks", error = %e, "Failed to decode JWKS response");
        })
    }
}

// =============================================================================
// Key store
// =============================================================================

struct KeyStoreState {
    current: Arc<KeySet>,

    /// Outcome of the most recent refresh attempt.
    last_error: Option<KeySourceError>,
}

/// Cache of verification keys backed by a [`KeySource`].
pub struct KeyStore {
    source: Arc<dyn KeySource>,
    state: RwLock<KeyStoreState>,

    /// Incremented after every refresh attempt, successful or not. Only
    /// written while the state write lock is held.
    generation: AtomicU64,

    cache_lifetime: Duration,
}

impl KeyStore {
    /// Create an empty store. Nothing is fetched until the first lookup or
    /// [`KeyStore::refresh`].
    pub fn new(source: Arc<dyn KeySource>, cache_lifetime: Duration) -> Self {
        Self {
            source,
            state: RwLock::new(KeyStoreState {
                current: Arc::new(KeySet::empty()),
                last_error: None,
            }),
            generation: AtomicU64::new(0),
            cache_lifetime,
        }
    }

    /// Key cache lifetime.
    pub fn cache_lifetime(&self) -> Duration {
        self.cache_lifetime
    }

    /// Current key set snapshot.
    pub async fn current(&self) -> Arc<KeySet> {
        Arc::clone(&self.state.read().await.current)
    }

    /// Get a verification key by kid.
    ///
    /// Served from the cache when the key is present and the set is fresh.
    /// Otherwise the set is refreshed and the lookup repeated. If the
    /// refresh fails but the stale set still has the key, the stale key is
    /// returned.
    ///
    /// # Errors
    ///
    /// - `NotFound` - the kid is absent after a successful refresh
    /// - `RefreshFailed` - the kid is absent and the refresh failed
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn get_key(&self, kid: &str) -> Result<VerificationKey, KeyStoreError> {
        // Read before queueing on the lock so a refresh completed while we
        // wait is recognised as already covering this lookup.
        let observed_generation = self.generation.load(Ordering::Acquire);
        {
            let state = self.state.read().await;
            if state.current.is_fresh(self.cache_lifetime) {
                if let Some(key) = state.current.get(kid) {
                    tracing::trace!(target: "verifier.auth.jwks", "JWKS cache hit");
                    return Ok(key.clone());
                }
            }
        }

        let refreshed = self.refresh_after(observed_generation).await;

        let state = self.state.read().await;
        match (state.current.get(kid), refreshed) {
            (Some(key), Ok(())) => Ok(key.clone()),
            (Some(key), Err(e)) => {
                tracing::warn!(
                    target: "verifier.auth.jwks",
                    error = %e,
                    "JWKS refresh failed, serving key from stale cache"
                );
                Ok(key.clone())
            }
            (None, Ok(())) => {
                tracing::warn!(target: "verifier.auth.jwks", "Key not found in JWKS after refresh");
                Err(KeyStoreError::NotFound {
                    kid: kid.to_string(),
                })
            }
            (None, Err(e)) => Err(KeyStoreError::RefreshFailed(e)),
        }
    }

    /// Fetch the key set now, regardless of freshness.
    ///
    /// # Errors
    ///
    /// Returns the fetch error; the current set is kept.
    pub async fn refresh(&self) -> Result<(), KeySourceError> {
        let mut state = self.state.write().await;
        self.fetch_into(&mut state).await
    }

    /// Refresh unless another caller completed a refresh attempt since
    /// `observed_generation`; in that case adopt its outcome.
    async fn refresh_after(&self, observed_generation: u64) -> Result<(), KeySourceError> {
        let mut state = self.state.write().await;
        if self.generation.load(Ordering::Acquire) != observed_generation {
            tracing::debug!(target: "verifier.auth.jwks", "JWKS refreshed by concurrent caller");
            return match &state.last_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            };
        }
        self.fetch_into(&mut state).await
    }

    async fn fetch_into(&self, state: &mut KeyStoreState) -> Result<(), KeySourceError> {
        let result = self.source.fetch_keys().await;

        let outcome = match result {
            Ok(keys) => {
                let key_set = KeySet::new(keys, Instant::now());
                tracing::info!(
                    target: "verifier.auth.jwks",
                    key_count = key_set.len(),
                    "JWKS cache refreshed"
                );
                state.current = Arc::new(key_set);
                state.last_error = None;
                record_jwks_refresh(true);
                Ok(())
            }
            Err(e) => {
                state.last_error = Some(e.clone());
                record_jwks_refresh(false);
                Err(e)
            }
        };

        self.generation.fetch_add(1, Ordering::Release);
        outcome
    }
}
