//! Acceptance policy applied after signature verification.
//!
//! All comparisons are case-sensitive. The only normalization is that one
//! trailing `/` is ignored on issuers.

use crate::auth::jwks::DEFAULT_CACHE_LIFETIME;
use std::time::Duration;

/// Prefix Entra uses for application ID URIs.
const APP_ID_URI_PREFIX: &str = "api://";

/// Issuer, audience, and scope requirements plus the key cache lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    allowed_issuers: Vec<String>,
    audience: String,
    required_scopes: Vec<String>,
    cache_lifetime: Duration,
}

impl Policy {
    /// Policy accepting any issuer, no required scopes, default cache lifetime.
    pub fn new(audience: impl Into<String>) -> Self {
        Self {
            allowed_issuers: Vec::new(),
            audience: audience.into(),
            required_scopes: Vec::new(),
            cache_lifetime: DEFAULT_CACHE_LIFETIME,
        }
    }

    /// Restrict accepted issuers. An empty list accepts any issuer.
    #[must_use]
    pub fn with_allowed_issuers(mut self, issuers: Vec<String>) -> Self {
        self.allowed_issuers = issuers;
        self
    }

    /// Require every listed scope.
    #[must_use]
    pub fn with_required_scopes(mut self, scopes: Vec<String>) -> Self {
        self.required_scopes = scopes;
        self
    }

    /// Set the key cache lifetime.
    #[must_use]
    pub fn with_cache_lifetime(mut self, lifetime: Duration) -> Self {
        self.cache_lifetime = lifetime;
        self
    }

    pub fn allowed_issuers(&self) -> &[String] {
        &self.allowed_issuers
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn required_scopes(&self) -> &[String] {
        &self.required_scopes
    }

    pub fn cache_lifetime(&self) -> Duration {
        self.cache_lifetime
    }

    /// Whether the issuer allow-list is empty.
    pub fn accepts_any_issuer(&self) -> bool {
        self.allowed_issuers.is_empty()
    }

    /// Check the `iss` claim against the allow-list.
    pub fn issuer_allowed(&self, issuer: &str) -> bool {
        if self.accepts_any_issuer() {
            return true;
        }
        let issuer = trim_trailing_slash(issuer);
        self.allowed_issuers
            .iter()
            .any(|allowed| trim_trailing_slash(allowed) == issuer)
    }

    /// Check the `aud` values for the configured audience, bare or as
    /// `api://{audience}`.
    pub fn audience_matches<S: AsRef<str>>(&self, audiences: &[S]) -> bool {
        audiences.iter().any(|aud| {
            let aud = aud.as_ref();
            aud == self.audience
                || aud
                    .strip_prefix(APP_ID_URI_PREFIX)
                    .is_some_and(|rest| rest == self.audience)
        })
    }

    /// Required scopes absent from `granted`, in configured order.
    pub fn missing_scopes<S: AsRef<str>>(&self, granted: &[S]) -> Vec<String> {
        self.required_scopes
            .iter()
            .filter(|required| !granted.iter().any(|g| g.as_ref() == required.as_str()))
            .cloned()
            .collect()
    }
}

/// Remove at most one trailing `/`.
fn trim_trailing_slash(value: &str) -> &str {
    value.strip_suffix('/').unwrap_or(value)
}
