//! Claims extracted from verified tokens.
//!
//! [`RawClaims`] mirrors the Entra access token payload; [`Claims`] is the
//! normalized view returned to callers. `subject` and `email` are redacted
//! in Debug output to prevent exposure in logs.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// `aud` is either a single string or an array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// Normalize to a list.
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Audience::One(aud) => vec![aud],
            Audience::Many(auds) => auds,
        }
    }
}

/// Token payload as issued.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub upn: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub roles: Option<serde_json::Value>,
    #[serde(default)]
    pub scp: Option<String>,
    #[serde(default)]
    pub appid: Option<String>,
    #[serde(default)]
    pub azp: Option<String>,
    #[serde(default)]
    pub tid: Option<String>,
    #[serde(default)]
    pub oid: Option<String>,
}

impl RawClaims {
    /// Delegated scopes from `scp`, split on whitespace.
    pub fn scopes(&self) -> Vec<&str> {
        self.scp
            .as_deref()
            .map(|scp| scp.split_whitespace().collect())
            .unwrap_or_default()
    }
}

/// Normalized claims of an accepted token.
#[derive(Clone, PartialEq, Eq)]
pub struct Claims {
    /// `sub` - redacted in Debug output.
    pub subject: String,
    pub issuer: String,
    pub audiences: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub issued_at: Option<DateTime<Utc>>,
    /// First non-empty of `email`, `preferred_username`, `upn` - redacted in
    /// Debug output.
    pub email: Option<String>,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub scopes: Vec<String>,
    /// `appid` (v1 tokens) or `azp` (v2 tokens).
    pub app_id: Option<String>,
    pub tenant_id: Option<String>,
    pub object_id: Option<String>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("subject", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audiences", &self.audiences)
            .field("expires_at", &self.expires_at)
            .field("issued_at", &self.issued_at)
            .field("email", &self.email.as_ref().map(|_| "[REDACTED]"))
            .field("name", &self.name)
            .field("roles", &self.roles)
            .field("scopes", &self.scopes)
            .field("app_id", &self.app_id)
            .field("tenant_id", &self.tenant_id)
            .field("object_id", &self.object_id)
            .finish()
    }
}

impl From<RawClaims> for Claims {
    fn from(raw: RawClaims) -> Self {
        let scopes = raw.scopes().into_iter().map(str::to_string).collect();

        // First present claim wins, even when empty
        let email = raw.email.or(raw.preferred_username).or(raw.upn);

        let roles = match raw.roles {
            Some(serde_json::Value::Array(values)) => values
                .into_iter()
                .filter_map(|value| match value {
                    serde_json::Value::String(role) => Some(role),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        Self {
            subject: raw.sub.unwrap_or_default(),
            issuer: raw.iss.unwrap_or_default(),
            audiences: raw.aud.map(Audience::into_vec).unwrap_or_default(),
            expires_at: raw.exp.and_then(|exp| DateTime::from_timestamp(exp, 0)),
            issued_at: raw.iat.and_then(|iat| DateTime::from_timestamp(iat, 0)),
            email,
            name: raw.name,
            roles,
            scopes,
            app_id: raw.appid.or(raw.azp),
            tenant_id: raw.tid,
            object_id: raw.oid,
        }
    }
}
