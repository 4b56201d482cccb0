//! Token verifier configuration.
//!
//! Configuration is loaded from environment variables. Static user
//! passwords are redacted in Debug output.

use crate::auth::jwks::DEFAULT_CACHE_LIFETIME;
use crate::auth::policy::Policy;
use common::config::{parse_flag, LoggingConfig};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default host adapter bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8090";

/// Multi-tenant key-discovery endpoint of the Microsoft identity platform.
pub const DEFAULT_JWKS_URL: &str = "https://login.microsoftonline.com/common/discovery/v2.0/keys";

/// Token verifier configuration.
#[derive(Clone)]
pub struct Config {
    /// Host adapter bind address (default: "127.0.0.1:8090").
    pub bind_address: String,

    /// Entra tenant ID; used to derive default issuers.
    pub tenant_id: Option<String>,

    /// Expected audience (the application's client ID).
    pub client_id: String,

    /// Key-discovery URL.
    pub jwks_url: String,

    /// Allowed issuers. Empty only when `allow_any_issuer` is set.
    pub allowed_issuers: Vec<String>,

    /// Explicit opt-in to accept tokens from any issuer.
    pub allow_any_issuer: bool,

    /// Scopes every token must carry.
    pub required_scopes: Vec<String>,

    /// Key cache lifetime.
    pub jwks_cache_lifetime: Duration,

    /// Static username/password pairs for the non-JWT fallback.
    pub static_users: Vec<(String, SecretString)>,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Custom Debug implementation that redacts static user passwords.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let usernames: Vec<&str> = self.static_users.iter().map(|(u, _)| u.as_str()).collect();
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("jwks_url", &self.jwks_url)
            .field("allowed_issuers", &self.allowed_issuers)
            .field("allow_any_issuer", &self.allow_any_issuer)
            .field("required_scopes", &self.required_scopes)
            .field("jwks_cache_lifetime", &self.jwks_cache_lifetime)
            .field("static_users", &usernames)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWKS cache lifetime: {0}")]
    InvalidCacheLifetime(String),

    #[error("No allowed issuers: set ALLOWED_ISSUERS or ENTRA_TENANT_ID, or set ALLOW_ANY_ISSUER=true")]
    NoAllowedIssuers,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let client_id = non_empty(vars, "ENTRA_CLIENT_ID")
            .ok_or_else(|| ConfigError::MissingEnvVar("ENTRA_CLIENT_ID".to_string()))?;

        let tenant_id = non_empty(vars, "ENTRA_TENANT_ID");

        let bind_address =
            non_empty(vars, "BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let jwks_url = non_empty(vars, "JWKS_URL").unwrap_or_else(|| DEFAULT_JWKS_URL.to_string());

        let allow_any_issuer = vars.get("ALLOW_ANY_ISSUER").is_some_and(|v| parse_flag(v));

        let mut allowed_issuers = vars
            .get("ALLOWED_ISSUERS")
            .map(|v| split_list(v))
            .unwrap_or_default();
        if allowed_issuers.is_empty() {
            if let Some(tenant) = &tenant_id {
                allowed_issuers = default_issuers(tenant);
            }
        }
        if allowed_issuers.is_empty() && !allow_any_issuer {
            return Err(ConfigError::NoAllowedIssuers);
        }

        let required_scopes = vars
            .get("REQUIRED_SCOPES")
            .map(|v| split_list(v))
            .unwrap_or_default();

        let jwks_cache_lifetime = if let Some(value_str) = vars.get("JWKS_CACHE_SECONDS") {
            let value: u64 = value_str.trim().parse().map_err(|e| {
                ConfigError::InvalidCacheLifetime(format!(
                    "JWKS_CACHE_SECONDS must be a valid positive integer, got '{value_str}': {e}"
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidCacheLifetime(
                    "JWKS_CACHE_SECONDS must be greater than 0".to_string(),
                ));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_CACHE_LIFETIME
        };

        let static_users = vars
            .get("STATIC_USERS")
            .map(|v| parse_static_users(v, vars))
            .unwrap_or_default();

        Ok(Config {
            bind_address,
            tenant_id,
            client_id,
            jwks_url,
            allowed_issuers,
            allow_any_issuer,
            required_scopes,
            jwks_cache_lifetime,
            static_users,
            logging: LoggingConfig::from_vars(vars),
        })
    }

    /// Verification policy derived from this configuration.
    pub fn policy(&self) -> Policy {
        Policy::new(self.client_id.clone())
            .with_allowed_issuers(self.allowed_issuers.clone())
            .with_required_scopes(self.required_scopes.clone())
            .with_cache_lifetime(self.jwks_cache_lifetime)
    }
}

/// Default v2.0 and v1.0 issuers for a tenant.
pub fn default_issuers(tenant_id: &str) -> Vec<String> {
    vec![
        format!("https://login.microsoftonline.com/{tenant_id}/v2.0"),
        format!("https://sts.windows.net/{tenant_id}/"),
    ]
}

/// Parse `STATIC_USERS`.
///
/// Each comma-separated entry is either `username:password` (split at the
/// first `:`) or, when it has no `:` and is all upper case, the name of a
/// variable holding further comma-separated `username:password` pairs.
/// Invalid entries and unset variables are skipped with a warning. Later
/// entries for the same username replace earlier ones.
pub fn parse_static_users(
    value: &str,
    vars: &HashMap<String, String>,
) -> Vec<(String, SecretString)> {
    let mut users: Vec<(String, SecretString)> = Vec::new();
    let mut insert = |username: &str, password: &str| {
        users.retain(|(existing, _)| existing != username);
        users.push((username.to_string(), SecretString::from(password)));
    };

    for entry in value.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        if let Some((username, password)) = entry.split_once(':') {
            insert(username, password);
        } else if is_env_var_name(entry) {
            match vars.get(entry).map(String::as_str).filter(|v| !v.is_empty()) {
                Some(pairs) => {
                    for pair in pairs.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                        match pair.split_once(':') {
                            Some((username, password)) => insert(username, password),
                            None => tracing::warn!(
                                target: "verifier.config",
                                variable = %entry,
                                "Invalid user format in variable, skipping entry"
                            ),
                        }
                    }
                }
                None => tracing::warn!(
                    target: "verifier.config",
                    variable = %entry,
                    "Static user variable is empty or not set"
                ),
            }
        } else {
            // The entry itself may be a secret; don't log it
            tracing::warn!(
                target: "verifier.config",
                "Invalid static user format (expected username:password or ENV_VAR_NAME), skipping entry"
            );
        }
    }

    users
}

fn is_env_var_name(value: &str) -> bool {
    value.to_uppercase() == value
}

fn non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("ENTRA_CLIENT_ID".to_string(), "client-123".to_string()),
            ("ENTRA_TENANT_ID".to_string(), "tenant-abc".to_string()),
        ])
    }

    fn users(config: &Config) -> Vec<(&str, &str)> {
        config
            .static_users
            .iter()
            .map(|(u, p)| (u.as_str(), p.expose_secret()))
            .collect()
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.client_id, "client-123");
        assert_eq!(config.tenant_id.as_deref(), Some("tenant-abc"));
        assert_eq!(config.jwks_url, DEFAULT_JWKS_URL);
        assert_eq!(
            config.allowed_issuers,
            vec![
                "https://login.microsoftonline.com/tenant-abc/v2.0".to_string(),
                "https://sts.windows.net/tenant-abc/".to_string(),
            ]
        );
        assert!(!config.allow_any_issuer);
        assert!(config.required_scopes.is_empty());
        assert_eq!(config.jwks_cache_lifetime, Duration::from_secs(3600));
        assert!(config.static_users.is_empty());
        assert!(!config.logging.debug);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "0.0.0.0:9000".to_string());
        vars.insert("JWKS_URL".to_string(), "https://keys.example/jwks".to_string());
        vars.insert(
            "ALLOWED_ISSUERS".to_string(),
            "https://a.example/, https://b.example".to_string(),
        );
        vars.insert("REQUIRED_SCOPES".to_string(), "read,write".to_string());
        vars.insert("JWKS_CACHE_SECONDS".to_string(), "120".to_string());
        vars.insert("DEBUG".to_string(), "true".to_string());

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.bind_address, "0.0.0.0:9000");
        assert_eq!(config.jwks_url, "https://keys.example/jwks");
        assert_eq!(
            config.allowed_issuers,
            vec!["https://a.example/".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.required_scopes, vec!["read", "write"]);
        assert_eq!(config.jwks_cache_lifetime, Duration::from_secs(120));
        assert!(config.logging.debug);
    }

    #[test]
    fn test_from_vars_missing_client_id() {
        let mut vars = base_vars();
        vars.remove("ENTRA_CLIENT_ID");

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(var)) if var == "ENTRA_CLIENT_ID"));
    }

    #[test]
    fn test_no_issuers_without_opt_in_is_error() {
        let vars = HashMap::from([("ENTRA_CLIENT_ID".to_string(), "client-123".to_string())]);
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::NoAllowedIssuers)
        ));
    }

    #[test]
    fn test_allow_any_issuer_opt_in() {
        let vars = HashMap::from([
            ("ENTRA_CLIENT_ID".to_string(), "client-123".to_string()),
            ("ALLOW_ANY_ISSUER".to_string(), "true".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();
        assert!(config.allowed_issuers.is_empty());
        assert!(config.policy().accepts_any_issuer());
    }

    #[test]
    fn test_cache_lifetime_rejects_zero_and_garbage() {
        let mut vars = base_vars();
        vars.insert("JWKS_CACHE_SECONDS".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidCacheLifetime(_))
        ));

        vars.insert("JWKS_CACHE_SECONDS".to_string(), "an hour".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidCacheLifetime(_))
        ));
    }

    #[test]
    fn test_policy_from_config() {
        let mut vars = base_vars();
        vars.insert("REQUIRED_SCOPES".to_string(), "read".to_string());
        let policy = Config::from_vars(&vars).unwrap().policy();

        assert_eq!(policy.audience(), "client-123");
        assert_eq!(policy.required_scopes(), &["read".to_string()]);
        assert!(policy.issuer_allowed("https://sts.windows.net/tenant-abc"));
    }

    #[test]
    fn test_static_users_literal_pairs() {
        let mut vars = base_vars();
        vars.insert(
            "STATIC_USERS".to_string(),
            "alice:secret1, bob:pa:ss".to_string(),
        );
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(users(&config), vec![("alice", "secret1"), ("bob", "pa:ss")]);
    }

    #[test]
    fn test_static_users_from_variable() {
        let mut vars = base_vars();
        vars.insert("STATIC_USERS".to_string(), "KAFKA_USERS,carol:c".to_string());
        vars.insert("KAFKA_USERS".to_string(), "alice:secret1,bob:secret2".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(
            users(&config),
            vec![("alice", "secret1"), ("bob", "secret2"), ("carol", "c")]
        );
    }

    #[test]
    fn test_static_users_invalid_entries_skipped() {
        let mut vars = base_vars();
        vars.insert(
            "STATIC_USERS".to_string(),
            "notapair,UNSET_VAR,alice:secret1".to_string(),
        );
        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(users(&config), vec![("alice", "secret1")]);
    }

    #[test]
    fn test_static_users_later_entry_wins() {
        let users = parse_static_users("alice:old,alice:new", &HashMap::new());
        assert_eq!(users.len(), 1);
        assert_eq!(users.first().unwrap().1.expose_secret(), "new");
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let mut vars = base_vars();
        vars.insert("STATIC_USERS".to_string(), "alice:hunter2".to_string());
        let config = Config::from_vars(&vars).unwrap();

        let debug_str = format!("{config:?}");
        assert!(debug_str.contains("alice"));
        assert!(!debug_str.contains("hunter2"));
    }
}
