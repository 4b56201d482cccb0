//! Token provider configuration.
//!
//! Configuration is loaded from environment variables. The client secret is
//! redacted in Debug output.

use common::config::LoggingConfig;
use common::secret::SecretString;
use common::token_issuer::default_token_url;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default host adapter bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8091";

/// Token provider configuration.
#[derive(Clone)]
pub struct Config {
    /// Host adapter bind address (default: "127.0.0.1:8091").
    pub bind_address: String,

    /// Application (client) ID registered with Entra.
    pub client_id: String,

    /// Client secret (protected by SecretString).
    pub client_secret: SecretString,

    /// Entra tenant ID.
    pub tenant_id: String,

    /// Scope requested for the upstream service, e.g. `api://kafka/.default`.
    pub scope: String,

    /// Token endpoint. Derived from the tenant unless `TOKEN_URL` is set.
    pub token_url: String,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Custom Debug implementation that redacts the client secret.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("tenant_id", &self.tenant_id)
            .field("scope", &self.scope)
            .field("token_url", &self.token_url)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let client_id = required(vars, "ENTRA_CLIENT_ID")?;
        let client_secret = SecretString::from(required(vars, "ENTRA_CLIENT_SECRET")?);
        let tenant_id = required(vars, "ENTRA_TENANT_ID")?;
        let scope = required(vars, "TOKEN_SCOPE")?;

        let token_url = non_empty(vars, "TOKEN_URL").unwrap_or_else(|| default_token_url(&tenant_id));

        let bind_address =
            non_empty(vars, "BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        Ok(Config {
            bind_address,
            client_id,
            client_secret,
            tenant_id,
            scope,
            token_url,
            logging: LoggingConfig::from_vars(vars),
        })
    }
}

fn required(vars: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    non_empty(vars, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("ENTRA_CLIENT_ID".to_string(), "test-client".to_string()),
            ("ENTRA_CLIENT_SECRET".to_string(), "test-secret".to_string()),
            ("ENTRA_TENANT_ID".to_string(), "test-tenant".to_string()),
            ("TOKEN_SCOPE".to_string(), "api://kafka/.default".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&base_vars()).unwrap();

        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.client_id, "test-client");
        assert_eq!(config.client_secret.expose_secret(), "test-secret");
        assert_eq!(config.scope, "api://kafka/.default");
        assert_eq!(
            config.token_url,
            "https://login.microsoftonline.com/test-tenant/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_token_url_override() {
        let mut vars = base_vars();
        vars.insert(
            "TOKEN_URL".to_string(),
            "http://localhost:9999/token".to_string(),
        );
        vars.insert("BIND_ADDRESS".to_string(), "0.0.0.0:9000".to_string());

        let config = Config::from_vars(&vars).unwrap();
        assert_eq!(config.token_url, "http://localhost:9999/token");
        assert_eq!(config.bind_address, "0.0.0.0:9000");
    }

    #[test]
    fn test_each_required_variable() {
        for key in [
            "ENTRA_CLIENT_ID",
            "ENTRA_CLIENT_SECRET",
            "ENTRA_TENANT_ID",
            "TOKEN_SCOPE",
        ] {
            let mut vars = base_vars();
            vars.remove(key);
            assert!(
                matches!(Config::from_vars(&vars), Err(ConfigError::MissingEnvVar(ref missing)) if missing == key),
                "missing {key} accepted"
            );

            let mut vars = base_vars();
            vars.insert(key.to_string(), "  ".to_string());
            assert!(Config::from_vars(&vars).is_err(), "blank {key} accepted");
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = Config::from_vars(&base_vars()).unwrap();
        let debug_str = format!("{config:?}");
        assert!(!debug_str.contains("test-secret"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
