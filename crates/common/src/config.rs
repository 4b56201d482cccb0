//! Logging configuration shared by the verifier and provider binaries.

use std::collections::HashMap;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
///
/// `debug` raises the default filter to `debug` for the workspace crates.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoggingConfig {
    /// Enable debug-level logging for workspace crates.
    pub debug: bool,

    /// Output format.
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Read `DEBUG` and `LOG_FORMAT` from a variable map.
    ///
    /// Unknown values fall back to the defaults (`false`, text).
    #[must_use]
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let debug = vars.get("DEBUG").is_some_and(|v| parse_flag(v));

        let format = match vars.get("LOG_FORMAT").map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "json" => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Self { debug, format }
    }

    /// Default `EnvFilter` directive for the given crate names.
    #[must_use]
    pub fn default_filter(&self, crates: &[&str]) -> String {
        let level = if self.debug { "debug" } else { "info" };
        let mut directives: Vec<String> = crates.iter().map(|c| format!("{c}={level}")).collect();
        directives.push(format!("common={level}"));
        directives.push("tower_http=info".to_string());
        directives.join(",")
    }
}

/// Parse a boolean flag from an environment value.
///
/// Accepts `1`, `true`, `yes`, `on` (case-insensitive).
#[must_use]
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_vars(&HashMap::new());
        assert!(!config.debug);
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn test_debug_and_json() {
        let config = LoggingConfig::from_vars(&vars(&[("DEBUG", "true"), ("LOG_FORMAT", "JSON")]));
        assert!(config.debug);
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_default_filter_levels() {
        let quiet = LoggingConfig::default();
        assert_eq!(
            quiet.default_filter(&["token_verifier"]),
            "token_verifier=info,common=info,tower_http=info"
        );

        let loud = LoggingConfig {
            debug: true,
            format: LogFormat::Text,
        };
        assert!(loud
            .default_filter(&["token_verifier"])
            .starts_with("token_verifier=debug,common=debug"));
    }
}
