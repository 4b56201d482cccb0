//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used throughout the workspace for client
//! secrets, static passwords, and bearer tokens. `SecretString` implements
//! `Debug` with redaction, so any struct deriving `Debug` that holds one is
//! safe to pass to `tracing`.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct StaticUser {
//!     username: String,
//!     password: SecretString,
//! }
//!
//! let user = StaticUser {
//!     username: "alice".to_string(),
//!     password: SecretString::from("secret1"),
//! };
//!
//! assert!(!format!("{user:?}").contains("secret1"));
//! assert_eq!(user.password.expose_secret(), "secret1");
//! ```
//!
//! Use `SecretString` for:
//! - OAuth client secrets
//! - Static user passwords
//! - Access tokens obtained from the identity provider

pub use secrecy::{ExposeSecret, SecretString};
