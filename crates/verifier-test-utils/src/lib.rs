//! # Verifier Test Utilities
//!
//! Shared test utilities for the token verifier and provider.
//!
//! This crate provides:
//! - Fixed RSA keypairs (reproducible signing and JWK publication)
//! - Test data builders (TestTokenBuilder)
//! - A mock key discovery endpoint (MockJwks)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use verifier_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let key = TestKeypair::primary(PRIMARY_KID);
//!     let jwks = MockJwks::with_keys(&[&key]).await;
//!
//!     let token = TestTokenBuilder::new()
//!         .for_user("alice")
//!         .with_scope("kafka.produce")
//!         .sign(&key);
//! }
//! ```

pub mod crypto_fixtures;
pub mod mock_jwks;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use mock_jwks::*;
pub use token_builders::*;
