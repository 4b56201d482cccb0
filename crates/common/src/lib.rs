//! Common utilities and types shared by the token verifier and token provider.

#![warn(clippy::pedantic)]

/// Module for logging configuration
pub mod config;

/// Module for host-facing call contracts
pub mod host;

/// Module for JWT header utilities (size limits, kid extraction, shape checks)
pub mod jwt;

/// Module for tracing subscriber initialisation
pub mod observability;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for the stable host status codes
pub mod status;

/// Module for the OAuth 2.0 client-credentials grant
pub mod token_issuer;
