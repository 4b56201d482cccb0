//! Bearer token verification service.
//!
//! Validates JWT access tokens issued by Microsoft Entra ID against a cached
//! key set, enforces issuer, audience, and scope policy, and falls back to a
//! static username/password table for non-token credentials.
//!
//! # Modules
//!
//! - `auth` - Key discovery, key cache, policy, claims, and the verifier
//! - `authenticator` - JWT vs. static credential dispatch
//! - `config` - Service configuration from environment
//! - `errors` - Host adapter error types with HTTP status mapping
//! - `handlers` - HTTP request handlers
//! - `models` - Request and response bodies
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod authenticator;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod routes;
