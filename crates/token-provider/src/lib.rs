//! Outbound token provider.
//!
//! Obtains access tokens from Microsoft Entra ID with the client-credentials
//! grant so the host can present them to the upstream service.
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `handlers` - HTTP request handlers
//! - `models` - Response bodies
//! - `observability` - Prometheus metrics
//! - `provider` - `TokenProvider` implementation
//! - `routes` - Axum router setup

pub mod config;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod provider;
pub mod routes;
