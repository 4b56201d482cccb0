//! Observability for the token provider.

pub mod metrics;
