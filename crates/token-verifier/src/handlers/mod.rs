//! HTTP request handlers for the token verifier.

pub mod credentials;
pub mod health;
pub mod metrics;

pub use credentials::{authenticate, verify_token};
pub use health::health_check;
pub use metrics::metrics_handler;
