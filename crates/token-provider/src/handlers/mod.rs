//! HTTP request handlers for the token provider.

pub mod health;
pub mod metrics;
pub mod token;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use token::get_token;
