//! Metrics definitions for the token provider.
//!
//! - `provider_token_requests_total{status}` - `status` is `success` or `error`

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record the outcome of an outbound token request.
///
/// Metric: `provider_token_requests_total`
/// Labels: `status`
pub fn record_token_request(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!("provider_token_requests_total", "status" => status).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_token_request() {
        // No recorder installed; must not panic
        record_token_request(true);
        record_token_request(false);
    }
}
