//! Metrics definitions for the token verifier.
//!
//! All metrics follow Prometheus naming conventions:
//! - `verifier_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `outcome`: `accepted` plus one value per `VerifyError` variant
//! - `status`: `success`, `error`
//! - `mode`: `jwt`, `static`

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Verification is local except on key refresh
        .set_buckets_for_metric(
            Matcher::Prefix("verifier_token_validation".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
                5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set token validation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Validation Metrics
// ============================================================================

/// Record a token verification outcome.
///
/// Metric: `verifier_token_validations_total`, `verifier_token_validation_duration_seconds`
/// Labels: `outcome`
pub fn record_token_validation(outcome: &'static str, duration: Duration) {
    histogram!("verifier_token_validation_duration_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());

    counter!("verifier_token_validations_total", "outcome" => outcome).increment(1);
}

// ============================================================================
// Key Store Metrics
// ============================================================================

/// Record a key set refresh attempt.
///
/// Metric: `verifier_jwks_refresh_total`
/// Labels: `status`
pub fn record_jwks_refresh(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!("verifier_jwks_refresh_total", "status" => status).increment(1);
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record an `authenticate` call.
///
/// Metric: `verifier_authentications_total`
/// Labels: `mode`, `outcome`
pub fn record_authentication(mode: &'static str, accepted: bool) {
    let outcome = if accepted { "accepted" } else { "rejected" };
    counter!("verifier_authentications_total", "mode" => mode, "outcome" => outcome).increment(1);
}
