//! Metrics collection and Prometheus export.
//!
//! Installs the Prometheus recorder and records the service's domain
//! counters. Without an installed recorder the `metrics` macros are no-ops.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::sync::OnceLock;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Call once at startup, before any metric
/// is recorded.
pub fn init_metrics() -> Result<(), AppError> {
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("failed to install Prometheus recorder: {}", e))
    })?;

    METRICS_HANDLE
        .set(handle)
        .map_err(|_| AppError::ConfigError(anyhow::anyhow!("metrics already initialized")))
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

/// Count a store operation by name and outcome.
pub fn record_operation(operation: &'static str, success: bool) {
    let status = if success { "success" } else { "error" };
    metrics::counter!(
        "subscription_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
}

/// Count a renewal projection by whether it produced a date.
pub fn record_projection(projected: bool) {
    let outcome = if projected { "projected" } else { "none" };
    metrics::counter!("renewal_projections_total", "outcome" => outcome).increment(1);
}
