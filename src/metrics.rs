//! Prometheus metrics collection for gcore-dns01
//!
//! This module provides metrics for challenge operations and provider calls.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Gauge, HistogramVec};

//==============================================================================
// Metrics
//==============================================================================

lazy_static! {
    /// Completed challenge operations by outcome
    pub static ref OPERATIONS_TOTAL: CounterVec = register_counter_vec!(
        "gcore_dns01_operations_total",
        "Total number of completed challenge operations",
        &["operation", "outcome"]
    )
    .unwrap();

    /// Failed challenge operations by error kind
    pub static ref ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "gcore_dns01_errors_total",
        "Total number of failed challenge operations",
        &["operation", "kind"]
    )
    .unwrap();

    /// Current number of consecutive failed operations
    pub static ref CONSECUTIVE_FAILURES: Gauge = register_gauge!(
        "gcore_dns01_consecutive_failures",
        "Current number of consecutive failed operations"
    )
    .unwrap();

    /// Provider request duration histogram
    pub static ref PROVIDER_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "gcore_dns01_provider_request_duration_seconds",
        "Provider API request duration in seconds",
        &["operation"]
    )
    .unwrap();
}

//==============================================================================
// Public Functions
//==============================================================================

/// Records a completed challenge operation
///
/// # Arguments
///
/// * `operation` - "present" or "cleanup"
/// * `outcome` - Reconciliation outcome (e.g., "created", "unchanged")
pub fn record_operation(operation: &str, outcome: &str) {
    OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

/// Records a failed challenge operation
///
/// # Arguments
///
/// * `operation` - "present" or "cleanup"
/// * `kind` - Error kind (e.g., "zone_not_found")
pub fn record_error(operation: &str, kind: &str) {
    ERRORS_TOTAL.with_label_values(&[operation, kind]).inc();
}

/// Sets the current number of consecutive failures
pub fn set_consecutive_failures(count: u64) {
    CONSECUTIVE_FAILURES.set(count as f64);
}

/// Starts a timer for one provider API request
///
/// The duration is observed when the returned timer is dropped.
pub fn start_provider_timer(operation: &str) -> HistogramTimer {
    PROVIDER_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .start_timer()
}

/// Collects all metrics in Prometheus text format
pub fn gather_metrics() -> Result<String> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics are not valid UTF-8")
}

//==============================================================================
// Types
//==============================================================================

/// Histogram timer for measuring duration
pub type HistogramTimer = prometheus::HistogramTimer;

//==============================================================================
// Tests
//==============================================================================
