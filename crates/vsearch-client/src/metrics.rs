//! Transport metrics collection.
//!
//! Provides standardized metrics for monitoring backend calls:
//! - Request counters by operation and status
//! - Latency histograms
//! - Upload outcome counters

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Total backend requests by operation and status.
    pub const REQUESTS_TOTAL: &str = "vsearch_requests_total";

    /// Request latency in seconds by operation.
    pub const LATENCY_SECONDS: &str = "vsearch_request_latency_seconds";

    /// Finished uploads by outcome.
    pub const UPLOADS_TOTAL: &str = "vsearch_uploads_total";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record metrics for a completed backend request. `status` is the HTTP
/// status code, or the failure kind when no status was received.
pub fn record_request(operation: &str, status: &str, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        names::LATENCY_SECONDS,
        "operation" => operation.to_string()
    )
    .record(latency_ms / 1000.0);
}

/// Record the outcome of an upload (`succeeded`, `failed`, `aborted`, `abandoned`).
pub fn record_upload(outcome: &str) {
    counter!(
        names::UPLOADS_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
