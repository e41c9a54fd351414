//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the debridfs daemon:
//! - HTTP request metrics (latency, counts, in flight)
//! - Index contents and reconciler state (collected dynamically)
//! - Core reconciliation, poller, stream and GC metrics

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "debridfs_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("debridfs_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "debridfs_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Index Metrics (collected dynamically)
// =============================================================================

/// Ingested torrents.
pub static INDEXED_TORRENTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("debridfs_indexed_torrents", "Number of ingested torrents").unwrap()
});

/// File records bound to tree nodes.
pub static INDEXED_FILES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("debridfs_indexed_files", "Number of mirrored files").unwrap()
});

/// Permanently rejected entries.
pub static REJECTED_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "debridfs_rejected_entries",
        "Number of permanently rejected entries",
    )
    .unwrap()
});

/// Bytes mirrored across all file records.
pub static INDEXED_BYTES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("debridfs_indexed_bytes", "Total size of mirrored files").unwrap()
});

// =============================================================================
// Reconciler Metrics (collected dynamically)
// =============================================================================

/// Reconciler running state (1 = pass in progress, 0 = idle).
pub static SYNC_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "debridfs_sync_running",
        "Whether a reconciliation pass is in progress (1) or not (0)",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Index
    registry
        .register(Box::new(INDEXED_TORRENTS.clone()))
        .unwrap();
    registry.register(Box::new(INDEXED_FILES.clone())).unwrap();
    registry
        .register(Box::new(REJECTED_ENTRIES.clone()))
        .unwrap();
    registry.register(Box::new(INDEXED_BYTES.clone())).unwrap();

    // Reconciler
    registry.register(Box::new(SYNC_RUNNING.clone())).unwrap();

    // Core metrics (reconciliation, pollers, streaming, GC)
    for metric in debridfs_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Collect dynamic metrics from current application state.
///
/// This is called before encoding metrics to update gauges with current values
/// from the index and the reconciler.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    SYNC_RUNNING.set(if state.reconciler().is_running() { 1 } else { 0 });

    if let Ok(stats) = state.index().stats() {
        INDEXED_TORRENTS.set(stats.torrents as i64);
        INDEXED_FILES.set(stats.files as i64);
        REJECTED_ENTRIES.set(stats.rejected as i64);
        INDEXED_BYTES.set(stats.total_bytes as i64);
    }
}

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    NUMERIC_SEGMENT.replace_all(path, "/{id}$1").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_node_id() {
        let path = "/api/v1/nodes/12345/stream";
        assert_eq!(normalize_path(path), "/api/v1/nodes/{id}/stream");
    }

    #[test]
    fn test_normalize_path_trailing_id() {
        let path = "/api/v1/nodes/42";
        assert_eq!(normalize_path(path), "/api/v1/nodes/{id}");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        // Access metrics to ensure they're initialized
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("debridfs_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_all_metrics() {
        // Prometheus only outputs vector metrics that have been accessed
        HTTP_REQUEST_DURATION
            .with_label_values(&["GET", "/test", "200"])
            .observe(0.1);
        HTTP_REQUESTS_IN_FLIGHT.set(0);
        INDEXED_TORRENTS.set(0);
        SYNC_RUNNING.set(0);
        debridfs_core::metrics::SYNC_PASSES
            .with_label_values(&["complete"])
            .inc_by(0);

        let output = encode_metrics();

        // HTTP metrics
        assert!(output.contains("debridfs_http_request_duration_seconds"));
        assert!(output.contains("debridfs_http_requests_in_flight"));

        // Index and reconciler
        assert!(output.contains("debridfs_indexed_torrents"));
        assert!(output.contains("debridfs_indexed_files"));
        assert!(output.contains("debridfs_sync_running"));

        // Core metrics
        assert!(output.contains("debridfs_sync_passes_total"));
        assert!(output.contains("debridfs_gc_directories_pruned_total"));
    }
}
