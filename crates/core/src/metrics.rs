//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Reconciliation (passes, triggers, per-entry outcomes)
//! - Change detection (poller ticks)
//! - Streaming (link resolutions)
//! - Garbage collection

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Reconciliation
// =============================================================================

/// Reconciliation passes by result.
pub static SYNC_PASSES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("debridfs_sync_passes_total", "Total reconciliation passes"),
        &["result"], // "complete", "partial", "aborted"
    )
    .unwrap()
});

/// Reconciliation pass duration in seconds.
pub static SYNC_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "debridfs_sync_duration_seconds",
            "Duration of a reconciliation pass",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["trigger"],
    )
    .unwrap()
});

/// Triggers received by source and whether they started a pass.
pub static SYNC_TRIGGERS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("debridfs_sync_triggers_total", "Total reconciliation triggers"),
        &["source", "result"], // result: "started", "dropped"
    )
    .unwrap()
});

/// Catalog entries processed by outcome.
pub static ENTRIES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "debridfs_entries_processed_total",
            "Catalog entries processed during reconciliation",
        ),
        &["outcome"], // "ingested", "rejected", "failed", "removed", "orphaned"
    )
    .unwrap()
});

// =============================================================================
// Change detection
// =============================================================================

/// Poller ticks by poller and result.
pub static POLLER_TICKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("debridfs_poller_ticks_total", "Total poller ticks"),
        &["poller", "result"],
    )
    .unwrap()
});

// =============================================================================
// Streaming
// =============================================================================

/// Stream URL resolutions by result.
pub static STREAM_RESOLUTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "debridfs_stream_resolutions_total",
            "Total streaming link resolutions",
        ),
        &["result"], // "resolved", "not_remote", "not_found", "error"
    )
    .unwrap()
});

// =============================================================================
// Garbage collection
// =============================================================================

/// Garbage collection runs by result.
pub static GC_RUNS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("debridfs_gc_runs_total", "Total garbage collection runs"),
        &["result"],
    )
    .unwrap()
});

/// Empty directories pruned.
pub static GC_DIRECTORIES_PRUNED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "debridfs_gc_directories_pruned_total",
        "Total empty directories pruned",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Reconciliation
        Box::new(SYNC_PASSES.clone()),
        Box::new(SYNC_DURATION.clone()),
        Box::new(SYNC_TRIGGERS.clone()),
        Box::new(ENTRIES_PROCESSED.clone()),
        // Change detection
        Box::new(POLLER_TICKS.clone()),
        // Streaming
        Box::new(STREAM_RESOLUTIONS.clone()),
        // Garbage collection
        Box::new(GC_RUNS.clone()),
        Box::new(GC_DIRECTORIES_PRUNED.clone()),
    ]
}
