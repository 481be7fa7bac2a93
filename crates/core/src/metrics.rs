//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Discovery (items listed, sources skipped)
//! - Extraction (per-method totals)
//! - Pipeline (per-item results, run duration)
//! - External services (summarizer retries, publish failures)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Discovery
// =============================================================================

/// Items discovered total by source type.
pub static ITEMS_DISCOVERED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("recap_items_discovered_total", "Total items discovered"),
        &["source_type"], // "video", "channel", "feed"
    )
    .unwrap()
});

/// Sources skipped because discovery failed.
pub static SOURCES_SKIPPED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "recap_sources_skipped_total",
        "Total sources skipped after a discovery failure",
    )
    .unwrap()
});

// =============================================================================
// Extraction
// =============================================================================

/// Successful extractions total by method.
pub static EXTRACTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("recap_extractions_total", "Total successful extractions"),
        &["method"], // "captions", "speech_to_text", "article_body"
    )
    .unwrap()
});

// =============================================================================
// Pipeline
// =============================================================================

/// Per-item outcomes.
pub static RUN_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("recap_run_items_total", "Total items handled by a run"),
        &["result"], // "processed", "failed", "skipped"
    )
    .unwrap()
});

/// End-to-end run duration.
pub static RUN_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("recap_run_duration_seconds", "Duration of a full run")
            .buckets(vec![1.0, 5.0, 15.0, 60.0, 300.0, 900.0, 3600.0]),
    )
    .unwrap()
});

// =============================================================================
// External services
// =============================================================================

/// Summarizer retry attempts.
pub static SUMMARIZE_RETRIES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "recap_summarize_retries_total",
        "Total summarizer retry attempts",
    )
    .unwrap()
});

/// Publish failures by destination.
pub static PUBLISH_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("recap_publish_failures_total", "Total publish failures"),
        &["publisher"], // "markdown", "line", "notion"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(ITEMS_DISCOVERED.clone()),
        Box::new(SOURCES_SKIPPED.clone()),
        Box::new(EXTRACTIONS_TOTAL.clone()),
        Box::new(RUN_ITEMS.clone()),
        Box::new(RUN_DURATION.clone()),
        Box::new(SUMMARIZE_RETRIES.clone()),
        Box::new(PUBLISH_FAILURES.clone()),
    ]
}
