//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Provider calls (requests, latency, token mints)
//! - Cache gateway (lookups, swallowed backend errors)
//! - Import reconciliation (per-name outcomes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Provider
// =============================================================================

/// Provider requests by operation and status.
pub static PROVIDER_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("questlog_provider_requests_total", "Total provider requests"),
        &["operation", "status"], // "success", "unauthorized", "rate_limited", ...
    )
    .unwrap()
});

/// Provider request duration in seconds, limiter wait excluded.
pub static PROVIDER_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "questlog_provider_request_duration_seconds",
            "Duration of provider requests",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"],
    )
    .unwrap()
});

/// Token mints by result.
pub static TOKEN_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("questlog_token_fetches_total", "Total provider token mints"),
        &["result"], // "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Cache
// =============================================================================

/// Cache lookups by entry kind and result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("questlog_cache_lookups_total", "Total cache lookups"),
        &["kind", "result"], // result: "hit", "miss", "malformed"
    )
    .unwrap()
});

/// Cache backend errors swallowed by the gateway.
pub static CACHE_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "questlog_cache_errors_total",
            "Cache backend errors treated as miss or no-op",
        ),
        &["operation"], // "get", "set", "delete"
    )
    .unwrap()
});

// =============================================================================
// Import
// =============================================================================

/// Import outcomes per name.
pub static IMPORT_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("questlog_import_outcomes_total", "Import outcomes per name"),
        &["outcome"], // "exact", "best", "needs_review", "error"
    )
    .unwrap()
});

/// All core metrics, for registration with a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(PROVIDER_REQUESTS.clone()),
        Box::new(PROVIDER_DURATION.clone()),
        Box::new(TOKEN_FETCHES.clone()),
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(CACHE_ERRORS.clone()),
        Box::new(IMPORT_OUTCOMES.clone()),
    ]
}
