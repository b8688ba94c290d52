//! HTTP metrics and the process-wide Prometheus registry.
//!
//! Provider, cache and import metrics are defined in `questlog_core::metrics`
//! and registered here next to the HTTP ones.

use once_cell::sync::Lazy;
use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Registry served on `GET /metrics`: HTTP metrics plus every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for collector in http_metrics()
        .into_iter()
        .chain(questlog_core::metrics::all_metrics())
    {
        if let Err(e) = registry.register(collector) {
            tracing::error!(error = %e, "Failed to register metric");
        }
    }
    registry
});

/// Latency by route template, method and status.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "questlog_http_request_duration_seconds",
            "Time to answer an HTTP request",
        )
        .buckets(vec![
            0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("questlog_http_requests_total", "Answered HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "questlog_http_requests_in_flight",
        "HTTP requests being handled right now",
    )
    .unwrap()
});

fn http_metrics() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
    ]
}

/// Render the registry in the Prometheus text format.
///
/// An encoding failure yields an empty body rather than a 500.
pub fn encode_metrics() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use questlog_core::metrics::{CACHE_LOOKUPS, IMPORT_OUTCOMES, PROVIDER_REQUESTS};

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("questlog_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_includes_core_metrics() {
        // Vec metrics only show up once a label set has been touched
        PROVIDER_REQUESTS
            .with_label_values(&["search", "success"])
            .inc();
        CACHE_LOOKUPS.with_label_values(&["search", "miss"]).inc();
        IMPORT_OUTCOMES.with_label_values(&["exact"]).inc();
        HTTP_REQUESTS_IN_FLIGHT.set(0);

        let output = encode_metrics();
        assert!(output.contains("questlog_provider_requests_total"));
        assert!(output.contains("questlog_cache_lookups_total"));
        assert!(output.contains("questlog_import_outcomes_total"));
        assert!(output.contains("questlog_http_requests_in_flight"));
    }
}
