//! Metrics and observability utilities
//!
//! Prometheus-style metrics with SLO-aligned histograms and standardized
//! naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all BD Property metrics
pub const METRICS_PREFIX: &str = "bdproperty";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 150ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms - P50 target
    0.075,  // 75ms
    0.100,  // 100ms
    0.150,  // 150ms - P99 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Listing query metrics
    describe_counter!(
        format!("{}_listing_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of listing list queries"
    );

    describe_histogram!(
        format!("{}_listing_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Listing list query latency in seconds"
    );

    describe_gauge!(
        format!("{}_listing_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of listings returned by the last list query"
    );

    describe_counter!(
        format!("{}_listing_filters_total", METRICS_PREFIX),
        Unit::Count,
        "Filter constraints applied, by field"
    );

    // Detail metrics
    describe_counter!(
        format!("{}_detail_lookups_total", METRICS_PREFIX),
        Unit::Count,
        "Detail lookups by outcome"
    );

    // Store metrics
    describe_histogram!(
        format!("{}_store_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Listing store query latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record a completed list query
pub fn record_listing_query(duration_secs: f64, sort: &str, returned: usize, fields: &[&'static str]) {
    counter!(
        format!("{}_listing_queries_total", METRICS_PREFIX),
        "sort" => sort.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_listing_query_duration_seconds", METRICS_PREFIX),
        "sort" => sort.to_string()
    )
    .record(duration_secs);

    gauge!(format!("{}_listing_results_count", METRICS_PREFIX)).set(returned as f64);

    for field in fields {
        counter!(
            format!("{}_listing_filters_total", METRICS_PREFIX),
            "field" => *field
        )
        .increment(1);
    }
}

/// Helper to record a detail lookup
pub fn record_detail_lookup(outcome: &'static str) {
    counter!(
        format!("{}_detail_lookups_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

/// Helper to record a single store round trip
pub fn record_store_query(operation: &'static str, duration_secs: f64) {
    histogram!(
        format!("{}_store_query_duration_seconds", METRICS_PREFIX),
        "operation" => operation
    )
    .record(duration_secs);
}
