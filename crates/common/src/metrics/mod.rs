//! Metrics and observability utilities
//!
//! Prometheus metrics with latency histograms and standardized naming
//! conventions. Recording is a no-op until a recorder is installed.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Fieldnotes metrics
pub const METRICS_PREFIX: &str = "fieldnotes";

/// Histogram buckets for request latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Buckets for export rendering, which materializes whole result sets
pub const EXPORT_BUCKETS: &[f64] = &[
    0.010,  // 10ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
];

/// Register all metric descriptions
pub fn register_metrics() {
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

    describe_counter!(
        format!("{}_records_listed_total", METRICS_PREFIX),
        Unit::Count,
        "Total record list queries"
    );

    describe_histogram!(
        format!("{}_records_page_size", METRICS_PREFIX),
        Unit::Count,
        "Number of records returned per list page"
    );

    describe_counter!(
        format!("{}_exports_total", METRICS_PREFIX),
        Unit::Count,
        "Total exports by format"
    );

    describe_counter!(
        format!("{}_exported_records_total", METRICS_PREFIX),
        Unit::Count,
        "Total records written into exports"
    );

    describe_histogram!(
        format!("{}_export_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Export query and rendering latency in seconds"
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

/// Record one list query and the size of the page it returned
pub fn record_listing(page_len: usize, filtered: bool) {
    counter!(
        format!("{}_records_listed_total", METRICS_PREFIX),
        "filtered" => filtered.to_string()
    )
    .increment(1);

    histogram!(format!("{}_records_page_size", METRICS_PREFIX)).record(page_len as f64);
}

/// Record a finished export
pub fn record_export(format: &str, record_count: usize, duration_secs: f64) {
    counter!(
        format!("{}_exports_total", METRICS_PREFIX),
        "format" => format.to_string()
    )
    .increment(1);

    counter!(
        format!("{}_exported_records_total", METRICS_PREFIX),
        "format" => format.to_string()
    )
    .increment(record_count as u64);

    histogram!(
        format!("{}_export_duration_seconds", METRICS_PREFIX),
        "format" => format.to_string()
    )
    .record(duration_secs);
}
