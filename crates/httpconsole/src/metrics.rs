//! Prometheus metrics for httpconsole.
//!
//! Tracks request volume and latency, bucket operations and interaction-log writes.
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

lazy_static! {
    /// Total number of requests processed
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "httpconsole_requests_total",
        "Total number of requests processed",
        &["method", "status"]
    )
    .unwrap();

    /// Request duration
    pub static ref REQUEST_DURATION_MS: HistogramVec = register_histogram_vec!(
        "httpconsole_request_duration_ms",
        "Histogram of request handling time in milliseconds",
        &["route"],
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]
    )
    .unwrap();

    /// Bucket operations
    pub static ref BUCKET_OPS_TOTAL: CounterVec = register_counter_vec!(
        "httpconsole_bucket_operations_total",
        "Total number of bucket operations",
        &["operation", "result"]  // operation: create|view|replay|log, result: ok|invalid|not_found|error
    )
    .unwrap();

    /// Interaction log writes issued off the response path
    pub static ref LOG_WRITES_TOTAL: CounterVec = register_counter_vec!(
        "httpconsole_interaction_log_writes_total",
        "Total number of interaction log writes",
        &["result"]  // result: ok|error
    )
    .unwrap();
}

/// Collect and return all metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record request processing
pub fn record_request(method: &str, status: u16, route: &str, duration_ms: f64) {
    REQUESTS_TOTAL
        .with_label_values(&[method_label(method), &status.to_string()])
        .inc();
    REQUEST_DURATION_MS
        .with_label_values(&[route])
        .observe(duration_ms);
}

/// Standard methods keep their name; extension methods share one series.
fn method_label(method: &str) -> &str {
    const STANDARD: &[&str] = &[
        "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
    ];
    if STANDARD.contains(&method) {
        method
    } else {
        "OTHER"
    }
}

/// Helper to record a bucket operation
pub fn record_bucket_op(operation: &str, result: &str) {
    BUCKET_OPS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
}

/// Helper to record an interaction log write
pub fn record_log_write(success: bool) {
    let result = if success { "ok" } else { "error" };
    LOG_WRITES_TOTAL.with_label_values(&[result]).inc();
}
