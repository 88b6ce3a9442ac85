//! Metrics collection.
//!
//! # Metrics
//! - `crawl_requests_total` (counter): completed attempts by method, status
//! - `crawl_request_duration_seconds` (histogram): latency of completed calls
//! - `crawl_retries_total` (counter): scheduled retries by cause
//! - `crawl_failures_total` (counter): terminal failures by kind
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; the embedding application picks the exporter
//! - Without a recorder installed every call is a no-op

use std::time::Instant;

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "crawl_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("crawl_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(cause: &str) {
    metrics::counter!("crawl_retries_total", "cause" => cause.to_string()).increment(1);
}

pub fn record_failure(kind: &str) {
    metrics::counter!("crawl_failures_total", "kind" => kind.to_string()).increment(1);
}
