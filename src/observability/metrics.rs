//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, route, status
//! - `http_request_duration_seconds` (histogram): handler-to-finish latency
//! - `http_request_size_bytes` (histogram): declared request body length
//! - `http_response_size_bytes` (histogram): declared response body length
//! - `http_in_flight_requests` (gauge): requests started but not finished
//! - `http_request_concurrency` (gauge): periodic sample of the same count,
//!   set from the active-request counter
//! - `http_requests_errors_total` (counter): responses with status >= 400
//! - `http_request_network_latency_seconds` (histogram): scheduling delay
//!   before the request is handed to the next stage
//!
//! # Design Decisions
//! - Recording goes through [`MetricsSink`] so the middleware can be tested
//!   against an in-memory sink
//! - The production sink forwards to the `metrics` facade, which never fails;
//!   with no recorder installed every call is a no-op

use std::net::SocketAddr;

use metrics::{describe_counter, describe_gauge, describe_histogram, Label, Unit};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub const HTTP_REQUEST_SIZE_BYTES: &str = "http_request_size_bytes";
pub const HTTP_RESPONSE_SIZE_BYTES: &str = "http_response_size_bytes";
pub const HTTP_IN_FLIGHT_REQUESTS: &str = "http_in_flight_requests";
pub const HTTP_REQUESTS_ERRORS_TOTAL: &str = "http_requests_errors_total";
pub const HTTP_REQUEST_NETWORK_LATENCY_SECONDS: &str = "http_request_network_latency_seconds";
pub const HTTP_REQUEST_CONCURRENCY: &str = "http_request_concurrency";

pub const DURATION_BUCKETS: &[f64] = &[0.1, 0.3, 1.5, 5.0, 10.0];
pub const SIZE_BUCKETS: &[f64] = &[100.0, 500.0, 1000.0, 5000.0, 10000.0];
pub const NETWORK_LATENCY_BUCKETS: &[f64] = &[0.001, 0.01, 0.1, 0.5, 1.0, 5.0];

/// Destination for request observations.
///
/// All operations are fire-and-forget. Implementations must not panic and
/// must not block.
pub trait MetricsSink: Send + Sync + 'static {
    /// Add `value` to a monotonic counter.
    fn increment_counter(&self, name: &'static str, value: u64, labels: &[Label]);

    /// Record one sample into a histogram.
    fn record_histogram(&self, name: &'static str, value: f64, labels: &[Label]);

    /// Move an up/down gauge by `delta`.
    fn adjust_gauge(&self, name: &'static str, delta: f64);

    /// Overwrite a gauge with an absolute value.
    fn set_gauge(&self, name: &'static str, value: f64);
}

/// Sink that forwards to whatever recorder is installed in the `metrics` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct FacadeSink;

impl MetricsSink for FacadeSink {
    fn increment_counter(&self, name: &'static str, value: u64, labels: &[Label]) {
        metrics::counter!(name, labels.to_vec()).increment(value);
    }

    fn record_histogram(&self, name: &'static str, value: f64, labels: &[Label]) {
        metrics::histogram!(name, labels.to_vec()).record(value);
    }

    fn adjust_gauge(&self, name: &'static str, delta: f64) {
        let gauge = metrics::gauge!(name);
        if delta >= 0.0 {
            gauge.increment(delta);
        } else {
            gauge.decrement(-delta);
        }
    }

    fn set_gauge(&self, name: &'static str, value: f64) {
        metrics::gauge!(name).set(value);
    }
}

/// Register descriptions and units for every HTTP instrument.
pub fn describe_metrics() {
    describe_counter!(HTTP_REQUESTS_TOTAL, "Total number of HTTP requests received");
    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of HTTP requests in seconds"
    );
    describe_histogram!(
        HTTP_REQUEST_SIZE_BYTES,
        Unit::Bytes,
        "Size of incoming HTTP requests in bytes"
    );
    describe_histogram!(
        HTTP_RESPONSE_SIZE_BYTES,
        Unit::Bytes,
        "Size of outgoing HTTP responses in bytes"
    );
    describe_gauge!(
        HTTP_IN_FLIGHT_REQUESTS,
        "Number of in-flight HTTP requests being processed"
    );
    describe_gauge!(
        HTTP_REQUEST_CONCURRENCY,
        "Number of concurrent HTTP requests being processed"
    );
    describe_counter!(HTTP_REQUESTS_ERRORS_TOTAL, "Total number of failed HTTP requests");
    describe_histogram!(
        HTTP_REQUEST_NETWORK_LATENCY_SECONDS,
        Unit::Seconds,
        "Time taken before request starts processing (seconds)"
    );
}

/// Builder with the bucket layout of every HTTP histogram applied.
pub fn prometheus_builder() -> Result<PrometheusBuilder, BuildError> {
    let buckets = [
        (HTTP_REQUEST_DURATION_SECONDS, DURATION_BUCKETS),
        (HTTP_REQUEST_SIZE_BYTES, SIZE_BUCKETS),
        (HTTP_RESPONSE_SIZE_BYTES, SIZE_BUCKETS),
        (HTTP_REQUEST_NETWORK_LATENCY_SECONDS, NETWORK_LATENCY_BUCKETS),
    ];

    buckets
        .into_iter()
        .try_fold(PrometheusBuilder::new(), |builder, (name, values)| {
            builder.set_buckets_for_metric(Matcher::Full(name.to_string()), values)
        })
}

/// Install the Prometheus recorder and its scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    prometheus_builder()?.with_http_listener(addr).install()?;
    describe_metrics();

    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}
