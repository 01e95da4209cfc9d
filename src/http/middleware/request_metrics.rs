//! Request metrics middleware.
//!
//! Wraps every request/response pair with size, duration, latency and error
//! observations, and keeps a live count of in-flight requests. The request and
//! the response content pass through untouched.
//!
//! # Lifecycle
//! ```text
//! request arrives
//!     → in-flight +1, request size recorded
//!     → network latency measured on the next scheduler turn (spawned task)
//!     → Next::run (handler)
//!     → response body wrapped in TrackedBody
//! body reaches end of stream / errors / is dropped
//!     → Completion fires once: in-flight -1, response size, count,
//!       duration, errors
//!
//! every sample period (sample_concurrency)
//!     → http_request_concurrency = active-request counter
//! ```

use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{MatchedPath, Request, State},
    http::{header::CONTENT_LENGTH, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use hyper::body::{Body as HttpBody, Frame, SizeHint};
use metrics::Label;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

use crate::observability::metrics::{
    FacadeSink, MetricsSink, HTTP_IN_FLIGHT_REQUESTS, HTTP_REQUESTS_ERRORS_TOTAL,
    HTTP_REQUESTS_TOTAL, HTTP_REQUEST_CONCURRENCY, HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUEST_NETWORK_LATENCY_SECONDS,
    HTTP_REQUEST_SIZE_BYTES, HTTP_RESPONSE_SIZE_BYTES,
};

/// Route label used when no registered route matched the request.
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// Shared state of the request metrics middleware.
///
/// One instance is created at startup and cloned into the router. It owns the
/// active-request counter, which is only readable through
/// [`RequestMetrics::active_requests`].
#[derive(Clone)]
pub struct RequestMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    sink: Arc<dyn MetricsSink>,
    active: AtomicI64,
}

impl RequestMetrics {
    /// Create middleware state recording into `sink`.
    pub fn new(sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                active: AtomicI64::new(0),
            }),
        }
    }

    /// Number of requests whose middleware has run but whose response has
    /// not finished.
    pub fn active_requests(&self) -> i64 {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Publish the current active-request count to `http_request_concurrency`.
    pub fn publish_concurrency(&self) {
        self.sink()
            .set_gauge(HTTP_REQUEST_CONCURRENCY, self.active_requests() as f64);
    }

    fn sink(&self) -> &dyn MetricsSink {
        self.inner.sink.as_ref()
    }

    fn request_started(&self) {
        self.inner.active.fetch_add(1, Ordering::AcqRel);
        self.sink().adjust_gauge(HTTP_IN_FLIGHT_REQUESTS, 1.0);
    }

    fn request_finished(&self) {
        self.inner.active.fetch_sub(1, Ordering::AcqRel);
        self.sink().adjust_gauge(HTTP_IN_FLIGHT_REQUESTS, -1.0);
    }
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self::new(Arc::new(FacadeSink))
    }
}

impl std::fmt::Debug for RequestMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestMetrics")
            .field("active_requests", &self.active_requests())
            .finish()
    }
}

/// Publish the active-request count every `period` until `shutdown` fires.
///
/// A final sample is taken on the way out so the gauge reflects the drained
/// state.
pub async fn sample_concurrency(
    metrics: RequestMetrics,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => metrics.publish_concurrency(),
            _ = shutdown.recv() => break,
        }
    }

    metrics.publish_concurrency();
    tracing::debug!("Concurrency sampler stopped");
}

/// Axum middleware recording request metrics.
///
/// Install with `axum::middleware::from_fn_with_state` through
/// `Router::layer` so that [`MatchedPath`] is available for the route label.
pub async fn track_request_metrics(
    State(metrics): State<RequestMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().as_str().to_owned();
    let route = route_label(&request);

    metrics.request_started();

    let request_size = declared_length(request.headers()).unwrap_or(0);
    metrics.sink().record_histogram(
        HTTP_REQUEST_SIZE_BYTES,
        request_size as f64,
        &request_labels(&method, &route),
    );

    // Runs on the next scheduler turn, so the sample is the queueing delay
    // between arrival and the runtime getting back to this request.
    let latency_metrics = metrics.clone();
    let latency_labels = request_labels(&method, &route);
    tokio::spawn(async move {
        latency_metrics.sink().record_histogram(
            HTTP_REQUEST_NETWORK_LATENCY_SECONDS,
            start.elapsed().as_secs_f64(),
            &latency_labels,
        );
    });

    // Armed before the handler runs so the in-flight slot is released even
    // if the handler future is dropped.
    let mut completion = Completion {
        metrics,
        start,
        method,
        route,
        outcome: None,
    };

    let response = next.run(request).await;
    let (parts, body) = response.into_parts();

    let response_size = declared_length(&parts.headers)
        .or_else(|| body.size_hint().exact())
        .unwrap_or(0);
    completion.outcome = Some(Outcome {
        status: parts.status,
        response_size,
    });

    Response::from_parts(
        parts,
        Body::new(TrackedBody {
            inner: body,
            completion: Some(completion),
        }),
    )
}

/// Registered route pattern for the request, never the raw path.
fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned())
}

/// Declared body length from a `content-length` header.
///
/// Returns `None` when the header is absent or has no leading digits.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_length)
}

/// Parse the leading base-10 digits of `value`, ignoring leading whitespace,
/// an optional `+` sign and any trailing garbage.
pub fn parse_length(value: &str) -> Option<u64> {
    let value = value.trim_start();
    let value = value.strip_prefix('+').unwrap_or(value);
    let digits = value
        .find(|c: char| !c.is_ascii_digit())
        .map_or(value, |end| &value[..end]);
    digits.parse().ok()
}

fn request_labels(method: &str, route: &str) -> Vec<Label> {
    vec![
        Label::new("method", method.to_owned()),
        Label::new("route", route.to_owned()),
    ]
}

fn response_labels(method: &str, route: &str, status: StatusCode) -> Vec<Label> {
    let mut labels = request_labels(method, route);
    labels.push(Label::new("status", status.as_u16().to_string()));
    labels
}

struct Outcome {
    status: StatusCode,
    response_size: u64,
}

/// Completion callback for one request. Fires exactly once, on drop.
struct Completion {
    metrics: RequestMetrics,
    start: Instant,
    method: String,
    route: String,
    outcome: Option<Outcome>,
}

impl Drop for Completion {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed().as_secs_f64();
        self.metrics.request_finished();

        let Some(outcome) = self.outcome.take() else {
            tracing::debug!(
                method = %self.method,
                route = %self.route,
                "Request dropped before a response was produced"
            );
            return;
        };

        let sink = self.metrics.sink();
        let labels = response_labels(&self.method, &self.route, outcome.status);

        sink.record_histogram(HTTP_RESPONSE_SIZE_BYTES, outcome.response_size as f64, &labels);
        sink.increment_counter(HTTP_REQUESTS_TOTAL, 1, &labels);
        sink.record_histogram(HTTP_REQUEST_DURATION_SECONDS, elapsed, &labels);
        if outcome.status.as_u16() >= 400 {
            sink.increment_counter(HTTP_REQUESTS_ERRORS_TOTAL, 1, &labels);
        }
    }
}

/// Response body that fires its [`Completion`] once the stream is done.
struct TrackedBody {
    inner: Body,
    completion: Option<Completion>,
}

impl HttpBody for TrackedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        if matches!(polled, Poll::Ready(None) | Poll::Ready(Some(Err(_)))) {
            this.completion.take();
        }
        polled
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
