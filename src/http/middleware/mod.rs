//! Tower/axum middleware installed on every route.

pub mod request_metrics;

pub use request_metrics::{
    sample_concurrency, track_request_metrics, RequestMetrics, UNMATCHED_ROUTE,
};
