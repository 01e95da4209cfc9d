//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{body::Body, http::Request, Router};
use metrics::Label;
use rolldice::config::{FaultConfig, ServiceConfig};
use rolldice::http::middleware::{track_request_metrics, RequestMetrics};
use rolldice::observability::MetricsSink;
use rolldice::{HttpServer, Shutdown};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub type Labels = Vec<(String, String)>;

/// One call made against a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Counter { name: &'static str, value: u64, labels: Labels },
    Histogram { name: &'static str, value: f64, labels: Labels },
    Gauge { name: &'static str, delta: f64 },
    GaugeSet { name: &'static str, value: f64 },
}

/// Metrics sink that keeps every observation in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    observations: Mutex<Vec<Observation>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().unwrap().clone()
    }

    /// Samples recorded into histogram `name`, in order.
    pub fn histogram(&self, name: &str) -> Vec<(f64, Labels)> {
        self.observations()
            .into_iter()
            .filter_map(|o| match o {
                Observation::Histogram { name: n, value, labels } if n == name => Some((value, labels)),
                _ => None,
            })
            .collect()
    }

    /// Sum of counter `name` over observations carrying every label in `filter`.
    pub fn counter(&self, name: &str, filter: &[(&str, &str)]) -> u64 {
        self.observations()
            .into_iter()
            .filter_map(|o| match o {
                Observation::Counter { name: n, value, labels } if n == name && has_labels(&labels, filter) => {
                    Some(value)
                }
                _ => None,
            })
            .sum()
    }

    /// Current value of gauge `name`, starting from zero.
    pub fn gauge(&self, name: &str) -> f64 {
        self.observations()
            .into_iter()
            .filter_map(|o| match o {
                Observation::Gauge { name: n, delta } if n == name => Some(delta),
                _ => None,
            })
            .sum()
    }

    /// Number of gauge moves on `name` with the given sign.
    pub fn gauge_moves(&self, name: &str, positive: bool) -> usize {
        self.observations()
            .into_iter()
            .filter(|o| matches!(o, Observation::Gauge { name: n, delta } if *n == name && (*delta > 0.0) == positive))
            .count()
    }

    /// Absolute values written to gauge `name`, in order.
    pub fn gauge_sets(&self, name: &str) -> Vec<f64> {
        self.observations()
            .into_iter()
            .filter_map(|o| match o {
                Observation::GaugeSet { name: n, value } if n == name => Some(value),
                _ => None,
            })
            .collect()
    }

    fn push(&self, observation: Observation) {
        self.observations.lock().unwrap().push(observation);
    }
}

impl MetricsSink for RecordingSink {
    fn increment_counter(&self, name: &'static str, value: u64, labels: &[Label]) {
        self.push(Observation::Counter { name, value, labels: owned(labels) });
    }

    fn record_histogram(&self, name: &'static str, value: f64, labels: &[Label]) {
        self.push(Observation::Histogram { name, value, labels: owned(labels) });
    }

    fn adjust_gauge(&self, name: &'static str, delta: f64) {
        self.push(Observation::Gauge { name, delta });
    }

    fn set_gauge(&self, name: &'static str, value: f64) {
        self.push(Observation::GaugeSet { name, value });
    }
}

fn owned(labels: &[Label]) -> Labels {
    labels
        .iter()
        .map(|l| (l.key().to_string(), l.value().to_string()))
        .collect()
}

pub fn has_labels(labels: &Labels, filter: &[(&str, &str)]) -> bool {
    filter
        .iter()
        .all(|(k, v)| labels.iter().any(|(lk, lv)| lk == k && lv == v))
}

pub fn label<'a>(labels: &'a Labels, key: &str) -> Option<&'a str> {
    labels.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Wrap `router` in the request metrics middleware recording into `sink`.
pub fn instrument(router: Router, sink: &Arc<RecordingSink>) -> (Router, RequestMetrics) {
    let metrics = RequestMetrics::new(sink.clone());
    let router = router.layer(axum::middleware::from_fn_with_state(
        metrics.clone(),
        track_request_metrics,
    ));
    (router, metrics)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Poll `check` until it holds or a few seconds pass.
pub async fn eventually<F: Fn() -> bool>(check: F) {
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}

/// Run `future` with a deadline so a hung test fails instead of stalling.
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("timed out")
}

/// A config with fault injection off and the exporter disabled.
pub fn quiet_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.faults = FaultConfig::disabled();
    config.observability.metrics_enabled = false;
    config
}

/// A real server listening on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub metrics: RequestMetrics,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub async fn start(config: ServiceConfig, sink: &Arc<RecordingSink>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = HttpServer::with_metrics(config, RequestMetrics::new(sink.clone()));
        let metrics = server.metrics().clone();
        let shutdown = Shutdown::new();
        let rx = shutdown.subscribe();
        let handle = tokio::spawn(server.run(listener, rx));

        Self { addr, metrics, shutdown, handle }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}
