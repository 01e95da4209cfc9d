//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP middleware / handlers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms via MetricsSink)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;

pub use self::metrics::{FacadeSink, MetricsSink};

/// Errors raised while bringing up logging or the metrics exporter.
#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("failed to install log subscriber: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to install Prometheus exporter: {0}")]
    Exporter(#[from] metrics_exporter_prometheus::BuildError),

    #[error("invalid metrics address '{0}'")]
    Address(String),
}

/// Bring up the metrics exporter described by `config`, if enabled.
pub fn init_exporter(config: &crate::config::ObservabilityConfig) -> Result<(), ObservabilityError> {
    if !config.metrics_enabled {
        tracing::info!("Metrics exporter disabled");
        return Ok(());
    }

    let addr = config
        .metrics_address
        .parse()
        .map_err(|_| ObservabilityError::Address(config.metrics_address.clone()))?;
    self::metrics::init_metrics(addr)?;
    Ok(())
}
