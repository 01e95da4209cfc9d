//! rolldice
//!
//! A dice rolling HTTP service built with Tokio and axum, instrumented with
//! per-request metrics exported in Prometheus format.
//!
//! ```text
//!     Client ──▶ request metrics ──▶ request id ──▶ trace ──▶ timeout ──▶ /rolldice
//!                     │
//!                     ▼
//!              metrics facade ──▶ Prometheus exporter (scrape endpoint)
//! ```

use std::path::PathBuf;

use clap::Parser;

use rolldice::config::load_config;
use rolldice::lifecycle;
use rolldice::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "rolldice")]
#[command(about = "Dice rolling HTTP service with request metrics", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        metrics_enabled = config.observability.metrics_enabled,
        metrics_address = %config.observability.metrics_address,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    lifecycle::start(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
