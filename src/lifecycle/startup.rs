//! Startup orchestration.
//!
//! Fail fast: any startup error is fatal. The listener binds last so traffic
//! only arrives once metrics are ready to record it.

use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::http::HttpServer;
use crate::lifecycle::signals::shutdown_on_signal;
use crate::lifecycle::Shutdown;
use crate::observability::{init_exporter, ObservabilityError};

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Observability(#[from] ObservabilityError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Bring up the exporter, bind the listener and serve until a signal arrives.
pub async fn start(config: ServiceConfig) -> Result<(), StartupError> {
    init_exporter(&config.observability)?;

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;
    tracing::info!(
        address = %listener.local_addr()?,
        "Listening for requests"
    );

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    HttpServer::new(config).run(listener, shutdown.subscribe()).await?;
    Ok(())
}
