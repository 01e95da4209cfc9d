//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with the dice routes
//! - Wire up middleware (request metrics, request ID, tracing, timeout, body limit)
//! - Serve on a listener until shutdown is signalled

use std::time::Duration;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServiceConfig;
use crate::dice::{roll_dice_handler, DiceState};
use crate::http::middleware::{sample_concurrency, track_request_metrics, RequestMetrics};
use crate::http::request::{UuidRequestId, X_REQUEST_ID};

/// HTTP server for the dice service.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    metrics: RequestMetrics,
}

impl HttpServer {
    /// Create a server recording request metrics into the `metrics` facade.
    pub fn new(config: ServiceConfig) -> Self {
        Self::with_metrics(config, RequestMetrics::default())
    }

    /// Create a server recording request metrics through `metrics`.
    pub fn with_metrics(config: ServiceConfig, metrics: RequestMetrics) -> Self {
        let router = Self::build_router(&config, metrics.clone());
        Self {
            router,
            config,
            metrics,
        }
    }

    /// Build the axum router with all middleware layers.
    ///
    /// Request metrics sit outermost so timeouts and body-limit rejections
    /// are counted too.
    #[allow(deprecated)]
    pub fn build_router(config: &ServiceConfig, metrics: RequestMetrics) -> Router {
        let state = DiceState {
            dice: config.dice.clone(),
            faults: config.faults.clone(),
        };

        Router::new()
            .route("/rolldice", get(roll_dice_handler))
            .with_state(state)
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
            .layer(middleware::from_fn_with_state(metrics, track_request_metrics))
    }

    /// Run the server until a shutdown signal arrives on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sampler = tokio::spawn(sample_concurrency(
            self.metrics.clone(),
            Duration::from_millis(self.config.observability.concurrency_sample_ms),
            shutdown.resubscribe(),
        ));

        let served = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await;

        if served.is_err() {
            // No shutdown was broadcast, so the sampler would never stop.
            sampler.abort();
        } else if let Err(e) = sampler.await {
            tracing::warn!(error = %e, "Concurrency sampler task failed");
        }
        served?;

        tracing::info!(
            in_flight = self.metrics.active_requests(),
            "HTTP server stopped"
        );
        Ok(())
    }

    /// Request metrics state shared with the middleware.
    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }
}
