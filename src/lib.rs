//! Dice roller HTTP service with request metrics.

pub mod config;
pub mod dice;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use http::{HttpServer, RequestMetrics};
pub use lifecycle::Shutdown;
