//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, layers, graceful shutdown)
//!     → request.rs (request ID)
//!     → middleware/request_metrics.rs (size, latency, in-flight)
//!     → dice handlers
//!     → response body finishes → request metrics completion
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::RequestMetrics;
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
