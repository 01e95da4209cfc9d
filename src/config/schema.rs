//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the dice service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, body limits).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Dice rolling settings.
    pub dice: DiceConfig,

    /// Synthetic fault injection for the `/rolldice` endpoint.
    pub faults: FaultConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8084").
    pub bind_address: String,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8084".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// How often `http_request_concurrency` is sampled, in milliseconds.
    pub concurrency_sample_ms: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
            concurrency_sample_ms: 1000,
        }
    }
}

/// Dice rolling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DiceConfig {
    /// Upper bound on `rolls` accepted per request.
    pub max_rolls: u32,

    /// Number of faces on each die.
    pub sides: u32,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            max_rolls: 1000,
            sides: 6,
        }
    }
}

/// Fault injection configuration.
///
/// Rates are probabilities in `[0, 1]`. The server error check runs first;
/// the client error check only runs when it did not fire.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FaultConfig {
    /// Probability of answering 500.
    pub server_error_rate: f64,

    /// Probability of answering 400 or 403.
    pub client_error_rate: f64,
}

impl FaultConfig {
    /// A configuration that never injects faults.
    pub fn disabled() -> Self {
        Self {
            server_error_rate: 0.0,
            client_error_rate: 0.0,
        }
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self {
            server_error_rate: 0.1,
            client_error_rate: 0.2,
        }
    }
}
