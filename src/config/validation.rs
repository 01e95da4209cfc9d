//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! All problems are reported at once rather than stopping at the first.

use std::net::SocketAddr;

use crate::config::schema::ServiceConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: {value} is outside [0, 1]")]
    RateOutOfRange { field: &'static str, value: f64 },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Validate a configuration, returning every error found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    check_rate(&mut errors, "faults.server_error_rate", config.faults.server_error_rate);
    check_rate(&mut errors, "faults.client_error_rate", config.faults.client_error_rate);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero { field: "timeouts.request_secs" });
    }
    if config.observability.concurrency_sample_ms == 0 {
        errors.push(ValidationError::Zero { field: "observability.concurrency_sample_ms" });
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::Zero { field: "listener.max_body_bytes" });
    }
    if config.dice.sides == 0 {
        errors.push(ValidationError::Zero { field: "dice.sides" });
    }
    if config.dice.max_rolls == 0 {
        errors.push(ValidationError::Zero { field: "dice.max_rolls" });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_rate(errors: &mut Vec<ValidationError>, field: &'static str, value: f64) {
    // NaN fails the range check too.
    if !(0.0..=1.0).contains(&value) {
        errors.push(ValidationError::RateOutOfRange { field, value });
    }
}
