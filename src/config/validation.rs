//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, ports valid)
//! - Check socket addresses parse when their feature is enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ControlPlaneConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ControlPlaneConfig;
use crate::fragment::ListenerIdentity;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("node_id must not be empty")]
    EmptyNodeId,

    #[error("watch.paths must name at least one directory")]
    NoWatchPaths,

    #[error("watch.poll_interval_secs must be greater than zero")]
    ZeroPollInterval,

    #[error("listeners.{0}.port must be non-zero")]
    ZeroListenerPort(ListenerIdentity),

    #[error("internal and external listeners both bind {0}")]
    ListenerClash(String),

    #[error("{field} is not a socket address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("admin.api_key must be set when the admin API is enabled")]
    MissingAdminKey,

    #[error("unknown log level {0:?}")]
    UnknownLogLevel(String),
}

/// Validate a loaded configuration, collecting every problem.
pub fn validate_config(config: &ControlPlaneConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.node_id.trim().is_empty() {
        errors.push(ValidationError::EmptyNodeId);
    }

    if config.watch.paths.is_empty() {
        errors.push(ValidationError::NoWatchPaths);
    }
    if config.watch.poll_interval_secs == 0 {
        errors.push(ValidationError::ZeroPollInterval);
    }

    for identity in ListenerIdentity::ALL {
        if config.listeners.get(identity).port == 0 {
            errors.push(ValidationError::ZeroListenerPort(identity));
        }
    }
    let (internal, external) = (&config.listeners.internal, &config.listeners.external);
    if internal.address == external.address && internal.port == external.port {
        errors.push(ValidationError::ListenerClash(format!("{}:{}", internal.address, internal.port)));
    }

    let admin = &config.admin;
    if admin.enabled {
        if admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "admin.bind_address",
                value: admin.bind_address.clone(),
            });
        }
        if admin.api_key.trim().is_empty() {
            errors.push(ValidationError::MissingAdminKey);
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
