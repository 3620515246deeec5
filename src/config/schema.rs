//! Configuration schema definitions.
//!
//! This module defines the service configuration of the control plane.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::fragment::ListenerIdentity;
use crate::merge::DuplicatePolicy;

/// Root configuration for the control plane.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// Node identifier stamped on every snapshot.
    pub node_id: String,

    /// Fragment directories to watch.
    pub watch: WatchConfig,

    /// Socket defaults for the internal and external listeners.
    pub listeners: ListenersConfig,

    /// Merge behaviour.
    pub merge: MergeConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ControlPlaneConfig {
    fn default() -> Self {
        Self {
            node_id: "proxy-node".to_string(),
            watch: WatchConfig::default(),
            listeners: ListenersConfig::default(),
            merge: MergeConfig::default(),
            admin: AdminConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Fragment directory watching.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Directories (or single documents) holding fragments.
    pub paths: Vec<PathBuf>,

    /// Poll interval for backends without native notifications, in seconds.
    pub poll_interval_secs: u64,

    /// Skip dot-files such as editor swap files.
    pub ignore_hidden: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            paths: vec![PathBuf::from("/etc/proxy/conf.d")],
            poll_interval_secs: 2,
            ignore_hidden: true,
        }
    }
}

/// Socket settings applied to listener blocks that do not declare their own.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenersConfig {
    pub internal: ListenerConfig,
    pub external: ListenerConfig,
}

impl ListenersConfig {
    pub fn get(&self, identity: ListenerIdentity) -> &ListenerConfig {
        match identity {
            ListenerIdentity::Internal => &self.internal,
            ListenerIdentity::External => &self.external,
        }
    }
}

impl Default for ListenersConfig {
    fn default() -> Self {
        Self {
            internal: ListenerConfig {
                address: "127.0.0.1".to_string(),
                ..ListenerConfig::default()
            },
            external: ListenerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Listen address.
    pub address: String,

    /// Listen port.
    pub port: u16,

    /// Fully qualified domain name of the listener.
    pub common_name: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 443,
            common_name: "localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Resolution of conflicting cluster/route declarations.
    pub duplicates: DuplicatePolicy,
}

/// Read-only admin API over the served snapshot.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,

    /// Bearer token required on every admin request. Must be set when
    /// `enabled` is true.
    pub api_key: String,

    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
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

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
