//! Configuration data structures for the ingress edge.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files.
//! Every field has a default so that a minimal (even empty) config file is
//! valid.
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_listen_addr() -> String {
    "0.0.0.0:6000".to_string()
}

fn default_notify_path() -> String {
    "/api/v3/notify".to_string()
}

/// Root configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngressConfig {
    /// Address the HTTP listener binds to
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Path that accepts envelopes (any method)
    #[serde(default = "default_notify_path")]
    pub notify_path: String,
    #[serde(default)]
    pub admission: AdmissionConfig,
    #[serde(default)]
    pub payload: PayloadConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            notify_path: default_notify_path(),
            admission: AdmissionConfig::default(),
            payload: PayloadConfig::default(),
            dispatch: DispatchConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

/// Load-shedding settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum number of concurrently admitted requests; 0 disables shedding
    pub max_outstanding: i64,
}

/// Request body settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PayloadConfig {
    /// Largest body accepted, in bytes
    pub max_body_bytes: usize,
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
        }
    }
}

/// Downstream handoff settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DispatchConfig {
    /// Capacity of the queue between ingress and delivery
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1024,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve the scrape endpoint
    pub enabled: bool,
    /// Path of the scrape endpoint
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long to wait for the dispatch queue to drain (humantime, e.g. "30s")
    pub drain_timeout: String,
}

impl ShutdownConfig {
    pub fn drain_timeout(&self) -> Result<Duration, humantime::DurationError> {
        humantime::parse_duration(&self.drain_timeout)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout: "30s".to_string(),
        }
    }
}
