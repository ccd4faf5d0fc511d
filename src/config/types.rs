//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Address to listen on (e.g., "0.0.0.0:19876")
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Maximum number of concurrent peers, owner included
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,

    /// Replica tick rate in Hz
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,

    /// Snapshots queued per peer before older ones are dropped
    #[serde(default = "default_snapshot_queue_depth")]
    pub snapshot_queue_depth: usize,
}

fn default_listen_addr() -> String {
    "0.0.0.0:19876".to_string()
}
fn default_max_connections() -> usize {
    4
}
fn default_tick_rate_hz() -> u32 {
    60
}
fn default_snapshot_queue_depth() -> usize {
    4
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
            tick_rate_hz: default_tick_rate_hz(),
            snapshot_queue_depth: default_snapshot_queue_depth(),
        }
    }
}

impl NetworkConfig {
    /// Tick period derived from the rate
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable
    #[default]
    Pretty,
    /// Single-line human readable
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown log format: {} (expected pretty|compact|json)", s)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,

    /// Also write logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            log_file: None,
        }
    }
}
