//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - Environment variables (through the CLI)
//! - CLI arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

pub mod types;

pub use types::{LogFormat, LoggingConfig, NetworkConfig};

use crate::cursor::{ActionAreaConfig, SmoothingConfig, MIN_SCALE};
use crate::orientation::ProjectionConfig;
use crate::replication::PipelineConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,
    /// Orientation projection
    #[serde(default)]
    pub projection: ProjectionConfig,
    /// Smoothing windows
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    /// Focus-mode action area
    #[serde(default)]
    pub action_area: ActionAreaConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.network
            .listen_addr
            .parse::<SocketAddr>()
            .context("Invalid listen address")?;

        if self.network.max_connections < 2 {
            anyhow::bail!(
                "max_connections must allow an owner and a replica, got {}",
                self.network.max_connections
            );
        }
        if self.network.tick_rate_hz == 0 {
            anyhow::bail!("tick_rate_hz must be greater than zero");
        }
        if self.network.snapshot_queue_depth == 0 {
            anyhow::bail!("snapshot_queue_depth must be greater than zero");
        }

        if self.smoothing.window == 0 {
            anyhow::bail!("Smoothing window must hold at least one sample");
        }

        self.projection
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid projection: {}", e))?;

        let [sx, sy] = self.action_area.initial_scale;
        if !(sx.is_finite() && sy.is_finite()) {
            anyhow::bail!("action_area.initial_scale must be finite");
        }
        let min_scale = self.action_area.min_scale;
        if min_scale.is_nan() || min_scale < MIN_SCALE {
            anyhow::bail!(
                "action_area.min_scale must be at least {}, got {}",
                MIN_SCALE,
                min_scale
            );
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(mut self, listen: Option<String>, port: Option<u16>) -> Self {
        match (listen, port) {
            (Some(host), Some(port)) => {
                self.network.listen_addr = format!("{}:{}", host, port);
            }
            (Some(host), None) => {
                let port = self
                    .network
                    .listen_addr
                    .parse::<SocketAddr>()
                    .map(|a| a.port())
                    .unwrap_or(19876);
                self.network.listen_addr = format!("{}:{}", host, port);
            }
            (None, Some(port)) => {
                if let Ok(mut addr) = self.network.listen_addr.parse::<SocketAddr>() {
                    addr.set_port(port);
                    self.network.listen_addr = addr.to_string();
                }
            }
            (None, None) => {}
        }

        self
    }

    /// Replica pipeline settings
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            projection: self.projection.clone(),
            smoothing: self.smoothing.clone(),
            action_area: self.action_area.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::ProjectionMode;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.network.listen_addr, "0.0.0.0:19876");
        assert_eq!(config.network.max_connections, 4);
        assert_eq!(config.network.tick_rate_hz, 60);
        assert_eq!(config.smoothing.window, 8);
        assert_eq!(config.projection.mode, ProjectionMode::Single);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_address() {
        let mut config = Config::default_config();
        config.network.listen_addr = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_window() {
        let mut config = Config::default_config();
        config.smoothing.window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_tick_rate() {
        let mut config = Config::default_config();
        config.network.tick_rate_hz = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_normal() {
        let mut config = Config::default_config();
        config.projection.plane.normal = [0.0, 0.0, 0.0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_min_scale() {
        let mut config = Config::default_config();
        config.action_area.min_scale = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let config = Config::default_config().with_overrides(None, Some(20000));
        assert_eq!(config.network.listen_addr, "0.0.0.0:20000");

        let config = Config::default_config().with_overrides(Some("127.0.0.1".into()), None);
        assert_eq!(config.network.listen_addr, "127.0.0.1:19876");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[network]
tick_rate_hz = 30

[projection]
mode = "dual"
x_sign = -1.0

[projection.horizontal]
normal = [0.0, 1.0, 0.0]
ray_axis = [0.0, 1.0, 0.0]
ray_offset = 16.0
ray_direction = [0.0, -1.0, 0.0]

[smoothing]
window = 4

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.network.tick_rate_hz, 30);
        assert_eq!(config.network.max_connections, 4);
        assert_eq!(config.projection.mode, ProjectionMode::Dual);
        assert_eq!(config.projection.x_sign, -1.0);
        assert_eq!(config.projection.horizontal.ray_offset, 16.0);
        assert_eq!(config.smoothing.window, 4);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.pipeline().smoothing.window, 4);
    }

    #[test]
    fn test_load_rejects_unknown_mode() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[projection]\nmode = \"triple\"").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Config::load("/nonexistent/cursor-timeline.toml").is_err());
    }
}
