//! System Diagnostics
//!
//! Startup information for debugging: host system and effective
//! configuration.

use sysinfo::System;
use tracing::info;

use crate::config::Config;

/// Host facts relevant to holding a fixed tick rate
#[derive(Debug, Clone)]
pub struct SystemInfo {
    /// OS name and version, e.g. "Ubuntu 24.04"
    pub os: String,
    /// Logical CPU cores available to the tick and network tasks
    pub cpu_count: usize,
    /// Memory not in use, in megabytes
    pub available_memory_mb: u64,
}

impl SystemInfo {
    /// Gather host information
    pub fn gather() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();

        let os = match (System::name(), System::os_version()) {
            (Some(name), Some(version)) => format!("{} {}", name, version),
            (Some(name), None) => name,
            _ => "Unknown".to_string(),
        };

        Self {
            os,
            cpu_count: sys.cpus().len(),
            available_memory_mb: sys.available_memory() / 1024 / 1024,
        }
    }

    /// Log host information
    pub fn log(&self) {
        info!(
            "  Host: {}, {} CPUs, {} MB free",
            self.os, self.cpu_count, self.available_memory_mb
        );
    }
}

/// Log complete diagnostics on startup
pub fn log_startup_diagnostics(config: &Config) {
    info!("╔════════════════════════════════════════════════════════════╗");
    info!("║          Startup Diagnostics                              ║");
    info!("╚════════════════════════════════════════════════════════════╝");

    SystemInfo::gather().log();

    info!("=== Configuration ===");
    info!("  Version: {}", env!("CARGO_PKG_VERSION"));
    #[cfg(debug_assertions)]
    info!("  Build: debug");
    #[cfg(not(debug_assertions))]
    info!("  Build: release");
    info!("  Listen: {}", config.network.listen_addr);
    info!(
        "  Peers: {} max, snapshot queue {}",
        config.network.max_connections, config.network.snapshot_queue_depth
    );
    info!(
        "  Tick rate: {} Hz ({:.2} ms budget)",
        config.network.tick_rate_hz,
        config.network.tick_interval().as_secs_f64() * 1000.0
    );
    info!("  Projection: {}", config.projection.mode);
    info!("  Smoothing window: {} samples", config.smoothing.window);
    info!(
        "  Action area: initial {:?}, min {}",
        config.action_area.initial_scale, config.action_area.min_scale
    );

    info!("╚════════════════════════════════════════════════════════════╝");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_info_gather() {
        let info = SystemInfo::gather();
        assert!(!info.os.is_empty());
        assert!(info.cpu_count > 0);
    }

    #[test]
    fn test_diagnostics_do_not_panic() {
        log_startup_diagnostics(&Config::default_config());
    }
}
