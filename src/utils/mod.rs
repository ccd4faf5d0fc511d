//! Utility Functions and Diagnostics
//!
//! System diagnostics and user-friendly error formatting.
//!
//! ## Diagnostics
//!
//! ```rust,no_run
//! use cursor_timeline::config::Config;
//! use cursor_timeline::utils::{log_startup_diagnostics, SystemInfo};
//!
//! SystemInfo::gather().log();
//! log_startup_diagnostics(&Config::default_config());
//! ```
//!
//! ## Error Formatting
//!
//! ```rust,no_run
//! use cursor_timeline::utils::format_user_error;
//!
//! let e = anyhow::anyhow!("Failed to connect to 127.0.0.1:19876");
//! eprintln!("{}", format_user_error(&e));
//! ```
//!
//! Error categories with context-aware help:
//! - Hub rejections → second controller, full hub
//! - Connect failures → hub not running, wrong address
//! - Bind failures → port conflicts, permissions
//! - Config errors → syntax, out-of-range values

pub mod diagnostics;
pub mod errors;

pub use diagnostics::{log_startup_diagnostics, SystemInfo};
pub use errors::format_user_error;
