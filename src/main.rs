//! cursor-timeline - Gyroscopic Shared Cursor
//!
//! Entry point for the hub, controller and observer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cursor_timeline::config::{Config, LogFormat, LoggingConfig};
use cursor_timeline::input::SweepSource;
use cursor_timeline::server::{run_controller, run_observer, ControllerOptions, CursorServer};
use cursor_timeline::utils::{format_user_error, log_startup_diagnostics};

/// Command-line arguments for cursor-timeline
#[derive(Parser, Debug)]
#[command(name = "cursor-timeline")]
#[command(version, about = "Gyroscopic shared cursor", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, env = "CURSOR_TIMELINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Write logs to file (in addition to stdout)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub mode: Mode,
}

/// What to run
#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Run the cursor hub
    Serve {
        /// Listen address
        #[arg(short, long, env = "CURSOR_TIMELINE_LISTEN")]
        listen: Option<String>,

        /// Listen port
        #[arg(short, long, env = "CURSOR_TIMELINE_PORT")]
        port: Option<u16>,
    },

    /// Drive the cursor from a synthetic sweeping attitude
    Control {
        /// Hub address
        #[arg(short, long, env = "CURSOR_TIMELINE_SERVER", default_value = "127.0.0.1:19876")]
        server: String,

        /// Stop after this many snapshots
        #[arg(long)]
        ticks: Option<u64>,

        /// Controller screen width in pixels
        #[arg(long, default_value_t = 1080)]
        width: u32,

        /// Controller screen height in pixels
        #[arg(long, default_value_t = 1920)]
        height: u32,

        /// Sweep amplitude about the vertical axis, degrees
        #[arg(long, default_value_t = 20.0)]
        yaw: f32,

        /// Sweep amplitude about the lateral axis, degrees
        #[arg(long, default_value_t = 10.0)]
        pitch: f32,

        /// Sweep period, seconds
        #[arg(long, default_value_t = 4.0)]
        period: f32,

        /// Name announced to the hub
        #[arg(long, default_value = "controller")]
        name: String,
    },

    /// Follow the hub's cursor as an observer
    Observe {
        /// Hub address
        #[arg(short, long, env = "CURSOR_TIMELINE_SERVER", default_value = "127.0.0.1:19876")]
        server: String,

        /// Name announced to the hub
        #[arg(long, default_value = "observer")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it carries logging defaults
    let (config, load_error) = match args.config.as_deref().map(Config::load) {
        Some(Ok(config)) => (config, None),
        Some(Err(e)) => (Config::default_config(), Some(e)),
        None => (Config::default_config(), None),
    };

    let _log_guard = init_logging(&args, &config.logging)?;

    info!("════════════════════════════════════════════════════════");
    info!("  cursor-timeline v{}", env!("CARGO_PKG_VERSION"));
    info!("  Profile: {}", if cfg!(debug_assertions) { "debug" } else { "release" });
    info!("════════════════════════════════════════════════════════");

    if let Some(e) = load_error {
        warn!("Failed to load config: {:#}, using defaults", e);
    }

    log_startup_diagnostics(&config);

    let result = run(args.mode, config).await;
    if let Err(e) = &result {
        eprintln!("{}", format_user_error(e));
    }
    result
}

async fn run(mode: Mode, config: Config) -> Result<()> {
    match mode {
        Mode::Serve { listen, port } => {
            let config = config.with_overrides(listen, port);
            config.validate()?;
            tracing::debug!("Config: {:?}", config);

            let server = CursorServer::bind(config).await?;
            info!("Starting cursor hub on {}", server.local_addr()?);
            server.run().await?;
            info!("Cursor hub shut down");
        }
        Mode::Control {
            server,
            ticks,
            width,
            height,
            yaw,
            pitch,
            period,
            name,
        } => {
            let options = ControllerOptions {
                server,
                name,
                ticks,
                width,
                height,
                tick_rate_hz: config.network.tick_rate_hz,
                queue_depth: config.network.snapshot_queue_depth,
            };
            let source = SweepSource::new(config.network.tick_rate_hz, yaw, pitch, period);

            tokio::select! {
                sent = run_controller(&options, source) => {
                    sent?;
                }
                _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            }
        }
        Mode::Observe { server, name } => {
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            run_observer(&server, &name, &config, shutdown).await?;
        }
    }
    Ok(())
}

fn init_logging(args: &Args, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let log_level = match args.verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("cursor_timeline={level},warn", level = log_level))
    });

    let format = args.log_format.unwrap_or(logging.format);
    let log_file = args.log_file.clone().or_else(|| logging.log_file.clone());

    let stdout_layer = match format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    // If log file is specified, write to both stdout and file
    let (file_layer, guard) = match &log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
            let layer = match format {
                LogFormat::Json => fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .boxed(),
                _ => fmt::layer().with_writer(writer).with_ansi(false).boxed(),
            };
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    if let Some(path) = &log_file {
        info!("Logging to file: {}", path.display());
    }

    Ok(guard)
}
