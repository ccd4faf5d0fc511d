//! Server Implementation Module
//!
//! TCP hub hosting the replica cursor, plus the controller and observer
//! clients that connect to it.
//!
//! # Architecture
//!
//! ```text
//! CursorServer
//!   ├─> Accept loop (handshake, admission: one owner, max_connections total)
//!   ├─> Per-peer reader  (owner frames → Mailbox + relay to observers)
//!   ├─> Per-peer writer  (PeerLink: commands first, bounded snapshot queue)
//!   └─> Replica ticker   (Mailbox → ReplicaCursor → watch::Sender<CursorUpdate>)
//! ```
//!
//! # Data Flow
//!
//! **Owner path:** sensor → OwnerCursor → PeerLink → TCP → hub reader
//!
//! **Replica path:** hub reader → Mailbox → tick → cursor update
//!
//! **Relay path:** hub reader → HubTransport (`PeerSet::AllExcept(owner)`) → observers
//!
//! # Example
//!
//! ```no_run
//! use cursor_timeline::config::Config;
//! use cursor_timeline::server::CursorServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml")?;
//!     let server = CursorServer::bind(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod connection;
mod hub;
mod link;
mod ticker;

pub use client::{run_controller, run_observer, ControllerOptions};
pub use connection::HANDSHAKE_TIMEOUT;

use anyhow::{Context, Result};
use glam::Vec2;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::cursor::{ActionArea, CursorState};
use crate::replication::{CursorEntity, Mailbox, PipelineConfig, ReplicationStats};
use hub::HubContext;

/// Cursor published by a replica
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CursorUpdate {
    /// Replica tick that produced it
    pub tick: u64,
    /// Cursor position, once any has been computed
    pub position: Option<Vec2>,
    /// Normal or Focus
    pub state: CursorState,
    /// Current action area scale
    pub action_area: Vec2,
}

impl CursorUpdate {
    /// Update before the first tick
    pub fn initial(pipeline: &PipelineConfig) -> Self {
        Self {
            tick: 0,
            position: None,
            state: CursorState::Normal,
            action_area: ActionArea::new(&pipeline.action_area).scale(),
        }
    }

    /// True if anything but the tick number changed
    pub fn differs_from(&self, other: &Self) -> bool {
        self.position != other.position
            || self.state != other.state
            || self.action_area != other.action_area
    }
}

/// Cursor hub
///
/// Accepts one owner and any observers up to `max_connections`, runs the
/// replica pipeline on the owner's stream and relays it to observers.
pub struct CursorServer {
    config: Arc<Config>,
    listener: TcpListener,
    updates: watch::Sender<CursorUpdate>,
}

impl CursorServer {
    /// Bind the listen address
    pub async fn bind(config: Config) -> Result<Self> {
        let listener = TcpListener::bind(&config.network.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", config.network.listen_addr))?;

        let (updates, _) = watch::channel(CursorUpdate::initial(&config.pipeline()));
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config: Arc::new(config),
            listener,
            updates,
        })
    }

    /// Bound address (useful when binding port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Receive cursor updates
    pub fn subscribe(&self) -> watch::Receiver<CursorUpdate> {
        self.updates.subscribe()
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;
        Ok(())
    }

    /// Serve until `shutdown` resolves; returns the replica's counters
    pub async fn run_until<F>(self, shutdown: F) -> Result<ReplicationStats>
    where
        F: Future<Output = ()>,
    {
        let network = &self.config.network;
        let mailbox = Mailbox::new();
        let hub = HubContext::new(
            network.max_connections,
            network.snapshot_queue_depth,
            mailbox.clone(),
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let ticker = tokio::spawn(ticker::run_replica_ticks(
            CursorEntity::replica(&self.config.pipeline()),
            mailbox,
            network.tick_interval(),
            self.updates.clone(),
            stop_rx,
        ));

        info!(
            "Cursor hub ready: {} connections max, {} Hz",
            network.max_connections, network.tick_rate_hz
        );

        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("Connection from {}", addr);
                        connections.spawn(connection::serve_peer(stream, addr, hub.clone()));
                    }
                    Err(e) => warn!("Accept failed: {}", e),
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        warn!("Connection task failed: {}", e);
                    }
                }
            }
        }

        let _ = stop_tx.send(true);
        connections.shutdown().await;

        let stats = ticker.await.context("Replica tick task failed")?;
        stats.log_summary();
        Ok(stats)
    }
}
