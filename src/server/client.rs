//! Client roles: controller (owner) and observer (replica)

use anyhow::{Context, Result};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use super::connection::{connect, split_wire};
use super::link::PeerLink;
use super::{ticker, CursorUpdate};
use crate::config::Config;
use crate::input::{validate_sample, InputError, OrientationSource, PointerNormalizer};
use crate::protocol::{PeerSet, Role, WireFrame};
use crate::replication::{CursorEntity, Mailbox, OwnerCursor, ReplicationStats};

/// Peer id the client uses for its single link to the hub
const HUB_PEER_ID: u32 = 0;

/// Controller options
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Hub address, `host:port`
    pub server: String,
    /// Name announced in the hello
    pub name: String,
    /// Stop after this many snapshots
    pub ticks: Option<u64>,
    /// Controller screen width in pixels
    pub width: u32,
    /// Controller screen height in pixels
    pub height: u32,
    /// Snapshot rate
    pub tick_rate_hz: u32,
    /// Outbound snapshot queue depth
    pub queue_depth: usize,
}

impl ControllerOptions {
    fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

/// Run an owner fed by `source`; returns the number of snapshots sent
///
/// Opens the session with the screen size and a calibration request, then
/// sends one snapshot per tick until `ticks` is reached, the source runs
/// dry, or the hub goes away.
pub async fn run_controller<S: OrientationSource>(
    options: &ControllerOptions,
    mut source: S,
) -> Result<u64> {
    let normalizer = PointerNormalizer::new(options.width, options.height)
        .context("Invalid controller screen size")?;

    let (_peer_id, framed) = connect(&options.server, Role::Owner, &options.name).await?;
    let (mut frames, sink) = split_wire(framed);
    let (mut link, writer) = PeerLink::spawn(HUB_PEER_ID, sink, options.queue_depth);

    let mut owner = OwnerCursor::new(normalizer);
    let opening = owner.session_start();
    let mut entity = CursorEntity::Owner(owner);
    for envelope in &opening {
        entity.send_command(&mut link, PeerSet::All, envelope)?;
    }

    let mut interval = tokio::time::interval(options.period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sent: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let orientation = match source.sample().and_then(validate_sample) {
                    Ok(q) => q,
                    Err(InputError::SourceExhausted) => {
                        info!("Orientation source exhausted");
                        break;
                    }
                    Err(e) => {
                        warn!("Skipping sample: {}", e);
                        continue;
                    }
                };

                let snapshot = entity.publish_tick(&mut link, PeerSet::All, orientation)?;
                trace!("Sent snapshot seq={}", snapshot.seq);
                sent += 1;

                if options.ticks.is_some_and(|limit| sent >= limit) {
                    break;
                }
            }
            frame = frames.next() => match frame {
                Some(Ok(frame)) => debug!("Ignoring {} frame from hub", frame.kind()),
                Some(Err(e)) => return Err(e).context("Connection to hub failed"),
                None => anyhow::bail!("Hub closed the connection"),
            },
        }
    }

    // Closing the link lets the writer flush what is queued
    drop(link);
    writer.await.context("Writer task failed")?;

    info!("Controller finished after {} snapshots", sent);
    Ok(sent)
}

/// Run a replica observer until `shutdown` resolves or the hub goes away
pub async fn run_observer<F>(
    server: &str,
    name: &str,
    config: &Config,
    shutdown: F,
) -> Result<ReplicationStats>
where
    F: Future<Output = ()>,
{
    let (_peer_id, framed) = connect(server, Role::Replica, name).await?;
    let (mut frames, _writer) = split_wire(framed);

    let mailbox = Mailbox::new();
    let pipeline = config.pipeline();
    let (updates, _) = watch::channel(CursorUpdate::initial(&pipeline));
    let (stop_tx, stop_rx) = watch::channel(false);
    let ticker = tokio::spawn(ticker::run_replica_ticks(
        CursorEntity::replica(&pipeline),
        mailbox.clone(),
        config.network.tick_interval(),
        updates,
        stop_rx,
    ));

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Observer shutting down");
                break;
            }
            frame = frames.next() => match frame {
                Some(Ok(WireFrame::Snapshot(snapshot))) => mailbox.deliver_snapshot(snapshot),
                Some(Ok(WireFrame::Command(envelope))) => mailbox.deliver_command(envelope),
                Some(Ok(other)) => debug!("Ignoring {} frame from hub", other.kind()),
                Some(Err(e)) => {
                    warn!("Connection to hub failed: {}", e);
                    break;
                }
                None => {
                    info!("Hub closed the connection");
                    break;
                }
            },
        }
    }

    let skipped = frames.codec().skipped_frames();
    if skipped > 0 {
        warn!("Skipped {} undecodable frames from hub", skipped);
    }

    let _ = stop_tx.send(true);
    let stats = ticker.await.context("Replica tick task failed")?;
    stats.log_summary();
    Ok(stats)
}
