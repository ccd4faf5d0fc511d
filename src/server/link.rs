//! Per-peer outbound link
//!
//! Each connection gets two queues drained by one writer task:
//!
//! ```text
//! Transport ──queue_command()──> Commands  (unbounded)  ──┐  biased: commands first
//!           ──queue_snapshot()─> Snapshots (bounded N)  ──┴─> writer task ─> socket
//!                                  DROP newest on full
//! ```
//!
//! Commands are never dropped; a snapshot that finds the queue full is
//! discarded since a newer one follows on the next tick.

use futures::{Sink, SinkExt};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::protocol::{
    CommandEnvelope, PeerId, PeerSet, ProtocolError, Result, Snapshot, WireFrame,
};
use crate::replication::Transport;

/// Sending half of one peer connection
#[derive(Debug, Clone)]
pub(super) struct PeerLink {
    peer_id: PeerId,
    snapshots: mpsc::Sender<Snapshot>,
    commands: mpsc::UnboundedSender<CommandEnvelope>,
    dropped_snapshots: Arc<AtomicU64>,
}

impl PeerLink {
    /// Start the writer task for `sink` and return the link feeding it
    ///
    /// The task ends once every clone of the link is dropped and both
    /// queues are drained, or when the sink fails.
    pub(super) fn spawn<S>(peer_id: PeerId, sink: S, queue_depth: usize) -> (Self, JoinHandle<()>)
    where
        S: Sink<WireFrame, Error = ProtocolError> + Send + Unpin + 'static,
    {
        let (snapshot_tx, mut snapshot_rx) = mpsc::channel::<Snapshot>(queue_depth.max(1));
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<CommandEnvelope>();

        let handle = tokio::spawn(async move {
            let mut sink = sink;
            let mut frames_sent: u64 = 0;

            loop {
                let frame = tokio::select! {
                    biased;
                    Some(command) = command_rx.recv() => WireFrame::Command(command),
                    Some(snapshot) = snapshot_rx.recv() => WireFrame::Snapshot(snapshot),
                    else => break,
                };

                trace!("Writing {} frame to peer {}", frame.kind(), peer_id);
                if let Err(e) = sink.send(frame).await {
                    warn!("Write to peer {} failed: {}", peer_id, e);
                    break;
                }
                frames_sent += 1;
            }

            debug!("Writer for peer {} finished after {} frames", peer_id, frames_sent);
        });

        let link = Self {
            peer_id,
            snapshots: snapshot_tx,
            commands: command_tx,
            dropped_snapshots: Arc::new(AtomicU64::new(0)),
        };
        (link, handle)
    }

    /// Peer this link writes to
    pub(super) fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Queue a snapshot, dropping it if the peer is behind
    pub(super) fn queue_snapshot(&self, snapshot: Snapshot) -> Result<()> {
        match self.snapshots.try_send(snapshot) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(dropped)) => {
                let total = self.dropped_snapshots.fetch_add(1, Ordering::Relaxed) + 1;
                trace!(
                    "Peer {} snapshot queue full, dropped seq={} ({} total)",
                    self.peer_id,
                    dropped.seq,
                    total
                );
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(ProtocolError::PeerClosed(self.peer_id)),
        }
    }

    /// Queue a command; never dropped while the peer is connected
    pub(super) fn queue_command(&self, command: CommandEnvelope) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ProtocolError::PeerClosed(self.peer_id))
    }

    /// Snapshots dropped because the queue was full
    pub(super) fn dropped_snapshots(&self) -> u64 {
        self.dropped_snapshots.load(Ordering::Relaxed)
    }
}

impl Transport for PeerLink {
    fn send_snapshot(&mut self, peers: PeerSet, snapshot: &Snapshot) -> Result<()> {
        if peers.contains(self.peer_id) {
            self.queue_snapshot(*snapshot)?;
        }
        Ok(())
    }

    fn send_command(&mut self, peers: PeerSet, command: &CommandEnvelope) -> Result<()> {
        if peers.contains(self.peer_id) {
            self.queue_command(command.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Command;
    use futures::channel::mpsc as fmpsc;
    use futures::StreamExt;
    use glam::Quat;

    fn sink() -> (
        impl Sink<WireFrame, Error = ProtocolError> + Send + Unpin + 'static,
        fmpsc::UnboundedReceiver<WireFrame>,
    ) {
        let (tx, rx) = fmpsc::unbounded::<WireFrame>();
        let sink = tx.sink_map_err(|_| ProtocolError::PeerClosed(1));
        (sink, rx)
    }

    #[tokio::test]
    async fn test_frames_reach_sink_and_task_ends_on_drop() {
        let (sink, rx) = sink();
        let (link, writer) = PeerLink::spawn(1, sink, 4);

        link.queue_command(CommandEnvelope::new(1, Command::Calibrate))
            .unwrap();
        link.queue_snapshot(Snapshot::new(1, Quat::IDENTITY)).unwrap();
        drop(link);

        writer.await.unwrap();
        let frames: Vec<WireFrame> = rx.collect().await;
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], WireFrame::Command(_)));
    }

    #[tokio::test]
    async fn test_full_snapshot_queue_drops() {
        // Current-thread runtime: the writer cannot run until we yield
        let (sink, _rx) = sink();
        let (link, _writer) = PeerLink::spawn(1, sink, 2);

        for seq in 1..=5 {
            link.queue_snapshot(Snapshot::new(seq, Quat::IDENTITY)).unwrap();
        }
        assert_eq!(link.dropped_snapshots(), 3);
    }

    #[tokio::test]
    async fn test_closed_link_reports_peer() {
        let (sink, rx) = sink();
        drop(rx);
        let (link, writer) = PeerLink::spawn(7, sink, 1);

        link.queue_snapshot(Snapshot::new(1, Quat::IDENTITY)).unwrap();
        writer.await.unwrap();

        let result = link.queue_command(CommandEnvelope::new(1, Command::Focus));
        assert!(matches!(result, Err(ProtocolError::PeerClosed(7))));
    }
}
