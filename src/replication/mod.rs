//! Cursor replication
//!
//! One [`CursorEntity`] per participant. The owner publishes snapshots and
//! commands; replicas consume them and compute the cursor locally.
//!
//! # Data Flow
//!
//! ```text
//! Owner                                   Replica
//! ─────                                   ───────
//! sensor ─> tick() ─> Snapshot ──┐
//! touch  ─> on_touch() ─> Command ┤
//!                                 │ Transport
//!                                 └──────────> Mailbox ─> drain() ─> tick() ─> cursor
//! ```
//!
//! Snapshots are best effort and coalesced (newest wins). Commands are
//! ordered per owner and deduplicated by sequence number on the replica.

mod mailbox;
mod owner;
mod replica;
mod transport;

pub use mailbox::{Inbox, Mailbox, MailboxStats};
pub use owner::OwnerCursor;
pub use replica::{CommandOutcome, PipelineConfig, ReplicaCursor, ReplicaOutput};
pub use transport::{LoopbackTransport, Transport};

use glam::Quat;
use serde::Serialize;
use tracing::{debug, info};

use crate::input::PointerNormalizer;
use crate::protocol::{CommandEnvelope, PeerSet, ProtocolError, Result, Role, Snapshot};

/// Replica-side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplicationStats {
    /// Snapshots fed through the pipeline
    pub snapshots_applied: u64,
    /// Snapshots older than the last one applied
    pub stale_snapshots: u64,
    /// Snapshots whose ray missed the plane
    pub projection_misses: u64,
    /// Commands applied
    pub commands_applied: u64,
    /// Replayed commands dropped
    pub duplicate_commands: u64,
    /// Commands whose payload did not parse
    pub malformed_payloads: u64,
    /// Commands rejected because the sender was not the owner
    pub role_violations: u64,
}

impl ReplicationStats {
    /// Log a one-line summary
    pub fn log_summary(&self) {
        info!(
            "Replication: {} snapshots ({} stale, {} misses), {} commands ({} duplicate, {} malformed, {} rejected)",
            self.snapshots_applied,
            self.stale_snapshots,
            self.projection_misses,
            self.commands_applied,
            self.duplicate_commands,
            self.malformed_payloads,
            self.role_violations
        );
    }
}

/// A participant's cursor, in whichever role it holds
#[derive(Debug, Clone)]
pub enum CursorEntity {
    /// Holds the sensors and sends
    Owner(OwnerCursor),
    /// Receives and computes the cursor
    Replica(ReplicaCursor),
}

impl CursorEntity {
    /// Create an owner entity
    pub fn owner(normalizer: PointerNormalizer) -> Self {
        Self::Owner(OwnerCursor::new(normalizer))
    }

    /// Create a replica entity
    pub fn replica(config: &PipelineConfig) -> Self {
        Self::Replica(ReplicaCursor::new(config))
    }

    /// Role of this entity
    pub fn role(&self) -> Role {
        match self {
            Self::Owner(_) => Role::Owner,
            Self::Replica(_) => Role::Replica,
        }
    }

    /// Build this tick's snapshot and send it to `peers`
    ///
    /// The only path by which snapshots leave an entity. Replicas never
    /// publish.
    pub fn publish_tick<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        peers: PeerSet,
        orientation: Quat,
    ) -> Result<Snapshot> {
        let Self::Owner(owner) = self else {
            return Err(ProtocolError::RoleViolation {
                role: self.role(),
                action: "publish snapshots",
            });
        };

        let snapshot = owner.tick(orientation);
        transport.send_snapshot(peers, &snapshot)?;
        Ok(snapshot)
    }

    /// Send a command built by the owner
    pub fn send_command<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        peers: PeerSet,
        envelope: &CommandEnvelope,
    ) -> Result<()> {
        if self.role() != Role::Owner {
            return Err(ProtocolError::RoleViolation {
                role: self.role(),
                action: "issue commands",
            });
        }
        debug!("Sending command seq={} {}", envelope.seq, envelope.command);
        transport.send_command(peers, envelope)
    }

    /// Apply one tick's worth of received state
    pub fn apply_inbox(&mut self, inbox: Inbox) -> Result<ReplicaOutput> {
        match self {
            Self::Replica(replica) => Ok(replica.tick(inbox)),
            Self::Owner(_) => Err(ProtocolError::RoleViolation {
                role: Role::Owner,
                action: "apply received state",
            }),
        }
    }

    /// Owner half, if this is an owner
    pub fn as_owner_mut(&mut self) -> Option<&mut OwnerCursor> {
        match self {
            Self::Owner(owner) => Some(owner),
            Self::Replica(_) => None,
        }
    }

    /// Replica half, if this is a replica
    pub fn as_replica(&self) -> Option<&ReplicaCursor> {
        match self {
            Self::Replica(replica) => Some(replica),
            Self::Owner(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> PointerNormalizer {
        PointerNormalizer::new(800, 600).unwrap()
    }

    #[test]
    fn test_replica_cannot_publish() {
        let mut entity = CursorEntity::replica(&PipelineConfig::default());
        let mut transport = LoopbackTransport::new();
        let peer = transport.connect(2);

        let result = entity.publish_tick(&mut transport, PeerSet::All, Quat::IDENTITY);
        assert!(matches!(
            result,
            Err(ProtocolError::RoleViolation { role: Role::Replica, .. })
        ));
        assert!(peer.drain().is_empty());
    }

    #[test]
    fn test_owner_cannot_apply_inbox() {
        let mut entity = CursorEntity::owner(normalizer());
        assert!(entity.apply_inbox(Inbox::default()).is_err());
    }

    #[test]
    fn test_owner_to_replica_over_loopback() {
        let mut owner = CursorEntity::owner(normalizer());
        let mut replica = CursorEntity::replica(&PipelineConfig::default());
        let mut transport = LoopbackTransport::new();
        let mailbox = transport.connect(2);

        let commands = owner.as_owner_mut().unwrap().session_start();
        for envelope in &commands {
            owner.send_command(&mut transport, PeerSet::All, envelope).unwrap();
        }
        owner
            .publish_tick(&mut transport, PeerSet::All, Quat::from_rotation_y(0.2))
            .unwrap();

        let out = replica.apply_inbox(mailbox.drain()).unwrap();
        assert!(out.cursor.unwrap().abs_diff_eq(glam::Vec2::ZERO, 1e-4));
        // 800x600 is landscape
        assert_eq!(out.action_area, Some(glam::Vec2::new(800.0 / 600.0, 1.0)));

        let stats = replica.as_replica().unwrap().stats();
        assert_eq!(stats.commands_applied, 2);
        assert_eq!(stats.snapshots_applied, 1);
    }
}
