//! Transport seam
//!
//! The core sends through a [`Transport`] and receives through a
//! [`Mailbox`]; session establishment and discovery live behind it.
//! `server` provides the TCP implementation, [`LoopbackTransport`] an
//! in-memory one.

use tracing::trace;

use super::mailbox::Mailbox;
use crate::protocol::{CommandEnvelope, PeerId, PeerSet, Result, Snapshot};

/// Outbound half of a session
pub trait Transport {
    /// Send a per-tick snapshot (best effort)
    fn send_snapshot(&mut self, peers: PeerSet, snapshot: &Snapshot) -> Result<()>;

    /// Send a command (reliable, ordered per sender)
    fn send_command(&mut self, peers: PeerSet, command: &CommandEnvelope) -> Result<()>;
}

/// In-memory transport delivering straight into peer mailboxes
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    peers: Vec<(PeerId, Mailbox)>,
    duplicate_commands: bool,
    snapshots_sent: u64,
    commands_sent: u64,
}

impl LoopbackTransport {
    /// Create a transport with no peers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a peer and return its mailbox
    pub fn connect(&mut self, peer: PeerId) -> Mailbox {
        let mailbox = Mailbox::new();
        self.peers.push((peer, mailbox.clone()));
        mailbox
    }

    /// Deliver every command twice, as an at-least-once layer may
    pub fn set_duplicate_commands(&mut self, enabled: bool) {
        self.duplicate_commands = enabled;
    }

    /// Snapshots handed to peers
    pub fn snapshots_sent(&self) -> u64 {
        self.snapshots_sent
    }

    /// Commands handed to peers
    pub fn commands_sent(&self) -> u64 {
        self.commands_sent
    }

    fn addressed(&self, peers: PeerSet) -> impl Iterator<Item = &Mailbox> {
        self.peers
            .iter()
            .filter(move |(id, _)| peers.contains(*id))
            .map(|(_, mailbox)| mailbox)
    }
}

impl Transport for LoopbackTransport {
    fn send_snapshot(&mut self, peers: PeerSet, snapshot: &Snapshot) -> Result<()> {
        let mut sent = 0;
        for mailbox in self.addressed(peers) {
            mailbox.deliver_snapshot(*snapshot);
            sent += 1;
        }
        self.snapshots_sent += sent;
        trace!("Loopback snapshot seq={} to {} peers", snapshot.seq, sent);
        Ok(())
    }

    fn send_command(&mut self, peers: PeerSet, command: &CommandEnvelope) -> Result<()> {
        let copies = if self.duplicate_commands { 2 } else { 1 };
        let mut sent = 0;
        for mailbox in self.addressed(peers) {
            for _ in 0..copies {
                mailbox.deliver_command(command.clone());
            }
            sent += 1;
        }
        self.commands_sent += sent;
        trace!("Loopback command seq={} to {} peers", command.seq, sent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Command;
    use glam::Quat;

    #[test]
    fn test_peer_set_addressing() {
        let mut transport = LoopbackTransport::new();
        let a = transport.connect(1);
        let b = transport.connect(2);

        transport
            .send_snapshot(PeerSet::AllExcept(1), &Snapshot::new(1, Quat::IDENTITY))
            .unwrap();

        assert!(a.drain().snapshot.is_none());
        assert!(b.drain().snapshot.is_some());
    }

    #[test]
    fn test_duplicate_commands() {
        let mut transport = LoopbackTransport::new();
        let mailbox = transport.connect(1);
        transport.set_duplicate_commands(true);

        let envelope = CommandEnvelope::new(1, Command::Focus);
        transport.send_command(PeerSet::All, &envelope).unwrap();

        assert_eq!(mailbox.drain().commands.len(), 2);
        assert_eq!(transport.commands_sent(), 1);
    }
}
