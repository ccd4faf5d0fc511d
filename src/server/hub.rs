//! Hub state shared by connection tasks
//!
//! The registry admits peers (one owner at most, bounded total), holds their
//! outbound links, and backs the [`Transport`] used to relay the owner's
//! traffic to observers.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::link::PeerLink;
use crate::protocol::{
    CommandEnvelope, PeerId, PeerSet, ProtocolError, Result, Role, Snapshot, WireFrame,
};
use crate::replication::{Mailbox, Transport};

#[derive(Debug)]
struct PeerEntry {
    role: Role,
    name: String,
    link: Option<PeerLink>,
}

/// Connected peers
#[derive(Debug)]
pub(super) struct PeerRegistry {
    max_connections: usize,
    next_id: PeerId,
    owner: Option<PeerId>,
    peers: BTreeMap<PeerId, PeerEntry>,
}

impl PeerRegistry {
    pub(super) fn new(max_connections: usize) -> Self {
        Self {
            max_connections,
            next_id: 1,
            owner: None,
            peers: BTreeMap::new(),
        }
    }

    /// Reserve an id for a peer, or give the reason it is refused
    pub(super) fn admit(&mut self, role: Role, name: &str) -> std::result::Result<PeerId, String> {
        if self.peers.len() >= self.max_connections {
            return Err(format!(
                "server full ({} of {} connections in use)",
                self.peers.len(),
                self.max_connections
            ));
        }
        if role == Role::Owner {
            if let Some(owner) = self.owner {
                return Err(format!("an owner is already connected (peer {})", owner));
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        if role == Role::Owner {
            self.owner = Some(id);
        }
        self.peers.insert(
            id,
            PeerEntry {
                role,
                name: name.to_string(),
                link: None,
            },
        );
        Ok(id)
    }

    /// Attach the outbound link of an admitted peer
    pub(super) fn attach(&mut self, id: PeerId, link: PeerLink) {
        if let Some(entry) = self.peers.get_mut(&id) {
            entry.link = Some(link);
        }
    }

    /// Forget a peer; dropping its link lets the writer finish
    pub(super) fn remove(&mut self, id: PeerId) {
        if let Some(entry) = self.peers.remove(&id) {
            if self.owner == Some(id) {
                self.owner = None;
                info!("Owner '{}' (peer {}) disconnected", entry.name, id);
            }
            if let Some(link) = entry.link {
                let dropped = link.dropped_snapshots();
                if dropped > 0 {
                    info!("Peer {} dropped {} snapshots while behind", id, dropped);
                }
            }
        }
    }

    /// Current owner, if any
    pub(super) fn owner(&self) -> Option<PeerId> {
        self.owner
    }

    /// Connected peer count
    pub(super) fn len(&self) -> usize {
        self.peers.len()
    }

    fn links(&self, peers: PeerSet) -> impl Iterator<Item = &PeerLink> {
        self.peers
            .iter()
            .filter(move |(id, _)| peers.contains(**id))
            .filter_map(|(_, entry)| entry.link.as_ref())
    }

    fn role_of(&self, id: PeerId) -> Option<Role> {
        self.peers.get(&id).map(|entry| entry.role)
    }
}

/// Transport writing to the registry's peer links
#[derive(Debug, Clone)]
pub(super) struct HubTransport {
    registry: Arc<Mutex<PeerRegistry>>,
}

impl Transport for HubTransport {
    fn send_snapshot(&mut self, peers: PeerSet, snapshot: &Snapshot) -> Result<()> {
        let registry = self.registry.lock();
        for link in registry.links(peers) {
            if let Err(e) = link.queue_snapshot(*snapshot) {
                debug!("Snapshot seq={} not queued: {}", snapshot.seq, e);
            }
        }
        Ok(())
    }

    fn send_command(&mut self, peers: PeerSet, command: &CommandEnvelope) -> Result<()> {
        let registry = self.registry.lock();
        for link in registry.links(peers) {
            if let Err(e) = link.queue_command(command.clone()) {
                debug!(
                    "Command seq={} not queued for peer {}: {}",
                    command.seq,
                    link.peer_id(),
                    e
                );
            }
        }
        Ok(())
    }
}

/// Everything a connection task needs
#[derive(Debug, Clone)]
pub(super) struct HubContext {
    pub(super) registry: Arc<Mutex<PeerRegistry>>,
    pub(super) mailbox: Mailbox,
    pub(super) queue_depth: usize,
}

impl HubContext {
    pub(super) fn new(max_connections: usize, queue_depth: usize, mailbox: Mailbox) -> Self {
        Self {
            registry: Arc::new(Mutex::new(PeerRegistry::new(max_connections))),
            mailbox,
            queue_depth,
        }
    }

    /// Transport over the connected peers
    pub(super) fn transport(&self) -> HubTransport {
        HubTransport {
            registry: Arc::clone(&self.registry),
        }
    }

    /// Route one frame received from `from`
    ///
    /// Owner state goes to the local replica and is relayed to every other
    /// peer. Anything else after the handshake is a protocol error.
    pub(super) fn on_frame(
        &self,
        from: PeerId,
        frame: WireFrame,
        relay: &mut impl Transport,
    ) -> Result<()> {
        let role = self
            .registry
            .lock()
            .role_of(from)
            .ok_or(ProtocolError::UnknownPeer(from))?;

        match (role, frame) {
            (Role::Owner, WireFrame::Snapshot(snapshot)) => {
                self.mailbox.deliver_snapshot(snapshot);
                relay.send_snapshot(PeerSet::AllExcept(from), &snapshot)
            }
            (Role::Owner, WireFrame::Command(envelope)) => {
                relay.send_command(PeerSet::AllExcept(from), &envelope)?;
                self.mailbox.deliver_command(envelope);
                Ok(())
            }
            (Role::Replica, WireFrame::Snapshot(_)) => Err(ProtocolError::RoleViolation {
                role,
                action: "publish snapshots",
            }),
            (Role::Replica, WireFrame::Command(_)) => Err(ProtocolError::RoleViolation {
                role,
                action: "issue commands",
            }),
            (_, other) => Err(ProtocolError::UnexpectedFrame(other.kind())),
        }
    }
}
