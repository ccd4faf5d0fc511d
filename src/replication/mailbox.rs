//! Receive mailbox
//!
//! Handoff between network receipt (edge-triggered, any thread) and the
//! replica tick loop. Snapshots and commands are kept apart:
//!
//! ```text
//! network reader ──deliver_snapshot──> [latest slot]   coalesce, newest (session, seq) wins
//!                ──deliver_command───> [FIFO queue]    order preserved
//!                                           │
//! tick loop <─────────── drain() ───────────┘
//! ```
//!
//! Draining takes at most one snapshot (the newest) and every pending
//! command, so a slow tick never applies a backlog of stale poses.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::protocol::{CommandEnvelope, Snapshot};

/// Everything received since the previous tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inbox {
    /// Newest snapshot, if any arrived
    pub snapshot: Option<Snapshot>,
    /// Commands in arrival order
    pub commands: Vec<CommandEnvelope>,
}

impl Inbox {
    /// True if nothing arrived
    pub fn is_empty(&self) -> bool {
        self.snapshot.is_none() && self.commands.is_empty()
    }
}

/// Mailbox counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MailboxStats {
    /// Snapshots delivered
    pub snapshots_received: u64,
    /// Snapshots replaced by a newer one before being drained
    pub snapshots_coalesced: u64,
    /// Snapshots older than the pending one, discarded on arrival
    pub snapshots_out_of_order: u64,
    /// Commands delivered
    pub commands_received: u64,
}

#[derive(Debug, Default)]
struct MailboxInner {
    latest: Option<Snapshot>,
    commands: VecDeque<CommandEnvelope>,
    stats: MailboxStats,
}

/// Shared mailbox handle; clones refer to the same mailbox
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    inner: Arc<Mutex<MailboxInner>>,
}

impl Mailbox {
    /// Create an empty mailbox
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a snapshot; it replaces the pending one only if newer
    pub fn deliver_snapshot(&self, snapshot: Snapshot) {
        let mut inner = self.inner.lock();
        inner.stats.snapshots_received += 1;

        match inner.latest {
            Some(pending) if pending.order_key() >= snapshot.order_key() => {
                inner.stats.snapshots_out_of_order += 1;
                debug!(
                    "Discarding out-of-order snapshot session={} seq={} (pending {}/{})",
                    snapshot.session, snapshot.seq, pending.session, pending.seq
                );
            }
            Some(_) => {
                inner.stats.snapshots_coalesced += 1;
                inner.latest = Some(snapshot);
            }
            None => inner.latest = Some(snapshot),
        }
    }

    /// Queue a command behind any already pending
    pub fn deliver_command(&self, envelope: CommandEnvelope) {
        let mut inner = self.inner.lock();
        inner.stats.commands_received += 1;
        trace!("Queued command seq={} {}", envelope.seq, envelope.command);
        inner.commands.push_back(envelope);
    }

    /// Take everything pending
    pub fn drain(&self) -> Inbox {
        let mut inner = self.inner.lock();
        Inbox {
            snapshot: inner.latest.take(),
            commands: inner.commands.drain(..).collect(),
        }
    }

    /// Counters so far
    pub fn stats(&self) -> MailboxStats {
        self.inner.lock().stats
    }
}
