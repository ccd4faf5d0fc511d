//! Replication Protocol
//!
//! Messages exchanged between the owner of a cursor and its replicas.
//!
//! # Overview
//!
//! Two independent streams flow from owner to replicas:
//!
//! - **Snapshots** - one per tick, the owner's full sampled state. Delivery
//!   may be lossy or reordered; replicas apply the newest by sequence
//!   (last-write-wins) and treat a missing snapshot as "unchanged".
//! - **Commands** - discrete state changes (calibrate, focus, resize, ...).
//!   Delivered reliably and in order per sender; each carries a sequence
//!   so replays from a lower layer are dropped.
//!
//! Both streams are stamped with the owner's [`SessionId`]. Sequences restart
//! at 1 in every session, so replicas order traffic by `(session, seq)`: a
//! higher session is a restarted owner, a lower one is a late replay.
//!
//! ## Commands
//!
//! | Name | Payload | Effect on replica |
//! |------|---------|-------------------|
//! | `Calibrate` | - | Calibration back to Uncalibrated |
//! | `Focus` | - | CursorState → Focus |
//! | `Unfocus` | - | CursorState → Normal |
//! | `ChangeArea` | `"<float>"` | Action area += delta, clamped ≥ 1 |
//! | `SetupScreenSize` | `"<w>,<h>"` | Action area from aspect ratio |
//! | `Message` | text | Logged, not interpreted |
//!
//! ## Wire format
//!
//! Each [`WireFrame`] is JSON inside a 4-byte big-endian length prefix
//! (see [`codec`]). A connection opens with `Hello`, answered by `Welcome`
//! or `Rejected`.
//!
//! ```text
//! owner                      hub                       observer
//!   │── Hello{owner} ───────>│<──────── Hello{replica} ──│
//!   │<────── Welcome{id} ────│───── Welcome{id} ────────>│
//!   │── Command{seq,..} ────>│── Command{seq,..} ───────>│  (relay)
//!   │── Snapshot{seq,..} ───>│── Snapshot{seq,..} ──────>│  (relay)
//! ```

pub mod codec;
pub mod error;

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

pub use codec::{WireCodec, MAX_FRAME_LENGTH};
pub use error::{ProtocolError, Result};

use crate::cursor::format_screen_size;

/// Identifier assigned to a connected peer
pub type PeerId = u32;

/// Owner session stamp; later sessions compare greater
pub type SessionId = u64;

/// Role of a synchronized entity, fixed for its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Produces sensor and touch data
    Owner,
    /// Receives and applies the owner's data
    Replica,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Replica => write!(f, "replica"),
        }
    }
}

/// Destination of a send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerSet {
    /// Every connected peer
    All,
    /// Every peer but one (typically the sender being relayed)
    AllExcept(PeerId),
}

impl PeerSet {
    /// True if `peer` is addressed
    pub fn contains(&self, peer: PeerId) -> bool {
        match *self {
            Self::All => true,
            Self::AllExcept(id) => id != peer,
        }
    }
}

/// Per-tick owner state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Owner session this tick belongs to
    #[serde(default)]
    pub session: SessionId,

    /// Owner tick sequence, strictly increasing within a session
    pub seq: u64,

    /// Controller attitude
    pub orientation: Quat,

    /// Normalized touch pointer (z = 0), present while focused
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer_position: Option<Vec3>,
}

impl Snapshot {
    /// Snapshot without pointer data
    pub fn new(seq: u64, orientation: Quat) -> Self {
        Self {
            session: 0,
            seq,
            orientation,
            pointer_position: None,
        }
    }

    /// Stamp with the owner's session
    pub fn in_session(mut self, session: SessionId) -> Self {
        self.session = session;
        self
    }

    /// Position in the owner's snapshot stream
    pub fn order_key(&self) -> (SessionId, u64) {
        (self.session, self.seq)
    }

    /// Attach a pointer position
    pub fn with_pointer(mut self, pointer: Option<Vec2>) -> Self {
        self.pointer_position = pointer.map(|p| p.extend(0.0));
        self
    }

    /// Pointer position as a 2D point
    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer_position.map(|p| p.truncate())
    }
}

/// Named, reliably delivered state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", content = "payload")]
pub enum Command {
    /// Reset calibration
    Calibrate,
    /// Enter Focus
    Focus,
    /// Return to Normal
    Unfocus,
    /// String-encoded float delta for the action area
    ChangeArea(String),
    /// `"width,height"` of the controller screen
    SetupScreenSize(String),
    /// Opaque text
    Message(String),
}

impl Command {
    /// `ChangeArea` carrying `delta`
    pub fn change_area(delta: f32) -> Self {
        Self::ChangeArea(delta.to_string())
    }

    /// `SetupScreenSize` for the given screen
    pub fn setup_screen_size(width: u32, height: u32) -> Self {
        Self::SetupScreenSize(format_screen_size(width, height))
    }

    /// Wire name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Calibrate => "Calibrate",
            Self::Focus => "Focus",
            Self::Unfocus => "Unfocus",
            Self::ChangeArea(_) => "ChangeArea",
            Self::SetupScreenSize(_) => "SetupScreenSize",
            Self::Message(_) => "Message",
        }
    }

    /// Payload, for commands that carry one
    pub fn payload(&self) -> Option<&str> {
        match self {
            Self::Calibrate | Self::Focus | Self::Unfocus => None,
            Self::ChangeArea(p) | Self::SetupScreenSize(p) | Self::Message(p) => Some(p),
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.payload() {
            Some(payload) => write!(f, "{}({:?})", self.name(), payload),
            None => write!(f, "{}", self.name()),
        }
    }
}

/// Command with its per-sender sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Sender's session
    #[serde(default)]
    pub session: SessionId,
    /// Sender's command sequence, strictly increasing from 1 within a session
    pub seq: u64,
    /// The command
    pub command: Command,
}

impl CommandEnvelope {
    /// Envelope outside any particular session
    pub fn new(seq: u64, command: Command) -> Self {
        Self {
            session: 0,
            seq,
            command,
        }
    }

    /// Stamp with the sender's session
    pub fn in_session(mut self, session: SessionId) -> Self {
        self.session = session;
        self
    }

    /// Position in the sender's command stream
    pub fn order_key(&self) -> (SessionId, u64) {
        (self.session, self.seq)
    }
}

/// Top-level frame on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireFrame {
    /// First frame from a connecting peer
    Hello {
        /// Requested role
        role: Role,
        /// Human-readable name for logs
        #[serde(default)]
        name: String,
    },
    /// Hub accepted the connection
    Welcome {
        /// Assigned peer id
        peer_id: PeerId,
    },
    /// Hub refused the connection
    Rejected {
        /// Why
        reason: String,
    },
    /// Per-tick state
    Snapshot(Snapshot),
    /// Reliable command
    Command(CommandEnvelope),
}

impl WireFrame {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::Welcome { .. } => "welcome",
            Self::Rejected { .. } => "rejected",
            Self::Snapshot(_) => "snapshot",
            Self::Command(_) => "command",
        }
    }
}
