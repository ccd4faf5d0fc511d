//! Protocol error types

use thiserror::Error;

use super::{PeerId, Role};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding, decoding or applying protocol messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Command payload could not be parsed; the target field is left unchanged
    #[error("malformed {command} payload: {payload:?}")]
    MalformedPayload {
        /// Command name
        command: &'static str,
        /// Raw payload
        payload: String,
    },

    /// JSON encode/decode failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Message sent or received by a peer whose role does not allow it
    #[error("{role} may not {action}")]
    RoleViolation {
        /// Role of the offending entity
        role: Role,
        /// What it attempted
        action: &'static str,
    },

    /// Frame not valid at this point of the session
    #[error("unexpected frame: {0}")]
    UnexpectedFrame(&'static str),

    /// Hub refused the connection
    #[error("connection rejected: {0}")]
    Rejected(String),

    /// No such peer
    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    /// Peer's outbound queue is gone
    #[error("peer {0} disconnected")]
    PeerClosed(PeerId),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Returns true if the session can continue after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::MalformedPayload { .. } | Self::Json(_) | Self::UnexpectedFrame(_)
        )
    }
}
