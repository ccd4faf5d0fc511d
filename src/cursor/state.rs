//! Normal / Focus cursor state
//!
//! In Normal the cursor follows the smoothed orientation projection. In Focus
//! it follows the controller's touch position, offset from where the cursor
//! was when Focus began.
//!
//! Only the owner sees raw touches, so the owner runs the
//! [`GestureStateMachine`] and tells replicas about transitions with
//! `Focus` / `Unfocus` commands. Replicas never infer transitions themselves.
//!
//! ```text
//!            Began (taps == 1) / emit Focus
//!   Normal ─────────────────────────────────> Focus
//!     ↑  ↖                                     │ │
//!     │   └────── Ended / emit Unfocus ────────┘ │ Moved / pointer update
//!     │                                          ↺
//!     └─ Ended / emit Unfocus   Began (taps > 1) / double-tap hook, no change
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::input::{PointerNormalizer, TouchEvent, TouchPhase};
use crate::protocol::Command;

/// Cursor state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CursorState {
    /// Cursor follows orientation
    #[default]
    Normal,
    /// Cursor follows the touch pointer
    Focus,
}

impl std::fmt::Display for CursorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "Normal"),
            Self::Focus => write!(f, "Focus"),
        }
    }
}

/// Result of feeding one touch event to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum GestureOutcome {
    /// A transition happened; send this command to replicas
    Command(Command),
    /// Pointer moved while focused (normalized position)
    PointerMoved(Vec2),
    /// Multi-tap began; no state change
    DoubleTap {
        /// Taps recognised by the touch layer
        tap_count: u32,
    },
    /// Event has no effect in the current state
    Ignored,
}

/// Owner-side gesture state machine
#[derive(Debug, Clone)]
pub struct GestureStateMachine {
    state: CursorState,
    normalizer: PointerNormalizer,
    pointer: Option<Vec2>,
}

impl GestureStateMachine {
    /// Create a state machine in Normal for a screen of the given size
    pub fn new(normalizer: PointerNormalizer) -> Self {
        Self {
            state: CursorState::Normal,
            normalizer,
            pointer: None,
        }
    }

    /// Current state
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Latest normalized pointer position while focused
    pub fn pointer(&self) -> Option<Vec2> {
        match self.state {
            CursorState::Focus => self.pointer,
            CursorState::Normal => None,
        }
    }

    /// Screen normalizer in use
    pub fn normalizer(&self) -> &PointerNormalizer {
        &self.normalizer
    }

    /// Apply one touch event
    pub fn handle(&mut self, event: &TouchEvent) -> GestureOutcome {
        let outcome = match (event.phase, self.state) {
            (TouchPhase::Began, _) if event.tap_count > 1 => GestureOutcome::DoubleTap {
                tap_count: event.tap_count,
            },
            (TouchPhase::Began, CursorState::Normal) if event.tap_count == 1 => {
                self.state = CursorState::Focus;
                self.pointer = Some(self.normalizer.normalize(event.position));
                GestureOutcome::Command(Command::Focus)
            }
            (TouchPhase::Began, _) => GestureOutcome::Ignored,
            (TouchPhase::Moved, CursorState::Focus) => {
                let position = self.normalizer.normalize(event.position);
                self.pointer = Some(position);
                GestureOutcome::PointerMoved(position)
            }
            (TouchPhase::Moved, CursorState::Normal) => GestureOutcome::Ignored,
            (TouchPhase::Ended, _) => {
                self.state = CursorState::Normal;
                self.pointer = None;
                GestureOutcome::Command(Command::Unfocus)
            }
        };

        match &outcome {
            GestureOutcome::Command(command) => {
                debug!("Gesture {:?} -> {} ({})", event.phase, command, self.state)
            }
            GestureOutcome::DoubleTap { tap_count } => {
                debug!("Double tap ({} taps), no state change", tap_count)
            }
            _ => trace!("Gesture {:?} -> {:?}", event.phase, outcome),
        }

        outcome
    }
}
