//! Owner side
//!
//! The owner is the device holding the sensors. Each tick it turns the
//! current attitude (and, while focused, the pointer) into a [`Snapshot`];
//! touch gestures and explicit requests become sequenced commands.
//!
//! Everything an owner emits is stamped with its session, taken from the
//! wall clock at creation, so a restarted owner outranks its predecessor.

use glam::{Quat, Vec2};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::cursor::{CursorState, GestureOutcome, GestureStateMachine};
use crate::input::{PointerNormalizer, TouchEvent};
use crate::protocol::{Command, CommandEnvelope, SessionId, Snapshot};

/// Owner-side cursor entity
#[derive(Debug, Clone)]
pub struct OwnerCursor {
    gestures: GestureStateMachine,
    session: SessionId,
    tick_seq: u64,
    command_seq: u64,
}

impl OwnerCursor {
    /// Create an owner for a controller screen of the given size
    pub fn new(normalizer: PointerNormalizer) -> Self {
        Self::with_session(normalizer, clock_session())
    }

    /// Create an owner with an explicit session stamp
    pub fn with_session(normalizer: PointerNormalizer, session: SessionId) -> Self {
        Self {
            gestures: GestureStateMachine::new(normalizer),
            session,
            tick_seq: 0,
            command_seq: 0,
        }
    }

    /// Commands opening a session: screen size, then calibration
    pub fn session_start(&mut self) -> Vec<CommandEnvelope> {
        let normalizer = self.gestures.normalizer();
        let screen = Command::setup_screen_size(normalizer.width(), normalizer.height());
        info!(
            "Owner session {} start: screen {}x{}",
            self.session,
            normalizer.width(),
            normalizer.height()
        );
        vec![self.envelope(screen), self.envelope(Command::Calibrate)]
    }

    /// Build this tick's snapshot
    pub fn tick(&mut self, orientation: Quat) -> Snapshot {
        self.tick_seq += 1;
        Snapshot::new(self.tick_seq, orientation)
            .in_session(self.session)
            .with_pointer(self.gestures.pointer())
    }

    /// Feed a touch event; returns the command to send, if any
    pub fn on_touch(&mut self, event: &TouchEvent) -> Option<CommandEnvelope> {
        match self.gestures.handle(event) {
            GestureOutcome::Command(command) => Some(self.envelope(command)),
            GestureOutcome::DoubleTap { tap_count } => {
                debug!("Double tap with {} taps has no bound action", tap_count);
                None
            }
            GestureOutcome::PointerMoved(_) | GestureOutcome::Ignored => None,
        }
    }

    /// Request recalibration at the current pose
    pub fn calibrate(&mut self) -> CommandEnvelope {
        self.envelope(Command::Calibrate)
    }

    /// Pinch-zoom delta for the action area
    pub fn change_area(&mut self, delta: f32) -> CommandEnvelope {
        self.envelope(Command::change_area(delta))
    }

    /// Free-form text for replicas to log
    pub fn message(&mut self, text: impl Into<String>) -> CommandEnvelope {
        self.envelope(Command::Message(text.into()))
    }

    /// Current gesture state
    pub fn state(&self) -> CursorState {
        self.gestures.state()
    }

    /// Pointer that the next snapshot will carry
    pub fn pointer(&self) -> Option<Vec2> {
        self.gestures.pointer()
    }

    /// Session stamped on everything this owner sends
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Sequence of the last snapshot built
    pub fn tick_seq(&self) -> u64 {
        self.tick_seq
    }

    fn envelope(&mut self, command: Command) -> CommandEnvelope {
        self.command_seq += 1;
        CommandEnvelope::new(self.command_seq, command).in_session(self.session)
    }
}

fn clock_session() -> SessionId {
    // Pre-epoch clocks fall back to session 0
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as SessionId)
        .unwrap_or(0)
}
