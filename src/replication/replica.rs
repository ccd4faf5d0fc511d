//! Replica side
//!
//! Applies the owner's snapshots and commands and publishes a cursor
//! position each tick.
//!
//! # Tick
//!
//! ```text
//! Inbox
//!   ├─> commands (in order) ──> handle_command()
//!   │     Calibrate        → calibration reset, gyro window cleared
//!   │     Focus / Unfocus  → CursorState, anchor, pointer window
//!   │     ChangeArea / SetupScreenSize → ActionArea
//!   │     Message          → logged
//!   │
//!   └─> newest snapshot ──> apply_snapshot()
//!         orientation → CalibrationController → OrientationProjector → gyro window
//!         pointer     → pointer window (Focus only)
//!
//! publish:  Normal → gyro.value()
//!           Focus  → anchor + pointer.value() * action_area
//! ```
//!
//! Calibration, cursor state and action area are only written by the command
//! handlers; snapshot application only feeds the windows.
//!
//! Snapshots and commands are each ordered by `(session, seq)`. Anything at
//! or below the last applied key is a replay and is dropped.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use super::mailbox::Inbox;
use super::ReplicationStats;
use crate::cursor::{
    ActionArea, ActionAreaConfig, CursorState, SmoothingConfig, SmoothingWindow,
};
use crate::orientation::{CalibrationController, OrientationProjector, ProjectionConfig};
use crate::protocol::{
    Command, CommandEnvelope, ProtocolError, Result, Role, SessionId, Snapshot,
};

/// Configuration of the replica pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Orientation projection
    #[serde(default)]
    pub projection: ProjectionConfig,

    /// Window sizes
    #[serde(default)]
    pub smoothing: SmoothingConfig,

    /// Action area
    #[serde(default)]
    pub action_area: ActionAreaConfig,
}

/// What a command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Applied
    Applied,
    /// Sequence already seen, ignored
    Duplicate,
}

/// Output of one replica tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicaOutput {
    /// Published cursor position, once any has been computed
    pub cursor: Option<Vec2>,
    /// New action area scale, if it changed this tick
    pub action_area: Option<Vec2>,
    /// Cursor state after this tick
    pub state: CursorState,
}

/// Replica-side cursor entity
#[derive(Debug, Clone)]
pub struct ReplicaCursor {
    calibration: CalibrationController,
    projector: OrientationProjector,
    gyro: SmoothingWindow,
    pointer: SmoothingWindow,
    state: CursorState,
    action_area: ActionArea,
    anchor: Vec2,
    published: Option<Vec2>,
    last_projected: Option<Vec2>,
    last_snapshot: Option<(SessionId, u64)>,
    last_command: Option<(SessionId, u64)>,
    area_changed: bool,
    stats: ReplicationStats,
}

impl ReplicaCursor {
    /// Create an uncalibrated replica in Normal
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            calibration: CalibrationController::new(),
            projector: OrientationProjector::new(&config.projection),
            gyro: SmoothingWindow::new(config.smoothing.window),
            pointer: SmoothingWindow::new(config.smoothing.window),
            state: CursorState::Normal,
            action_area: ActionArea::new(&config.action_area),
            anchor: Vec2::ZERO,
            published: None,
            last_projected: None,
            last_snapshot: None,
            last_command: None,
            area_changed: false,
            stats: ReplicationStats::default(),
        }
    }

    /// Apply everything received since the last tick and publish
    pub fn tick(&mut self, inbox: Inbox) -> ReplicaOutput {
        for envelope in &inbox.commands {
            if let Err(e) = self.handle_command(Role::Owner, envelope) {
                warn!("Command seq={} not applied: {}", envelope.seq, e);
            }
        }

        if let Some(snapshot) = inbox.snapshot {
            self.apply_snapshot(&snapshot);
        }

        let action_area = std::mem::take(&mut self.area_changed).then(|| self.action_area.scale());

        ReplicaOutput {
            cursor: self.published,
            action_area,
            state: self.state,
        }
    }

    /// Apply one command sent by an entity with role `sender`
    ///
    /// Only owners issue commands. An envelope at or below the last one
    /// applied, by `(session, seq)`, is a replay and is dropped. A higher
    /// session is a restarted owner and starts counting again from 1.
    pub fn handle_command(
        &mut self,
        sender: Role,
        envelope: &CommandEnvelope,
    ) -> Result<CommandOutcome> {
        if sender != Role::Owner {
            self.stats.role_violations += 1;
            return Err(ProtocolError::RoleViolation {
                role: sender,
                action: "issue commands",
            });
        }

        let key = envelope.order_key();
        let expected = match self.last_command {
            Some(last) if key <= last => {
                self.stats.duplicate_commands += 1;
                debug!(
                    "Dropping replayed command session={} seq={} (last applied {}/{})",
                    key.0, key.1, last.0, last.1
                );
                return Ok(CommandOutcome::Duplicate);
            }
            Some((session, seq)) if session == key.0 => seq + 1,
            Some(_) => {
                info!("Owner session {} started", key.0);
                1
            }
            None => 1,
        };
        if key.1 > expected {
            warn!("Command sequence gap: expected {}, got {}", expected, key.1);
        }
        self.last_command = Some(key);

        debug!("Applying command seq={} {}", envelope.seq, envelope.command);
        let result = self.apply_command(&envelope.command);
        match &result {
            Ok(()) => self.stats.commands_applied += 1,
            Err(ProtocolError::MalformedPayload { .. }) => self.stats.malformed_payloads += 1,
            Err(_) => {}
        }
        result.map(|()| CommandOutcome::Applied)
    }

    fn apply_command(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::Calibrate => {
                self.calibration.request();
                self.gyro.clear();
                self.last_projected = None;
            }
            Command::Focus => {
                if self.state == CursorState::Normal {
                    self.anchor = self.published.unwrap_or(Vec2::ZERO);
                    self.pointer.clear();
                    self.state = CursorState::Focus;
                    debug!("Focus anchored at ({:.3}, {:.3})", self.anchor.x, self.anchor.y);
                }
            }
            Command::Unfocus => {
                if self.state == CursorState::Focus {
                    self.pointer.clear();
                    self.state = CursorState::Normal;
                    self.publish();
                }
            }
            Command::ChangeArea(payload) => {
                self.action_area.apply_change_payload(payload)?;
                self.area_changed = true;
            }
            Command::SetupScreenSize(payload) => {
                self.action_area.apply_screen_size_payload(payload)?;
                self.area_changed = true;
            }
            Command::Message(text) => {
                info!("Message from owner: {}", text);
            }
        }
        Ok(())
    }

    /// Feed one snapshot through calibration, projection and smoothing
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        let key = snapshot.order_key();
        if let Some(last) = self.last_snapshot {
            if key <= last {
                self.stats.stale_snapshots += 1;
                debug!(
                    "Dropping stale snapshot session={} seq={} (last applied {}/{})",
                    key.0, key.1, last.0, last.1
                );
                return;
            }
        }
        self.last_snapshot = Some(key);
        self.stats.snapshots_applied += 1;

        if let Some(orientation) = self.calibration.apply(snapshot.orientation) {
            match self.projector.project(orientation) {
                Some(point) => {
                    self.last_projected = Some(point);
                    self.gyro.push(point);
                }
                None => {
                    self.stats.projection_misses += 1;
                    trace!("No intersection for snapshot seq={}", snapshot.seq);
                }
            }
        }

        if self.state == CursorState::Focus {
            if let Some(pointer) = snapshot.pointer() {
                self.pointer.push(pointer);
            }
        }

        self.publish();
    }

    fn publish(&mut self) {
        let position = match self.state {
            CursorState::Normal => (!self.gyro.is_empty()).then(|| self.gyro.value()),
            CursorState::Focus => {
                let offset = if self.pointer.is_empty() {
                    Vec2::ZERO
                } else {
                    self.pointer.value() * self.action_area.scale()
                };
                Some(self.anchor + offset)
            }
        };

        if let Some(position) = position {
            trace!("Published cursor ({:.4}, {:.4})", position.x, position.y);
            self.published = Some(position);
        }
    }

    /// Last published cursor position
    pub fn cursor(&self) -> Option<Vec2> {
        self.published
    }

    /// Most recent projected point (before smoothing)
    pub fn last_projected(&self) -> Option<Vec2> {
        self.last_projected
    }

    /// Cursor state
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Action area scale
    pub fn action_area(&self) -> Vec2 {
        self.action_area.scale()
    }

    /// True once a reference pose is held
    pub fn is_calibrated(&self) -> bool {
        self.calibration.is_calibrated()
    }

    /// Counters
    pub fn stats(&self) -> &ReplicationStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn replica() -> ReplicaCursor {
        ReplicaCursor::new(&PipelineConfig::default())
    }

    fn cmd(seq: u64, command: Command) -> CommandEnvelope {
        CommandEnvelope::new(seq, command)
    }

    #[test]
    fn test_no_cursor_before_first_sample() {
        let mut r = replica();
        let out = r.tick(Inbox::default());
        assert_eq!(out.cursor, None);
        assert_eq!(out.state, CursorState::Normal);
    }

    #[test]
    fn test_first_snapshot_calibrates_to_centre() {
        let mut r = replica();
        r.apply_snapshot(&Snapshot::new(1, Quat::from_rotation_y(0.5)));

        assert!(r.is_calibrated());
        assert!(r.cursor().unwrap().abs_diff_eq(Vec2::ZERO, 1e-4));
    }

    #[test]
    fn test_stale_snapshot_dropped() {
        let mut r = replica();
        r.apply_snapshot(&Snapshot::new(1, Quat::IDENTITY));
        r.apply_snapshot(&Snapshot::new(3, Quat::from_rotation_y(0.2)));
        let after_three = r.cursor();

        r.apply_snapshot(&Snapshot::new(2, Quat::from_rotation_y(-0.4)));
        assert_eq!(r.cursor(), after_three);
        assert_eq!(r.stats().stale_snapshots, 1);
    }

    #[test]
    fn test_projection_miss_keeps_previous_point() {
        let mut r = replica();
        r.apply_snapshot(&Snapshot::new(1, Quat::IDENTITY));
        r.apply_snapshot(&Snapshot::new(2, Quat::from_rotation_y(0.2)));
        let before = r.cursor();
        let projected = r.last_projected();

        // Facing away from the plane
        r.apply_snapshot(&Snapshot::new(3, Quat::from_rotation_y(std::f32::consts::PI)));
        assert_eq!(r.cursor(), before);
        assert_eq!(r.last_projected(), projected);
        assert_eq!(r.stats().projection_misses, 1);
    }

    #[test]
    fn test_duplicate_command_dropped() {
        let mut r = replica();
        let change = cmd(1, Command::ChangeArea("0.5".into()));

        assert_eq!(r.handle_command(Role::Owner, &change).unwrap(), CommandOutcome::Applied);
        assert_eq!(r.handle_command(Role::Owner, &change).unwrap(), CommandOutcome::Duplicate);
        assert_eq!(r.action_area(), Vec2::splat(1.5));
        assert_eq!(r.stats().duplicate_commands, 1);
    }

    #[test]
    fn test_commands_from_replica_rejected() {
        let mut r = replica();
        let result = r.handle_command(Role::Replica, &cmd(1, Command::Focus));
        assert!(matches!(result, Err(ProtocolError::RoleViolation { .. })));
        assert_eq!(r.state(), CursorState::Normal);
    }

    #[test]
    fn test_malformed_change_area_leaves_scale() {
        let mut r = replica();
        let out = r.tick(Inbox {
            snapshot: None,
            commands: vec![cmd(1, Command::ChangeArea("wide".into()))],
        });

        assert_eq!(out.action_area, None);
        assert_eq!(r.action_area(), Vec2::ONE);
        assert_eq!(r.stats().malformed_payloads, 1);
    }

    #[test]
    fn test_focus_uses_anchor_and_scaled_pointer() {
        let mut r = replica();
        r.apply_snapshot(&Snapshot::new(1, Quat::from_rotation_y(0.3)));
        r.apply_snapshot(&Snapshot::new(2, Quat::IDENTITY * Quat::from_rotation_y(0.3)));
        let anchor = r.cursor().unwrap();

        r.tick(Inbox {
            snapshot: None,
            commands: vec![cmd(1, Command::Focus), cmd(2, Command::ChangeArea("1".into()))],
        });
        assert_eq!(r.state(), CursorState::Focus);

        let out = r.tick(Inbox {
            snapshot: Some(
                Snapshot::new(3, Quat::from_rotation_y(0.3)).with_pointer(Some(Vec2::new(0.5, -0.5))),
            ),
            commands: vec![],
        });

        let expected = anchor + Vec2::new(0.5, -0.5) * 2.0;
        assert!(out.cursor.unwrap().abs_diff_eq(expected, 1e-5));
    }

    #[test]
    fn test_unfocus_returns_to_gyro_stream() {
        let mut r = replica();
        r.apply_snapshot(&Snapshot::new(1, Quat::IDENTITY));
        r.handle_command(Role::Owner, &cmd(1, Command::Focus)).unwrap();
        r.apply_snapshot(&Snapshot::new(2, Quat::IDENTITY).with_pointer(Some(Vec2::ONE)));
        assert!(r.cursor().unwrap().abs_diff_eq(Vec2::ONE, 1e-5));

        r.handle_command(Role::Owner, &cmd(2, Command::Unfocus)).unwrap();
        assert_eq!(r.state(), CursorState::Normal);
        assert!(r.cursor().unwrap().abs_diff_eq(Vec2::ZERO, 1e-4));
    }

    #[test]
    fn test_focus_twice_keeps_anchor() {
        let mut r = replica();
        r.apply_snapshot(&Snapshot::new(1, Quat::IDENTITY));
        r.handle_command(Role::Owner, &cmd(1, Command::Focus)).unwrap();
        r.apply_snapshot(&Snapshot::new(2, Quat::IDENTITY).with_pointer(Some(Vec2::new(0.2, 0.0))));
        let before = r.cursor();

        r.handle_command(Role::Owner, &cmd(2, Command::Focus)).unwrap();
        assert_eq!(r.cursor(), before);
        assert_eq!(r.state(), CursorState::Focus);
    }

    #[test]
    fn test_calibrate_rezeroes_at_current_pose() {
        let mut r = replica();
        r.apply_snapshot(&Snapshot::new(1, Quat::IDENTITY));
        let turned = Quat::from_rotation_y(0.35);
        r.apply_snapshot(&Snapshot::new(2, turned));
        assert!(r.cursor().unwrap().x > 0.0);

        r.handle_command(Role::Owner, &cmd(1, Command::Calibrate)).unwrap();
        assert!(!r.is_calibrated());

        r.apply_snapshot(&Snapshot::new(3, turned));
        assert!(r.cursor().unwrap().abs_diff_eq(Vec2::ZERO, 1e-4));
    }

    #[test]
    fn test_replayed_first_command_applies_once() {
        let mut r = replica();
        let change = cmd(1, Command::ChangeArea("0.5".into())).in_session(10);

        assert_eq!(r.handle_command(Role::Owner, &change).unwrap(), CommandOutcome::Applied);
        assert_eq!(r.handle_command(Role::Owner, &change).unwrap(), CommandOutcome::Duplicate);
        assert_eq!(r.action_area(), Vec2::splat(1.5));
    }

    #[test]
    fn test_late_replays_after_newer_commands_dropped() {
        let mut r = replica();
        let commands = [
            cmd(1, Command::ChangeArea("0.5".into())).in_session(10),
            cmd(2, Command::Focus).in_session(10),
            cmd(3, Command::Unfocus).in_session(10),
        ];
        for envelope in &commands {
            assert_eq!(r.handle_command(Role::Owner, envelope).unwrap(), CommandOutcome::Applied);
        }
        let area = r.action_area();
        let state = r.state();

        for envelope in &commands[..2] {
            assert_eq!(
                r.handle_command(Role::Owner, envelope).unwrap(),
                CommandOutcome::Duplicate
            );
        }
        assert_eq!(r.action_area(), area);
        assert_eq!(r.state(), state);
        assert_eq!(r.stats().duplicate_commands, 2);
        assert_eq!(r.stats().commands_applied, 3);
    }

    #[test]
    fn test_replayed_first_command_keeps_snapshot_order() {
        let mut r = replica();
        let setup = cmd(1, Command::SetupScreenSize("1920,1080".into())).in_session(10);
        r.handle_command(Role::Owner, &setup).unwrap();
        r.apply_snapshot(&Snapshot::new(10, Quat::IDENTITY).in_session(10));

        r.handle_command(Role::Owner, &setup).unwrap();
        r.apply_snapshot(&Snapshot::new(3, Quat::from_rotation_y(0.4)).in_session(10));
        assert_eq!(r.stats().stale_snapshots, 1);
    }

    #[test]
    fn test_new_session_restarts_sequences() {
        let mut r = replica();
        r.handle_command(Role::Owner, &cmd(1, Command::Message("a".into())).in_session(10))
            .unwrap();
        r.handle_command(Role::Owner, &cmd(2, Command::Message("b".into())).in_session(10))
            .unwrap();
        r.apply_snapshot(&Snapshot::new(50, Quat::IDENTITY).in_session(10));

        // Restarted owner counts from 1 again
        let outcome = r
            .handle_command(
                Role::Owner,
                &cmd(1, Command::SetupScreenSize("1920,1080".into())).in_session(20),
            )
            .unwrap();
        assert_eq!(outcome, CommandOutcome::Applied);

        r.apply_snapshot(&Snapshot::new(1, Quat::IDENTITY).in_session(20));
        assert_eq!(r.stats().stale_snapshots, 0);

        // Traffic from the old session arriving late is dropped
        let late = cmd(3, Command::ChangeArea("1".into())).in_session(10);
        assert_eq!(r.handle_command(Role::Owner, &late).unwrap(), CommandOutcome::Duplicate);
        r.apply_snapshot(&Snapshot::new(51, Quat::IDENTITY).in_session(10));
        assert_eq!(r.stats().stale_snapshots, 1);
        assert_eq!(r.action_area(), Vec2::new(1920.0 / 1080.0, 1.0));
    }
}
