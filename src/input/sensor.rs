//! Orientation sources
//!
//! Raw sensor acquisition lives outside this crate. An [`OrientationSource`]
//! hands the owner one already-fused attitude quaternion per tick.

use glam::{EulerRot, Quat};
use std::collections::VecDeque;

use crate::input::error::{InputError, Result};

/// Producer of per-tick orientation samples
pub trait OrientationSource: Send {
    /// Next attitude sample
    fn sample(&mut self) -> Result<Quat>;
}

/// Synthetic source sweeping yaw and pitch sinusoidally
///
/// Stands in for a gyroscope when running the binary without hardware.
#[derive(Debug, Clone)]
pub struct SweepSource {
    tick: u64,
    tick_rate_hz: f32,
    yaw_amplitude: f32,
    pitch_amplitude: f32,
    period_secs: f32,
}

impl SweepSource {
    /// Sweep ±`yaw_deg` / ±`pitch_deg` with the given period
    pub fn new(tick_rate_hz: u32, yaw_deg: f32, pitch_deg: f32, period_secs: f32) -> Self {
        Self {
            tick: 0,
            tick_rate_hz: tick_rate_hz.max(1) as f32,
            yaw_amplitude: yaw_deg.to_radians(),
            pitch_amplitude: pitch_deg.to_radians(),
            period_secs: period_secs.max(f32::EPSILON),
        }
    }
}

impl Default for SweepSource {
    fn default() -> Self {
        Self::new(60, 20.0, 10.0, 4.0)
    }
}

impl OrientationSource for SweepSource {
    fn sample(&mut self) -> Result<Quat> {
        let t = self.tick as f32 / self.tick_rate_hz;
        self.tick += 1;

        let phase = std::f32::consts::TAU * t / self.period_secs;
        let yaw = self.yaw_amplitude * phase.sin();
        let pitch = self.pitch_amplitude * (2.0 * phase).sin();

        Ok(Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0))
    }
}

/// Source replaying a fixed list of samples
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    samples: VecDeque<Quat>,
}

impl ScriptedSource {
    /// Replay `samples` in order
    pub fn new(samples: impl IntoIterator<Item = Quat>) -> Self {
        Self {
            samples: samples.into_iter().collect(),
        }
    }

    /// Repeat one sample `count` times
    pub fn repeat(sample: Quat, count: usize) -> Self {
        Self::new(std::iter::repeat(sample).take(count))
    }
}

impl OrientationSource for ScriptedSource {
    fn sample(&mut self) -> Result<Quat> {
        self.samples.pop_front().ok_or(InputError::SourceExhausted)
    }
}

/// Reject samples with NaN or infinite components
pub fn validate_sample(q: Quat) -> Result<Quat> {
    if q.is_finite() {
        Ok(q)
    } else {
        Err(InputError::InvalidOrientation(q.x, q.y, q.z, q.w))
    }
}
