//! Calibration (zero orientation)
//!
//! Defines the controller's "straight ahead" as whatever pose it holds when
//! calibration completes. The first valid sample after a request becomes the
//! reference; its inverse is pre-multiplied onto every later sample.
//!
//! ```text
//!   Uncalibrated ──(valid sample Q)──> Calibrated { offset = Q⁻¹ }
//!        ↑                                   │
//!        └────────────(Calibrate)────────────┘
//!
//!   calibrated(q) = offset * q
//! ```
//!
//! A zero quaternion (all components near zero) is what a sensor reports
//! before it has produced real data; such samples never complete calibration.

use glam::Quat;
use tracing::{debug, trace};

/// Squared length below which a sample is considered not yet valid
pub const NULL_SAMPLE_EPSILON: f32 = 1e-6;

/// Calibration state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    /// Waiting for the first valid sample
    Uncalibrated,
    /// Reference pose captured
    Calibrated {
        /// Inverse of the reference pose
        offset: Quat,
    },
}

/// Gate between raw orientation samples and the projector
#[derive(Debug, Clone)]
pub struct CalibrationController {
    state: CalibrationState,
    calibrations: u64,
}

impl CalibrationController {
    /// Create an uncalibrated controller
    pub fn new() -> Self {
        Self {
            state: CalibrationState::Uncalibrated,
            calibrations: 0,
        }
    }

    /// Forget the reference pose; the next valid sample becomes the new one
    pub fn request(&mut self) {
        if self.is_calibrated() {
            debug!("Calibration reset, awaiting next valid orientation sample");
        }
        self.state = CalibrationState::Uncalibrated;
    }

    /// Feed a raw sample and return it relative to the reference pose
    ///
    /// Returns `None` while uncalibrated and the sample is not yet valid.
    /// The sample completing calibration is returned as identity.
    pub fn apply(&mut self, sample: Quat) -> Option<Quat> {
        match self.state {
            CalibrationState::Calibrated { offset } => Some(offset * sample),
            CalibrationState::Uncalibrated => {
                if !is_valid_sample(sample) {
                    trace!("Ignoring null orientation sample while uncalibrated");
                    return None;
                }

                let reference = sample.normalize();
                let offset = reference.inverse();
                self.state = CalibrationState::Calibrated { offset };
                self.calibrations += 1;

                debug!(
                    "Calibrated: reference=[{:.4}, {:.4}, {:.4}, {:.4}]",
                    reference.x, reference.y, reference.z, reference.w
                );
                Some(offset * sample)
            }
        }
    }

    /// Current state
    pub fn state(&self) -> CalibrationState {
        self.state
    }

    /// True once a reference pose has been captured
    pub fn is_calibrated(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrated { .. })
    }

    /// Inverse of the reference pose, if captured
    pub fn offset(&self) -> Option<Quat> {
        match self.state {
            CalibrationState::Calibrated { offset } => Some(offset),
            CalibrationState::Uncalibrated => None,
        }
    }

    /// Number of times a reference pose has been captured
    pub fn calibration_count(&self) -> u64 {
        self.calibrations
    }
}

impl Default for CalibrationController {
    fn default() -> Self {
        Self::new()
    }
}

/// False for the zero quaternion and for non-finite samples
pub fn is_valid_sample(sample: Quat) -> bool {
    sample.is_finite() && sample.length_squared() > NULL_SAMPLE_EPSILON
}
