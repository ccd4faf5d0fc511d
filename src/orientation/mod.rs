//! Orientation processing
//!
//! Everything between a raw attitude quaternion and a 2D cursor-space point.
//!
//! # Pipeline
//!
//! ```text
//! Quat (controller attitude)
//!   └─> CalibrationController     pre-multiply by inverse reference pose
//!       └─> OrientationProjector  ray/plane intersection (single or dual)
//!           └─> Option<Vec2>      None = keep previous point
//! ```

mod calibration;
mod projector;

pub use calibration::{is_valid_sample, CalibrationController, CalibrationState};
pub use projector::{
    OrientationProjector, Plane, PlaneConfig, PlaneProjection, ProjectionConfig, ProjectionMode,
    Ray, PARALLEL_EPSILON,
};
