//! Controller Input
//!
//! Boundary types for the controller's already-sampled inputs. Hardware
//! access is out of scope; this module only defines what the owner consumes.
//!
//! # Architecture
//!
//! ```text
//! Sensor fusion (external)          Touch layer (external)
//!       │ Quat per tick                   │ Began/Moved/Ended + tap count
//!       ↓                                 ↓
//! ┌─────────────────────┐        ┌──────────────────────┐
//! │ OrientationSource   │        │ TouchEvent           │
//! └─────────────────────┘        │ PointerNormalizer    │
//!       │                        └──────────────────────┘
//!       ↓                                 ↓
//!  OwnerCursor::tick()            OwnerCursor::on_touch()
//! ```

pub mod error;
pub mod sensor;
pub mod touch;

pub use error::{InputError, Result};
pub use sensor::{validate_sample, OrientationSource, ScriptedSource, SweepSource};
pub use touch::{PointerNormalizer, TouchEvent, TouchPhase};
