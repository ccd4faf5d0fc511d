//! Touch events
//!
//! Discrete touch events as delivered by the controller's touch layer,
//! and normalization of their screen positions into pointer space.
//!
//! # Pointer space
//!
//! ```text
//!  (0,0) ┌──────────────┐            +y
//!        │   screen px  │   ──>   -1 ──┼── +1 x
//!        └──────────────┘ (w,h)        -y
//! ```
//!
//! Pointer positions are in [-1, 1] on both axes, centred on the screen,
//! with +y pointing up.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::input::error::{InputError, Result};

/// Phase of a touch event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchPhase {
    /// Finger down
    Began,
    /// Finger moved while down
    Moved,
    /// Finger lifted or touch cancelled
    Ended,
}

/// A single touch event from the controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    /// Event phase
    pub phase: TouchPhase,

    /// Position in screen pixels, origin top-left
    pub position: Vec2,

    /// Consecutive taps recognised by the touch layer (1 = single tap)
    pub tap_count: u32,
}

impl TouchEvent {
    /// Create a touch-began event
    pub fn began(position: Vec2, tap_count: u32) -> Self {
        Self {
            phase: TouchPhase::Began,
            position,
            tap_count,
        }
    }

    /// Create a touch-moved event
    pub fn moved(position: Vec2) -> Self {
        Self {
            phase: TouchPhase::Moved,
            position,
            tap_count: 1,
        }
    }

    /// Create a touch-ended event
    pub fn ended(position: Vec2) -> Self {
        Self {
            phase: TouchPhase::Ended,
            position,
            tap_count: 1,
        }
    }
}

/// Converts screen pixel positions into pointer space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerNormalizer {
    width: f32,
    height: f32,
}

impl PointerNormalizer {
    /// Create a normalizer for a screen of the given pixel size
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(InputError::InvalidScreenSize(width, height));
        }
        Ok(Self {
            width: width as f32,
            height: height as f32,
        })
    }

    /// Screen width in pixels
    pub fn width(&self) -> u32 {
        self.width as u32
    }

    /// Screen height in pixels
    pub fn height(&self) -> u32 {
        self.height as u32
    }

    /// Normalize a pixel position, clamping off-screen touches to the edge
    pub fn normalize(&self, position: Vec2) -> Vec2 {
        let x = 2.0 * position.x / self.width - 1.0;
        let y = 1.0 - 2.0 * position.y / self.height;
        Vec2::new(x, y).clamp(Vec2::NEG_ONE, Vec2::ONE)
    }
}
