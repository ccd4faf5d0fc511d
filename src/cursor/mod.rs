//! Cursor model
//!
//! State that turns projected points and pointer input into the published
//! cursor position.
//!
//! | Piece | Role |
//! |-------|------|
//! | [`SmoothingWindow`] | Moving average over the last 8 samples of one stream |
//! | [`CursorState`] | Normal (orientation-driven) or Focus (pointer-driven) |
//! | [`GestureStateMachine`] | Owner-side touch → command translation |
//! | [`ActionArea`] | Scale from pointer space to cursor offset, never below 1 |
//!
//! # Published position
//!
//! ```text
//! Normal:  gyro_window.value()
//! Focus:   anchor + pointer_window.value() * action_area.scale()
//!          (anchor = published position when Focus began)
//! ```

mod action_area;
mod smoothing;
mod state;

pub use action_area::{
    aspect_scale, format_screen_size, parse_screen_size, ActionArea, ActionAreaConfig, MIN_SCALE,
};
pub use smoothing::{SmoothingConfig, SmoothingWindow, DEFAULT_WINDOW};
pub use state::{CursorState, GestureOutcome, GestureStateMachine};
