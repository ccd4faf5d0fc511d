//! Action area scale
//!
//! Scale factor mapping focus-mode pointer input onto a cursor offset.
//! Pinch zoom on the controller adjusts it through `ChangeArea`; the screen
//! size exchanged at session start seeds it through `SetupScreenSize`.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::protocol::ProtocolError;

/// Lower bound applied to both scale components
pub const MIN_SCALE: f32 = 1.0;

/// Configuration for the action area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionAreaConfig {
    /// Scale used before any screen size is known
    #[serde(default = "default_initial_scale")]
    pub initial_scale: [f32; 2],

    /// Minimum value of each component
    #[serde(default = "default_min_scale")]
    pub min_scale: f32,
}

fn default_initial_scale() -> [f32; 2] {
    [1.0, 1.0]
}
fn default_min_scale() -> f32 {
    MIN_SCALE
}

impl Default for ActionAreaConfig {
    fn default() -> Self {
        Self {
            initial_scale: default_initial_scale(),
            min_scale: default_min_scale(),
        }
    }
}

/// 2D scale of the usable gesture area
#[derive(Debug, Clone, PartialEq)]
pub struct ActionArea {
    scale: Vec2,
    min: f32,
}

impl ActionArea {
    /// Create an action area with the given scale, clamped to the minimum
    pub fn new(config: &ActionAreaConfig) -> Self {
        let min = config.min_scale.max(MIN_SCALE);
        Self {
            scale: Vec2::from(config.initial_scale).max(Vec2::splat(min)),
            min,
        }
    }

    /// Current scale
    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    /// Add `delta` to both components and clamp each to the minimum
    pub fn change(&mut self, delta: f32) {
        if !delta.is_finite() {
            warn!("Ignoring non-finite action area delta: {}", delta);
            return;
        }
        self.scale = (self.scale + Vec2::splat(delta)).max(Vec2::splat(self.min));
        debug!(
            "Action area changed by {:+.3} -> ({:.3}, {:.3})",
            delta, self.scale.x, self.scale.y
        );
    }

    /// Apply a string-encoded `ChangeArea` delta
    ///
    /// A payload that does not parse leaves the area unchanged.
    pub fn apply_change_payload(&mut self, payload: &str) -> Result<Vec2, ProtocolError> {
        let delta = payload
            .trim()
            .parse::<f32>()
            .map_err(|_| ProtocolError::MalformedPayload {
                command: "ChangeArea",
                payload: payload.to_string(),
            })?;
        self.change(delta);
        Ok(self.scale)
    }

    /// Seed the scale from the controller's screen dimensions
    ///
    /// The longer side gets the aspect ratio, the shorter side 1, so the
    /// area keeps the controller's proportions without dropping below the
    /// minimum. Replaces the current scale.
    pub fn setup_screen_size(&mut self, width: f32, height: f32) {
        self.scale = aspect_scale(width, height).max(Vec2::splat(self.min));
        debug!(
            "Action area from screen {}x{} -> ({:.3}, {:.3})",
            width, height, self.scale.x, self.scale.y
        );
    }

    /// Apply a `"width,height"` `SetupScreenSize` payload
    pub fn apply_screen_size_payload(&mut self, payload: &str) -> Result<Vec2, ProtocolError> {
        let (width, height) =
            parse_screen_size(payload).ok_or_else(|| ProtocolError::MalformedPayload {
                command: "SetupScreenSize",
                payload: payload.to_string(),
            })?;
        self.setup_screen_size(width, height);
        Ok(self.scale)
    }
}

impl Default for ActionArea {
    fn default() -> Self {
        Self::new(&ActionAreaConfig::default())
    }
}

/// Aspect-ratio scale for a screen, longer side relative to the shorter
pub fn aspect_scale(width: f32, height: f32) -> Vec2 {
    if width >= height {
        Vec2::new(width / height, 1.0)
    } else {
        Vec2::new(1.0, height / width)
    }
}

/// Parse `"width,height"` into positive finite dimensions
pub fn parse_screen_size(payload: &str) -> Option<(f32, f32)> {
    let (w, h) = payload.split_once(',')?;
    let width = w.trim().parse::<f32>().ok()?;
    let height = h.trim().parse::<f32>().ok()?;

    let valid = |v: f32| v.is_finite() && v > 0.0;
    (valid(width) && valid(height)).then_some((width, height))
}

/// Encode a screen size as a `SetupScreenSize` payload
pub fn format_screen_size(width: u32, height: u32) -> String {
    format!("{},{}", width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_change_area_grow_then_clamp() {
        let mut area = ActionArea::default();
        area.apply_change_payload("0.5").unwrap();
        area.apply_change_payload("0.5").unwrap();
        assert_eq!(area.scale(), Vec2::new(2.0, 2.0));

        area.apply_change_payload("-5").unwrap();
        assert_eq!(area.scale(), Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_malformed_change_leaves_area() {
        let mut area = ActionArea::default();
        area.change(1.5);

        let result = area.apply_change_payload("not-a-number");
        assert!(matches!(
            result,
            Err(ProtocolError::MalformedPayload { command: "ChangeArea", .. })
        ));
        assert_eq!(area.scale(), Vec2::new(2.5, 2.5));
    }

    #[test]
    fn test_non_finite_delta_ignored() {
        let mut area = ActionArea::default();
        area.apply_change_payload("NaN").unwrap();
        assert_eq!(area.scale(), Vec2::ONE);
    }

    #[test]
    fn test_screen_size_landscape_and_portrait() {
        let mut area = ActionArea::default();
        area.apply_screen_size_payload("1920,1080").unwrap();
        assert!((area.scale().x - 1920.0 / 1080.0).abs() < 1e-5);
        assert_eq!(area.scale().y, 1.0);

        area.apply_screen_size_payload("720, 1280").unwrap();
        assert_eq!(area.scale().x, 1.0);
        assert!((area.scale().y - 1280.0 / 720.0).abs() < 1e-5);
    }

    #[test]
    fn test_malformed_screen_size() {
        let mut area = ActionArea::default();
        for payload in ["", "1920", "1920x1080", "a,b", "0,100", "-4,3"] {
            assert!(area.apply_screen_size_payload(payload).is_err(), "{}", payload);
        }
        assert_eq!(area.scale(), Vec2::ONE);
    }

    #[test]
    fn test_screen_size_payload_format() {
        assert_eq!(format_screen_size(1080, 2340), "1080,2340");
        assert_eq!(parse_screen_size("1080,2340"), Some((1080.0, 2340.0)));
    }

    proptest! {
        #[test]
        fn prop_scale_never_below_one(deltas in prop::collection::vec(-10.0f32..10.0, 0..50)) {
            let mut area = ActionArea::default();
            for delta in deltas {
                area.change(delta);
                prop_assert!(area.scale().x >= 1.0);
                prop_assert!(area.scale().y >= 1.0);
            }
        }
    }
}
