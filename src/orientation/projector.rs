//! Orientation → cursor projection
//!
//! Turns a controller attitude into a 2D cursor-space point by casting a ray
//! and intersecting it with a reference plane.
//!
//! # Geometry
//!
//! ```text
//!              ray_origin = ray_axis * ray_offset
//!                   │
//!                   │  direction = orientation * ray_direction
//!                   ↓
//!   ───────────────●──────────────  reference plane (normal, point)
//!                 hit
//!
//!   t   = (point - origin) · n / (direction · n)
//!   hit = origin + direction * t          (only when t > 0)
//!   2D  = ((hit - point) · u, (hit - point) · v)
//! ```
//!
//! A ray parallel to the plane, pointing away from it, or longer than the
//! configured bound produces no point. Callers keep their previous value.
//!
//! In dual mode two independent projections are combined: the horizontal
//! plane supplies x, the vertical plane supplies y, each with a configurable
//! sign.

use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Denominators below this are treated as a ray parallel to the plane
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// Projection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    /// One plane supplies both components
    #[default]
    Single,
    /// Horizontal plane supplies x, vertical plane supplies y
    Dual,
}

impl std::fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Dual => write!(f, "dual"),
        }
    }
}

impl std::str::FromStr for ProjectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" | "one" => Ok(Self::Single),
            "dual" | "two" => Ok(Self::Dual),
            _ => Err(format!("Unknown projection mode: {}", s)),
        }
    }
}

/// Configuration of one ray/plane pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaneConfig {
    /// Plane normal (normalized on use)
    pub normal: [f32; 3],

    /// Any point on the plane; also the 2D origin
    #[serde(default)]
    pub point: [f32; 3],

    /// Axis along which the ray origin is offset
    pub ray_axis: [f32; 3],

    /// Distance of the ray origin along `ray_axis`
    pub ray_offset: f32,

    /// Canonical ray direction before rotation
    pub ray_direction: [f32; 3],

    /// Maximum ray length accepted as a hit
    #[serde(default)]
    pub max_distance: Option<f32>,

    /// In-plane axis mapped to 2D x
    #[serde(default = "default_u_axis")]
    pub u_axis: [f32; 3],

    /// In-plane axis mapped to 2D y
    #[serde(default = "default_v_axis")]
    pub v_axis: [f32; 3],
}

fn default_u_axis() -> [f32; 3] {
    [1.0, 0.0, 0.0]
}
fn default_v_axis() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

impl PlaneConfig {
    /// Vertical plane facing the viewer, ray cast forward from behind it
    pub fn facing() -> Self {
        Self {
            normal: [0.0, 0.0, -1.0],
            point: [0.0; 3],
            ray_axis: [0.0, 0.0, -1.0],
            ray_offset: 15.0,
            ray_direction: [0.0, 0.0, 1.0],
            max_distance: None,
            u_axis: default_u_axis(),
            v_axis: default_v_axis(),
        }
    }

    /// Horizontal floor plane, ray cast downward from above it
    pub fn floor() -> Self {
        Self {
            normal: [0.0, 1.0, 0.0],
            point: [0.0; 3],
            ray_axis: [0.0, 1.0, 0.0],
            ray_offset: 16.0,
            ray_direction: [0.0, -1.0, 0.0],
            max_distance: None,
            u_axis: [1.0, 0.0, 0.0],
            v_axis: [0.0, 0.0, -1.0],
        }
    }

    /// Check vectors are usable
    pub fn validate(&self) -> Result<(), String> {
        let nonzero = |name: &str, v: [f32; 3]| {
            let v = Vec3::from(v);
            if !v.is_finite() || v.length_squared() <= f32::EPSILON {
                Err(format!("{} must be a finite non-zero vector", name))
            } else {
                Ok(())
            }
        };
        nonzero("normal", self.normal)?;
        nonzero("ray_axis", self.ray_axis)?;
        nonzero("ray_direction", self.ray_direction)?;
        nonzero("u_axis", self.u_axis)?;
        nonzero("v_axis", self.v_axis)?;

        if !self.ray_offset.is_finite() {
            return Err("ray_offset must be finite".to_string());
        }
        if let Some(max) = self.max_distance {
            if !(max.is_finite() && max > 0.0) {
                return Err(format!("max_distance must be positive, got {}", max));
            }
        }
        Ok(())
    }
}

impl Default for PlaneConfig {
    fn default() -> Self {
        Self::facing()
    }
}

/// Projection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Single or dual plane
    #[serde(default)]
    pub mode: ProjectionMode,

    /// Plane used in single mode
    #[serde(default)]
    pub plane: PlaneConfig,

    /// Plane supplying x in dual mode
    #[serde(default = "PlaneConfig::floor")]
    pub horizontal: PlaneConfig,

    /// Plane supplying y in dual mode
    #[serde(default = "PlaneConfig::facing")]
    pub vertical: PlaneConfig,

    /// Sign applied to x in dual mode
    #[serde(default = "default_sign")]
    pub x_sign: f32,

    /// Sign applied to y in dual mode
    #[serde(default = "default_sign")]
    pub y_sign: f32,
}

fn default_sign() -> f32 {
    1.0
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            mode: ProjectionMode::Single,
            plane: PlaneConfig::facing(),
            horizontal: PlaneConfig::floor(),
            vertical: PlaneConfig::facing(),
            x_sign: default_sign(),
            y_sign: default_sign(),
        }
    }
}

impl ProjectionConfig {
    /// Check the planes used by the selected mode
    pub fn validate(&self) -> Result<(), String> {
        match self.mode {
            ProjectionMode::Single => self.plane.validate().map_err(|e| format!("plane: {}", e)),
            ProjectionMode::Dual => {
                self.horizontal
                    .validate()
                    .map_err(|e| format!("horizontal: {}", e))?;
                self.vertical
                    .validate()
                    .map_err(|e| format!("vertical: {}", e))?;
                for (name, sign) in [("x_sign", self.x_sign), ("y_sign", self.y_sign)] {
                    if !sign.is_finite() || sign == 0.0 {
                        return Err(format!("{} must be finite and non-zero", name));
                    }
                }
                Ok(())
            }
        }
    }
}

/// Half-line from an origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Unit direction
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray, normalizing the direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Point at distance `t` along the ray
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Infinite plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    /// Point on the plane
    pub point: Vec3,
}

impl Plane {
    /// Create a plane, normalizing the normal
    pub fn new(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal: normal.normalize(),
            point,
        }
    }

    /// Distance along `ray` to the plane, if the ray hits it in front of its origin
    pub fn raycast(&self, ray: &Ray) -> Option<f32> {
        let denom = ray.direction.dot(self.normal);
        if denom.abs() < PARALLEL_EPSILON {
            return None;
        }

        let t = (self.point - ray.origin).dot(self.normal) / denom;
        (t > 0.0).then_some(t)
    }
}

/// One ray/plane projection
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneProjection {
    plane: Plane,
    ray_origin: Vec3,
    ray_direction: Vec3,
    max_distance: Option<f32>,
    u_axis: Vec3,
    v_axis: Vec3,
}

impl PlaneProjection {
    /// Build from configuration
    pub fn new(config: &PlaneConfig) -> Self {
        Self {
            plane: Plane::new(config.normal.into(), config.point.into()),
            ray_origin: Vec3::from(config.ray_axis).normalize() * config.ray_offset,
            ray_direction: Vec3::from(config.ray_direction).normalize(),
            max_distance: config.max_distance,
            u_axis: Vec3::from(config.u_axis).normalize(),
            v_axis: Vec3::from(config.v_axis).normalize(),
        }
    }

    /// Ray cast for the given attitude
    pub fn ray(&self, orientation: Quat) -> Ray {
        Ray::new(self.ray_origin, orientation * self.ray_direction)
    }

    /// Reference plane
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Project an attitude onto the plane
    pub fn project(&self, orientation: Quat) -> Option<Vec2> {
        let ray = self.ray(orientation);
        let t = self.plane.raycast(&ray)?;

        if self.max_distance.is_some_and(|max| t > max) {
            return None;
        }

        let local = ray.point_at(t) - self.plane.point;
        Some(Vec2::new(local.dot(self.u_axis), local.dot(self.v_axis)))
    }
}

/// Projector for the configured mode
#[derive(Debug, Clone, PartialEq)]
pub enum OrientationProjector {
    /// One plane, both components
    Single(PlaneProjection),

    /// Two planes, one component each
    Dual {
        /// Supplies x
        horizontal: PlaneProjection,
        /// Supplies y
        vertical: PlaneProjection,
        /// Sign applied to x
        x_sign: f32,
        /// Sign applied to y
        y_sign: f32,
    },
}

impl OrientationProjector {
    /// Build from configuration
    pub fn new(config: &ProjectionConfig) -> Self {
        match config.mode {
            ProjectionMode::Single => Self::Single(PlaneProjection::new(&config.plane)),
            ProjectionMode::Dual => Self::Dual {
                horizontal: PlaneProjection::new(&config.horizontal),
                vertical: PlaneProjection::new(&config.vertical),
                x_sign: config.x_sign,
                y_sign: config.y_sign,
            },
        }
    }

    /// Project an attitude into cursor space
    ///
    /// Pure: the same attitude always yields the same result. `None` means
    /// no intersection and the caller keeps its previous point.
    pub fn project(&self, orientation: Quat) -> Option<Vec2> {
        match self {
            Self::Single(projection) => projection.project(orientation),
            Self::Dual {
                horizontal,
                vertical,
                x_sign,
                y_sign,
            } => {
                let x = horizontal.project(orientation)?.x;
                let y = vertical.project(orientation)?.y;
                Some(Vec2::new(x * x_sign, y * y_sign))
            }
        }
    }

    /// Projection mode
    pub fn mode(&self) -> ProjectionMode {
        match self {
            Self::Single(_) => ProjectionMode::Single,
            Self::Dual { .. } => ProjectionMode::Dual,
        }
    }
}

impl Default for OrientationProjector {
    fn default() -> Self {
        Self::new(&ProjectionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_6, PI, TAU};

    fn approx(a: Vec2, b: Vec2) -> bool {
        a.abs_diff_eq(b, 1e-4)
    }

    #[test]
    fn test_identity_hits_plane_origin() {
        let projector = OrientationProjector::default();
        let point = projector.project(Quat::IDENTITY).unwrap();
        assert!(approx(point, Vec2::ZERO), "{:?}", point);
    }

    #[test]
    fn test_yaw_moves_x() {
        let projector = OrientationProjector::default();
        // 30° about Y tilts the forward ray toward +x
        let point = projector.project(Quat::from_rotation_y(FRAC_PI_6)).unwrap();
        let expected = 15.0 * FRAC_PI_6.tan();
        assert!((point.x - expected).abs() < 1e-3, "{:?}", point);
        assert!(point.y.abs() < 1e-4);
    }

    #[test]
    fn test_full_turn_about_ray_axis_is_periodic() {
        let projector = OrientationProjector::default();
        let base = Quat::from_rotation_y(0.3) * Quat::from_rotation_x(-0.2);
        let Some(before) = projector.project(base) else {
            panic!("base orientation should hit the plane");
        };

        let ray_axis = base * Vec3::Z;
        let turned = Quat::from_axis_angle(ray_axis, TAU) * base;
        let after = projector.project(turned).unwrap();

        assert!(approx(before, after), "{:?} vs {:?}", before, after);
    }

    #[test]
    fn test_parallel_ray_yields_no_point() {
        let projector = OrientationProjector::default();
        // Forward rotated 90° about Y lies in the plane's direction
        assert_eq!(projector.project(Quat::from_rotation_y(FRAC_PI_2)), None);
    }

    #[test]
    fn test_diverging_ray_yields_no_point() {
        let projector = OrientationProjector::default();
        assert_eq!(projector.project(Quat::from_rotation_y(PI)), None);
    }

    #[test]
    fn test_max_distance_bound() {
        let mut config = ProjectionConfig::default();
        config.plane.max_distance = Some(20.0);
        let projector = OrientationProjector::new(&config);

        // t = 15 / cos(angle): 30° → 17.3 (hit), 60° → 30 (miss)
        assert!(projector.project(Quat::from_rotation_y(FRAC_PI_6)).is_some());
        assert_eq!(projector.project(Quat::from_rotation_y(PI / 3.0)), None);
    }

    #[test]
    fn test_floor_plane_identity_and_yaw() {
        let config = ProjectionConfig {
            plane: PlaneConfig::floor(),
            ..Default::default()
        };
        let projector = OrientationProjector::new(&config);

        // Straight down from 16 units up lands on the origin; yaw spins the
        // down ray in place so the point does not move.
        let identity = projector.project(Quat::IDENTITY).unwrap();
        let yawed = projector.project(Quat::from_rotation_y(FRAC_PI_6)).unwrap();
        assert!(approx(identity, Vec2::ZERO));
        assert!(approx(yawed, Vec2::ZERO));

        // Rolling about Z swings the down ray along x
        let rolled = projector.project(Quat::from_rotation_z(0.2)).unwrap();
        assert!((rolled.x - 16.0 * 0.2f32.tan()).abs() < 1e-3, "{:?}", rolled);
    }

    #[test]
    fn test_dual_mode_combines_components_with_signs() {
        let config = ProjectionConfig {
            mode: ProjectionMode::Dual,
            x_sign: -1.0,
            ..Default::default()
        };
        let projector = OrientationProjector::new(&config);
        let single_floor = PlaneProjection::new(&PlaneConfig::floor());
        let single_facing = PlaneProjection::new(&PlaneConfig::facing());

        let q = Quat::from_rotation_z(0.1) * Quat::from_rotation_x(-0.15);
        let dual = projector.project(q).unwrap();

        assert!((dual.x + single_floor.project(q).unwrap().x).abs() < 1e-5);
        assert!((dual.y - single_facing.project(q).unwrap().y).abs() < 1e-5);
    }

    #[test]
    fn test_dual_mode_misses_when_either_plane_misses() {
        let config = ProjectionConfig {
            mode: ProjectionMode::Dual,
            ..Default::default()
        };
        let projector = OrientationProjector::new(&config);
        // Pointing straight up never reaches the floor
        assert_eq!(projector.project(Quat::from_rotation_x(PI)), None);
    }

    #[test]
    fn test_projection_is_reproducible() {
        let projector = OrientationProjector::default();
        let q = Quat::from_euler(glam::EulerRot::YXZ, 0.21, -0.13, 0.05);
        assert_eq!(projector.project(q), projector.project(q));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("dual".parse::<ProjectionMode>().unwrap(), ProjectionMode::Dual);
        assert_eq!("Single".parse::<ProjectionMode>().unwrap(), ProjectionMode::Single);
        assert!("triple".parse::<ProjectionMode>().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_normal() {
        let mut config = ProjectionConfig::default();
        config.plane.normal = [0.0; 3];
        assert!(config.validate().is_err());

        let mut config = ProjectionConfig {
            mode: ProjectionMode::Dual,
            ..Default::default()
        };
        config.y_sign = 0.0;
        assert!(config.validate().is_err());
    }
}
