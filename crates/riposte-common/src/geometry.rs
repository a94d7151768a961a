//! 3D geometry used by reach and hit resolution.
//!
//! Coordinates follow the usual voxel-world convention: `+Y` is up, north is
//! `-Z`, east is `+X`. Distances are in blocks.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Tolerance below which a direction component counts as zero.
const AXIS_EPSILON: f32 = 1.0e-7;

/// One of the six axis-aligned facings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// `-Y`
    Down,
    /// `+Y`
    Up,
    /// `-Z`
    North,
    /// `+Z`
    South,
    /// `-X`
    West,
    /// `+X`
    East,
}

impl Direction {
    /// All directions, in lookup order.
    pub const ALL: [Self; 6] = [
        Self::Down,
        Self::Up,
        Self::North,
        Self::South,
        Self::West,
        Self::East,
    ];

    /// Unit normal of this direction.
    #[must_use]
    pub const fn normal(self) -> Vec3 {
        match self {
            Self::Down => Vec3::NEG_Y,
            Self::Up => Vec3::Y,
            Self::North => Vec3::NEG_Z,
            Self::South => Vec3::Z,
            Self::West => Vec3::NEG_X,
            Self::East => Vec3::X,
        }
    }

    /// Returns the direction whose normal best matches `v`.
    ///
    /// Ties go to the earlier entry of [`Direction::ALL`], so a zero vector
    /// yields `Down`.
    #[must_use]
    pub fn approximate_nearest(v: Vec3) -> Self {
        let mut best = Self::Down;
        let mut best_dot = f32::NEG_INFINITY;
        for dir in Self::ALL {
            let dot = dir.normal().dot(v);
            if dot > best_dot {
                best = dir;
                best_dot = dot;
            }
        }
        best
    }

    /// Face crossed when entering a cell along `axis` moving in `sign`.
    #[must_use]
    pub fn entry_face(axis: usize, positive_step: bool) -> Self {
        match (axis, positive_step) {
            (0, true) => Self::West,
            (0, false) => Self::East,
            (1, true) => Self::Down,
            (1, false) => Self::Up,
            (2, true) => Self::North,
            (2, false) => Self::South,
            _ => unreachable!("axis index out of range: {axis}"),
        }
    }
}

/// Builds a unit view vector from pitch and yaw in degrees.
///
/// Yaw 0 looks south (`+Z`), yaw 90 looks west; positive pitch looks down.
#[must_use]
pub fn view_vector(pitch_degrees: f32, yaw_degrees: f32) -> Vec3 {
    let pitch = pitch_degrees.to_radians();
    let yaw = yaw_degrees.to_radians();
    let cos_pitch = pitch.cos();
    Vec3::new(-yaw.sin() * cos_pitch, -pitch.sin(), yaw.cos() * cos_pitch)
}

/// Projects `v` onto the horizontal plane and normalizes it.
///
/// Returns zero for vertical or zero vectors.
#[must_use]
pub fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z).normalize_or_zero()
}

/// Result of clipping a segment against a box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipHit {
    /// Entry point on the box surface.
    pub point: Vec3,
    /// Box face the segment entered through.
    pub face: Direction,
}

/// Axis-aligned bounding box in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Aabb {
    /// Creates a box from two corners in any order.
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box from its center and half-extents.
    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Creates an entity-style box standing on `feet`.
    #[must_use]
    pub fn from_feet(feet: Vec3, width: f32, height: f32) -> Self {
        let half = width / 2.0;
        Self::new(
            Vec3::new(feet.x - half, feet.y, feet.z - half),
            Vec3::new(feet.x + half, feet.y + height, feet.z + half),
        )
    }

    /// Grows the box by `margin` on every side.
    #[must_use]
    pub fn inflate(&self, margin: f32) -> Self {
        let m = Vec3::splat(margin);
        Self::new(self.min - m, self.max + m)
    }

    /// Checks if this box overlaps another.
    #[must_use]
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    /// Checks if a point lies inside the box (boundary included).
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Squared distance from `point` to the closest point of the box.
    ///
    /// Zero when the point is inside.
    #[must_use]
    pub fn distance_to_sqr(&self, point: Vec3) -> f32 {
        let below = self.min - point;
        let above = point - self.max;
        below.max(above).max(Vec3::ZERO).length_squared()
    }

    /// Distance from `point` to the closest point of the box.
    #[must_use]
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.distance_to_sqr(point).sqrt()
    }

    /// Clips the segment `from → to` against the box.
    ///
    /// Returns the entry point and face. A segment that starts inside the
    /// box has no entry and yields `None`; check [`Aabb::contains`] first.
    #[must_use]
    pub fn clip(&self, from: Vec3, to: Vec3) -> Option<ClipHit> {
        let delta = to - from;
        let mut t_enter = 0.0f32;
        let mut t_exit = 1.0f32;
        let mut face = None;

        for axis in 0..3 {
            let origin = from[axis];
            let dir = delta[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if dir.abs() < AXIS_EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t_near = (lo - origin) * inv;
            let mut t_far = (hi - origin) * inv;
            if t_near > t_far {
                std::mem::swap(&mut t_near, &mut t_far);
            }
            if t_near > t_enter {
                t_enter = t_near;
                face = Some(Direction::entry_face(axis, dir > 0.0));
            }
            t_exit = t_exit.min(t_far);
            if t_enter > t_exit {
                return None;
            }
        }

        face.map(|face| ClipHit {
            point: from + delta * t_enter,
            face,
        })
    }
}
