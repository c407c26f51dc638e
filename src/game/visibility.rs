//! Vision cone and line-of-sight predicates.
//!
//! Pure functions of positions, facing and walls: the same inputs always give
//! the same answer, whether evaluated for rendering or for snapshot filtering.

use std::f32::consts::{PI, TAU};

use super::physics::{CollisionSystem, Rect, Vec2};
use super::tuning::{CONE_ANGLE, CONE_LENGTH, LOS_STEP};

/// Vision cone shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisionCone {
    pub length: f32,
    /// Full angular width in radians
    pub angle: f32,
}

impl Default for VisionCone {
    fn default() -> Self {
        Self {
            length: CONE_LENGTH,
            angle: CONE_ANGLE,
        }
    }
}

impl VisionCone {
    /// Same cone with its reach multiplied (torch power-up)
    pub fn lengthened(self, multiplier: f32) -> Self {
        Self {
            length: self.length * multiplier,
            ..self
        }
    }
}

/// Absolute difference between two angles, folded into [0, PI]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    ((b - a + PI).rem_euclid(TAU) - PI).abs()
}

/// Distance and angular test against the viewer's facing
pub fn in_cone(viewer: Vec2, facing: Vec2, target: Vec2, cone: &VisionCone) -> bool {
    let to_target = target.sub(viewer);
    let distance = to_target.length();
    if distance >= cone.length {
        return false;
    }
    if distance < 1e-6 {
        return true;
    }
    angle_diff(facing.angle(), to_target.angle()) < cone.angle / 2.0
}

/// Ray-march from viewer to target; blocked if any sample lands in a wall
pub fn line_of_sight(viewer: Vec2, target: Vec2, walls: &[Rect]) -> bool {
    let delta = target.sub(viewer);
    let distance = delta.length();
    let steps = (distance / LOS_STEP).ceil() as u32;

    (0..=steps).all(|i| {
        let t = if steps == 0 { 0.0 } else { i as f32 / steps as f32 };
        let sample = viewer.add(delta.scale(t));
        !CollisionSystem::point_in_any_wall(sample, walls)
    })
}

/// A point is illuminated when it is inside the cone and not occluded
pub fn is_illuminated(
    viewer: Vec2,
    facing: Vec2,
    target: Vec2,
    cone: &VisionCone,
    walls: &[Rect],
) -> bool {
    in_cone(viewer, facing, target, cone) && line_of_sight(viewer, target, walls)
}
