//! Collision geometry for movement validation and projectile impacts

use serde::{Deserialize, Serialize};

use super::tuning::{MAP_HEIGHT, MAP_WIDTH};

/// 2D vector in world units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if !len.is_finite() || len < 1e-6 {
            return None;
        }
        Some(Self::new(self.x / len, self.y / len))
    }

    /// Angle in radians, measured like `atan2(y, x)`
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    pub fn from_angle(angle: f32) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn scale(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    pub fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// Axis-aligned rectangle, anchored at its top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    /// Grow the rectangle by `margin` on every side
    pub fn expand(&self, margin: f32) -> Self {
        Self::new(
            self.x - margin,
            self.y - margin,
            self.w + margin * 2.0,
            self.h + margin * 2.0,
        )
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x, self.y),
            Vec2::new(self.x + self.w, self.y),
            Vec2::new(self.x + self.w, self.y + self.h),
            Vec2::new(self.x, self.y + self.h),
        ]
    }
}

/// Rectangle rotated around its center, used for rail projectiles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedRect {
    pub center: Vec2,
    /// Rotation in radians
    pub angle: f32,
    pub half_length: f32,
    pub half_width: f32,
}

/// Collision tests shared by movement and projectile resolution
pub struct CollisionSystem;

impl CollisionSystem {
    /// Strict overlap: rectangles that merely touch do not collide
    pub fn aabb_overlap(a: &Rect, b: &Rect) -> bool {
        a.x < b.x + b.w && a.x + a.w > b.x && a.y < b.y + b.h && a.y + a.h > b.y
    }

    pub fn point_in_rect(point: Vec2, rect: &Rect) -> bool {
        point.x >= rect.x
            && point.x <= rect.x + rect.w
            && point.y >= rect.y
            && point.y <= rect.y + rect.h
    }

    /// Whether any wall overlaps the box
    pub fn hits_any_wall(rect: &Rect, walls: &[Rect]) -> bool {
        walls.iter().any(|wall| Self::aabb_overlap(rect, wall))
    }

    pub fn point_in_any_wall(point: Vec2, walls: &[Rect]) -> bool {
        walls.iter().any(|wall| Self::point_in_rect(point, wall))
    }

    /// Box lies fully inside the map
    pub fn rect_in_bounds(rect: &Rect) -> bool {
        rect.x >= 0.0
            && rect.y >= 0.0
            && rect.x + rect.w <= MAP_WIDTH
            && rect.y + rect.h <= MAP_HEIGHT
    }

    pub fn point_in_bounds(point: Vec2) -> bool {
        point.x >= 0.0 && point.x <= MAP_WIDTH && point.y >= 0.0 && point.y <= MAP_HEIGHT
    }

    /// Rotate a world point into the local frame of an oriented rectangle
    fn to_local(point: Vec2, rail: &OrientedRect) -> Vec2 {
        let d = point.sub(rail.center);
        let (sin, cos) = rail.angle.sin_cos();
        Vec2::new(d.x * cos + d.y * sin, -d.x * sin + d.y * cos)
    }

    /// Oriented rectangle against an axis-aligned box.
    ///
    /// The box corners are rotated into the rail's frame and tested against its
    /// half extents. A rail whose center already sits inside the box also counts,
    /// which covers rails shorter than the box they pass through.
    pub fn oriented_rect_hits_aabb(rail: &OrientedRect, target: &Rect) -> bool {
        if Self::point_in_rect(rail.center, target) {
            return true;
        }

        target.corners().iter().any(|&corner| {
            let local = Self::to_local(corner, rail);
            local.x.abs() <= rail.half_length && local.y.abs() <= rail.half_width
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_overlap_excludes_touching_edges() {
        let a = Rect::new(0.0, 0.0, 20.0, 20.0);
        let touching = Rect::new(20.0, 0.0, 20.0, 20.0);
        let overlapping = Rect::new(19.0, 19.0, 20.0, 20.0);

        assert!(!CollisionSystem::aabb_overlap(&a, &touching));
        assert!(CollisionSystem::aabb_overlap(&a, &overlapping));
        assert!(CollisionSystem::aabb_overlap(&overlapping, &a));
    }

    #[test]
    fn test_point_in_rect_includes_edges() {
        let wall = Rect::new(110.0, 90.0, 40.0, 40.0);
        assert!(CollisionSystem::point_in_rect(Vec2::new(110.0, 90.0), &wall));
        assert!(CollisionSystem::point_in_rect(Vec2::new(130.0, 100.0), &wall));
        assert!(!CollisionSystem::point_in_rect(Vec2::new(109.9, 100.0), &wall));
    }

    #[test]
    fn test_bounds() {
        assert!(CollisionSystem::rect_in_bounds(&Rect::new(0.0, 0.0, 20.0, 20.0)));
        assert!(!CollisionSystem::rect_in_bounds(&Rect::new(-1.0, 0.0, 20.0, 20.0)));
        assert!(!CollisionSystem::rect_in_bounds(&Rect::new(
            MAP_WIDTH - 19.0,
            0.0,
            20.0,
            20.0
        )));
        assert!(!CollisionSystem::point_in_bounds(Vec2::new(10.0, MAP_HEIGHT + 0.5)));
    }

    #[test]
    fn test_rail_hits_box_corner() {
        // Horizontal rail whose tip reaches the top-left corner of the box
        let rail = OrientedRect {
            center: Vec2::new(95.0, 100.0),
            angle: 0.0,
            half_length: 10.0,
            half_width: 4.0,
        };
        let target = Rect::new(102.0, 98.0, 20.0, 20.0);
        assert!(CollisionSystem::oriented_rect_hits_aabb(&rail, &target));

        let far = Rect::new(130.0, 98.0, 20.0, 20.0);
        assert!(!CollisionSystem::oriented_rect_hits_aabb(&rail, &far));
    }

    #[test]
    fn test_rail_rotation_matters() {
        let target = Rect::new(100.0, 108.0, 20.0, 20.0);

        // Pointing along +x the rail stays above the box
        let flat = OrientedRect {
            center: Vec2::new(100.0, 100.0),
            angle: 0.0,
            half_length: 10.0,
            half_width: 4.0,
        };
        assert!(!CollisionSystem::oriented_rect_hits_aabb(&flat, &target));

        // Pointing along +y it reaches down into the box corner
        let vertical = OrientedRect {
            angle: std::f32::consts::FRAC_PI_2,
            ..flat
        };
        assert!(CollisionSystem::oriented_rect_hits_aabb(&vertical, &target));
    }

    #[test]
    fn test_rail_inside_large_box() {
        let rail = OrientedRect {
            center: Vec2::new(110.0, 110.0),
            angle: 0.3,
            half_length: 10.0,
            half_width: 4.0,
        };
        let target = Rect::new(98.0, 98.0, 24.0, 24.0);
        assert!(CollisionSystem::oriented_rect_hits_aabb(&rail, &target));
    }

    #[test]
    fn test_normalized_rejects_zero() {
        assert!(Vec2::ZERO.normalized().is_none());
        assert!(Vec2::new(f32::NAN, 1.0).normalized().is_none());
        let unit = Vec2::new(3.0, 4.0).normalized().unwrap();
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }
}
