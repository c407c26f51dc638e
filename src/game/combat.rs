//! Combat system - weapons, projectiles, damage

use serde::{Deserialize, Serialize};

use super::physics::{CollisionSystem, OrientedRect, Rect, Vec2};
use super::tuning::MAX_HP;
use super::PlayerId;

/// Weapons a player can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponKind {
    /// Default weapon every player spawns with
    Basic,
    /// Three-pellet fan
    Shotgun,
    /// Long range rail
    Sniper,
}

impl Default for WeaponKind {
    fn default() -> Self {
        Self::Basic
    }
}

/// Projectile collision shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BulletShape {
    Point,
    Rail { half_length: f32, half_width: f32 },
}

/// Firing rules for one weapon
#[derive(Debug, Clone, Copy)]
pub struct WeaponStats {
    /// Minimum time between accepted shots (ms)
    pub cooldown_ms: u64,
    pub pellets: u32,
    /// Angle between neighbouring pellets (radians)
    pub spread: f32,
    pub damage: u8,
    /// Damage when the hit lands within `point_blank_range` of travel
    pub point_blank_damage: Option<u8>,
    pub point_blank_range: f32,
    /// Distance covered per tick
    pub projectile_speed: f32,
    pub max_range: f32,
    pub shape: BulletShape,
}

impl WeaponStats {
    pub fn for_kind(kind: WeaponKind) -> Self {
        match kind {
            WeaponKind::Basic => Self {
                cooldown_ms: 300,
                pellets: 1,
                spread: 0.0,
                damage: 1,
                point_blank_damage: Some(3),
                point_blank_range: 40.0,
                projectile_speed: 10.0,
                max_range: 600.0,
                shape: BulletShape::Point,
            },
            WeaponKind::Shotgun => Self {
                cooldown_ms: 600,
                pellets: 3,
                spread: 0.2,
                damage: 1,
                point_blank_damage: None,
                point_blank_range: 0.0,
                projectile_speed: 9.0,
                max_range: 320.0,
                shape: BulletShape::Point,
            },
            WeaponKind::Sniper => Self {
                cooldown_ms: 1500,
                pellets: 1,
                spread: 0.0,
                damage: 3,
                point_blank_damage: None,
                point_blank_range: 0.0,
                projectile_speed: 20.0,
                max_range: 1600.0,
                shape: BulletShape::Rail {
                    half_length: 10.0,
                    half_width: 4.0,
                },
            },
        }
    }
}

/// Active projectile in the world
#[derive(Debug, Clone)]
pub struct Bullet {
    pub id: u64,
    pub owner: PlayerId,
    pub weapon: WeaponKind,
    pub position: Vec2,
    /// Displacement per tick
    pub velocity: Vec2,
    pub damage: u8,
    pub point_blank_damage: Option<u8>,
    pub point_blank_range: f32,
    pub max_range: f32,
    pub traveled: f32,
    pub shape: BulletShape,
}

impl Bullet {
    /// Advance one tick, accumulating travelled distance
    pub fn advance(&mut self) {
        self.position = self.position.add(self.velocity);
        self.traveled += self.velocity.length();
    }

    pub fn out_of_range(&self) -> bool {
        self.traveled >= self.max_range
    }

    /// Whether the projectile touches the given (already enlarged) hitbox
    pub fn hits(&self, hitbox: &Rect) -> bool {
        match self.shape {
            BulletShape::Point => CollisionSystem::point_in_rect(self.position, hitbox),
            BulletShape::Rail {
                half_length,
                half_width,
            } => {
                let rail = OrientedRect {
                    center: self.position,
                    angle: self.velocity.angle(),
                    half_length,
                    half_width,
                };
                CollisionSystem::oriented_rect_hits_aabb(&rail, hitbox)
            }
        }
    }

    /// Damage dealt if this bullet hits on the current tick
    pub fn impact_damage(&self) -> u8 {
        match self.point_blank_damage {
            Some(close) if self.traveled < self.point_blank_range => close,
            _ => self.damage,
        }
    }
}

/// Combat system for firing and damage resolution
pub struct CombatSystem;

impl CombatSystem {
    /// Cooldown gate: the elapsed time must exceed the weapon cooldown
    pub fn can_fire(last_shot_ms: Option<u64>, now_ms: u64, stats: &WeaponStats) -> bool {
        match last_shot_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) > stats.cooldown_ms,
        }
    }

    /// Build the pellets for one accepted shot.
    ///
    /// `direction` must already be normalized. Multi-pellet weapons fan out
    /// symmetrically around it, one `spread` step per pellet index.
    pub fn fire(
        owner: PlayerId,
        kind: WeaponKind,
        origin: Vec2,
        direction: Vec2,
        next_bullet_id: &mut u64,
    ) -> Vec<Bullet> {
        let stats = WeaponStats::for_kind(kind);
        let base_angle = direction.angle();
        let middle = (stats.pellets as f32 - 1.0) / 2.0;

        (0..stats.pellets)
            .map(|pellet| {
                let offset = (pellet as f32 - middle) * stats.spread;
                let velocity =
                    Vec2::from_angle(base_angle + offset).scale(stats.projectile_speed);
                let id = *next_bullet_id;
                *next_bullet_id = next_bullet_id.wrapping_add(1);

                Bullet {
                    id,
                    owner,
                    weapon: kind,
                    position: origin,
                    velocity,
                    damage: stats.damage,
                    point_blank_damage: stats.point_blank_damage,
                    point_blank_range: stats.point_blank_range,
                    max_range: stats.max_range,
                    traveled: 0.0,
                    shape: stats.shape,
                }
            })
            .collect()
    }

    /// Apply damage to hp, returns (new_hp, is_dead)
    pub fn apply_damage(current_hp: u8, damage: u8) -> (u8, bool) {
        let new_hp = current_hp.saturating_sub(damage).min(MAX_HP);
        (new_hp, new_hp == 0)
    }
}

/// Hit result from projectile resolution
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub bullet_id: u64,
    pub shooter: PlayerId,
    pub target: PlayerId,
    pub damage: u8,
    pub target_killed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_requires_strictly_more_than_interval() {
        let stats = WeaponStats::for_kind(WeaponKind::Basic);
        assert!(CombatSystem::can_fire(None, 0, &stats));
        assert!(!CombatSystem::can_fire(Some(1_000), 1_300, &stats));
        assert!(CombatSystem::can_fire(Some(1_000), 1_301, &stats));
    }

    #[test]
    fn test_shotgun_fans_three_pellets() {
        let mut next_id = 0;
        let pellets = CombatSystem::fire(
            0,
            WeaponKind::Shotgun,
            Vec2::new(100.0, 100.0),
            Vec2::new(1.0, 0.0),
            &mut next_id,
        );

        assert_eq!(pellets.len(), 3);
        assert_eq!(next_id, 3);
        let angles: Vec<f32> = pellets.iter().map(|b| b.velocity.angle()).collect();
        assert!((angles[0] + 0.2).abs() < 1e-5);
        assert!(angles[1].abs() < 1e-5);
        assert!((angles[2] - 0.2).abs() < 1e-5);
        for pellet in &pellets {
            assert!((pellet.velocity.length() - 9.0).abs() < 1e-4);
            assert_eq!(pellet.position, Vec2::new(100.0, 100.0));
        }
    }

    #[test]
    fn test_sniper_is_a_rail() {
        let mut next_id = 10;
        let shot = CombatSystem::fire(
            1,
            WeaponKind::Sniper,
            Vec2::ZERO,
            Vec2::new(0.0, 1.0),
            &mut next_id,
        );
        assert_eq!(shot.len(), 1);
        assert_eq!(shot[0].id, 10);
        assert_eq!(shot[0].damage, 3);
        assert!(matches!(shot[0].shape, BulletShape::Rail { .. }));
    }

    #[test]
    fn test_bullet_range_accumulates() {
        let mut next_id = 0;
        let mut bullet = CombatSystem::fire(
            0,
            WeaponKind::Shotgun,
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            &mut next_id,
        )
        .remove(1);

        let mut ticks = 0;
        while !bullet.out_of_range() {
            bullet.advance();
            ticks += 1;
        }
        // 320 / 9 rounded up
        assert_eq!(ticks, 36);
    }

    #[test]
    fn test_point_blank_escalation() {
        let mut next_id = 0;
        let mut bullet = CombatSystem::fire(
            0,
            WeaponKind::Basic,
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            &mut next_id,
        )
        .remove(0);

        bullet.advance();
        assert_eq!(bullet.impact_damage(), 3);
        for _ in 0..4 {
            bullet.advance();
        }
        assert_eq!(bullet.impact_damage(), 1);
    }

    #[test]
    fn test_apply_damage_clamps_at_zero() {
        assert_eq!(CombatSystem::apply_damage(3, 1), (2, false));
        assert_eq!(CombatSystem::apply_damage(1, 3), (0, true));
        assert_eq!(CombatSystem::apply_damage(0, 1), (0, true));
    }
}
