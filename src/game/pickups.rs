//! Map pickups: weapons and timed power-ups

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::combat::WeaponKind;
use super::physics::{CollisionSystem, Rect, Vec2};
use super::tuning::{
    BORDER_THICKNESS, MAP_HEIGHT, MAP_WIDTH, PICKUP_PLACEMENT_ATTEMPTS, PICKUP_RADIUS,
    PICKUP_WALL_MARGIN,
};
use super::PlayerId;

/// Timed effects granted by power-up pickups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerupKind {
    /// Larger movement step
    Speed,
    /// Longer vision cone
    Torch,
    /// See opponents through darkness and walls
    Nightvision,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeaponPickup {
    pub id: u64,
    pub kind: WeaponKind,
    /// Center of the pickup
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerupPickup {
    pub id: u64,
    pub kind: PowerupKind,
    pub position: Vec2,
}

/// Power-up currently applied to a player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivePowerup {
    pub player: PlayerId,
    pub kind: PowerupKind,
    pub expires_at: u64,
}

/// Weapons that can appear on the map (basic is never dropped)
pub fn random_weapon_kind<R: Rng>(rng: &mut R) -> WeaponKind {
    if rng.gen_bool(0.5) {
        WeaponKind::Shotgun
    } else {
        WeaponKind::Sniper
    }
}

pub fn random_powerup_kind<R: Rng>(rng: &mut R) -> PowerupKind {
    match rng.gen_range(0..3) {
        0 => PowerupKind::Speed,
        1 => PowerupKind::Torch,
        _ => PowerupKind::Nightvision,
    }
}

/// Choose a pickup center away from every wall.
///
/// Candidates whose margin square touches a wall are rejected; once the
/// attempt budget is spent the last candidate is used unchecked.
pub fn place_pickup<R: Rng>(rng: &mut R, walls: &[Rect]) -> Vec2 {
    let min_x = BORDER_THICKNESS + PICKUP_WALL_MARGIN;
    let min_y = BORDER_THICKNESS + PICKUP_WALL_MARGIN;
    let max_x = MAP_WIDTH - BORDER_THICKNESS - PICKUP_WALL_MARGIN;
    let max_y = MAP_HEIGHT - BORDER_THICKNESS - PICKUP_WALL_MARGIN;

    let mut candidate = Vec2::new(MAP_WIDTH / 2.0, MAP_HEIGHT / 2.0);
    for _ in 0..PICKUP_PLACEMENT_ATTEMPTS {
        candidate = Vec2::new(rng.gen_range(min_x..max_x), rng.gen_range(min_y..max_y));
        let clearance = Rect::new(
            candidate.x - PICKUP_WALL_MARGIN,
            candidate.y - PICKUP_WALL_MARGIN,
            PICKUP_WALL_MARGIN * 2.0,
            PICKUP_WALL_MARGIN * 2.0,
        );
        if !CollisionSystem::hits_any_wall(&clearance, walls) {
            return candidate;
        }
    }
    candidate
}

/// Square claim area around a pickup center
pub fn claim_area(center: Vec2) -> Rect {
    Rect::new(
        center.x - PICKUP_RADIUS,
        center.y - PICKUP_RADIUS,
        PICKUP_RADIUS * 2.0,
        PICKUP_RADIUS * 2.0,
    )
}

/// Whether a player's box is within claiming distance of a pickup
pub fn in_reach(player_box: &Rect, pickup_center: Vec2) -> bool {
    CollisionSystem::aabb_overlap(player_box, &claim_area(pickup_center))
}
