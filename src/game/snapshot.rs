//! Snapshot building for network transmission

use std::str::FromStr;

use crate::ws::protocol::{
    ActivePowerupEntry, BulletEntry, PlayerEntry, PowerupPickupEntry, ShapeTag, StateSnapshot,
    WeaponPickupEntry,
};

use super::combat::BulletShape;
use super::pickups::PowerupKind;
use super::tuning::{MAX_PLAYERS, SHOT_REVEAL_MS, TORCH_CONE_MULTIPLIER};
use super::visibility::{is_illuminated, VisionCone};
use super::world::{Player, WorldState};
use super::PlayerId;

/// What each client is allowed to see on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotPolicy {
    /// Every client gets the whole world
    #[default]
    Full,
    /// Opponents and pickups outside the viewer's sight are omitted
    Visibility,
}

impl FromStr for SnapshotPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "visibility" => Ok(Self::Visibility),
            _ => Err(()),
        }
    }
}

/// Vision cone for a player, including any torch effect
pub fn cone_for(world: &WorldState, id: PlayerId, now_ms: u64) -> VisionCone {
    let cone = VisionCone::default();
    if world.has_powerup(id, PowerupKind::Torch, now_ms) {
        cone.lengthened(TORCH_CONE_MULTIPLIER)
    } else {
        cone
    }
}

/// Whether `other` should appear in the snapshot sent to `viewer`
pub fn opponent_visible(world: &WorldState, viewer: &Player, other: &Player, now_ms: u64) -> bool {
    if viewer.id == other.id || world.has_powerup(viewer.id, PowerupKind::Nightvision, now_ms) {
        return true;
    }

    let recently_fired = other
        .last_shot_at
        .is_some_and(|t| now_ms.saturating_sub(t) < SHOT_REVEAL_MS);
    if recently_fired {
        return true;
    }

    let walls = world.walls();
    let in_my_light = is_illuminated(
        viewer.center(),
        viewer.look,
        other.center(),
        &cone_for(world, viewer.id, now_ms),
        walls,
    );

    // Standing in the opponent's beam reveals the beam holder too
    in_my_light
        || is_illuminated(
            other.center(),
            other.look,
            viewer.center(),
            &cone_for(world, other.id, now_ms),
            walls,
        )
}

fn player_entry(player: &Player) -> PlayerEntry {
    PlayerEntry {
        id: player.id,
        x: player.position.x,
        y: player.position.y,
        hp: player.hp,
        weapon: player.weapon,
        weapon_expires_at: player.weapon_expires_at,
    }
}

/// Builds snapshots from the world
#[derive(Debug, Default)]
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Complete snapshot, identical for every recipient
    pub fn build(&self, world: &WorldState) -> StateSnapshot {
        let mut snapshot = self.base(world);

        for player in world.players() {
            snapshot.players.push(player_entry(player));
            snapshot.player_dirs.insert(player.id, player.look.into());
        }
        snapshot.weapons_on_map = world
            .weapon_pickups()
            .iter()
            .map(|p| WeaponPickupEntry {
                kind: p.kind,
                x: p.position.x,
                y: p.position.y,
            })
            .collect();
        snapshot.powerups_on_map = world
            .powerup_pickups()
            .iter()
            .map(|p| PowerupPickupEntry {
                kind: p.kind,
                x: p.position.x,
                y: p.position.y,
            })
            .collect();

        snapshot
    }

    /// Snapshot for one viewer with hidden opponents and pickups removed.
    ///
    /// A viewer that is not in the world yet receives only the static and
    /// always-visible parts.
    pub fn build_for(&self, world: &WorldState, viewer_id: PlayerId, now_ms: u64) -> StateSnapshot {
        let mut snapshot = self.base(world);
        let Some(viewer) = world.player(viewer_id) else {
            return snapshot;
        };

        for player in world.players() {
            if opponent_visible(world, viewer, player, now_ms) {
                snapshot.players.push(player_entry(player));
                snapshot.player_dirs.insert(player.id, player.look.into());
            }
        }

        let cone = cone_for(world, viewer_id, now_ms);
        let lit = |pos| is_illuminated(viewer.center(), viewer.look, pos, &cone, world.walls());

        snapshot.weapons_on_map = world
            .weapon_pickups()
            .iter()
            .filter(|p| lit(p.position))
            .map(|p| WeaponPickupEntry {
                kind: p.kind,
                x: p.position.x,
                y: p.position.y,
            })
            .collect();
        snapshot.powerups_on_map = world
            .powerup_pickups()
            .iter()
            .filter(|p| lit(p.position))
            .map(|p| PowerupPickupEntry {
                kind: p.kind,
                x: p.position.x,
                y: p.position.y,
            })
            .collect();

        snapshot
    }

    /// Parts every recipient always receives
    fn base(&self, world: &WorldState) -> StateSnapshot {
        let bullets = world
            .bullets()
            .iter()
            .map(|b| BulletEntry {
                x: b.position.x,
                y: b.position.y,
                dx: b.velocity.x,
                dy: b.velocity.y,
                kind: b.weapon,
                shape: match b.shape {
                    BulletShape::Point => ShapeTag::Point,
                    BulletShape::Rail { .. } => ShapeTag::Rail,
                },
            })
            .collect();

        let mut last_shot_times = vec![0; MAX_PLAYERS];
        for player in world.players() {
            if let Some(slot) = last_shot_times.get_mut(player.id as usize) {
                *slot = player.last_shot_at.unwrap_or(0);
            }
        }

        let active_powerups = world
            .active_powerups()
            .iter()
            .map(|p| ActivePowerupEntry {
                player_id: p.player,
                kind: p.kind,
                expires_at: p.expires_at,
            })
            .collect();

        StateSnapshot {
            bullets,
            scores: world.scores().to_vec(),
            walls: world.walls().to_vec(),
            active_powerups,
            last_shot_times,
            ..Default::default()
        }
    }
}

/// Outbound snapshot statistics for debugging
#[derive(Debug, Default)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_bytes_per_snapshot: f32,
}

impl SnapshotStats {
    pub fn record(&mut self, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_bytes_per_snapshot =
            self.avg_bytes_per_snapshot * ((n - 1.0) / n) + (bytes as f32 / n);
    }
}
