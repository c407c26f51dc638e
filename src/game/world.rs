//! Canonical world state and its mutators.
//!
//! `WorldState` is plain data with no I/O. It is owned by the match task,
//! which is the only writer; connection handling reaches it through
//! commands, never by touching fields directly.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::combat::{Bullet, CombatSystem, HitResult, WeaponKind, WeaponStats};
use super::map::{find_spawn, generate_walls};
use super::physics::{CollisionSystem, Rect, Vec2};
use super::pickups::{
    in_reach, place_pickup, random_powerup_kind, random_weapon_kind, ActivePowerup, PowerupKind,
    PowerupPickup, WeaponPickup,
};
use super::schedule::{EventQueue, ScheduledEvent};
use super::tuning::{
    BASE_MOVE_STEP, HIT_MARGIN, MAX_HP, MAX_PLAYERS, MOVE_BURST_MS, MOVE_FRAMES_PER_SEC,
    MOVE_TOLERANCE, PICKUP_RESPAWN_DELAY_MS,
    PLAYER_SIZE, POWERUP_DURATION_MS, POWERUP_PICKUP_COUNT, SPEED_POWERUP_MULTIPLIER,
    WEAPON_PICKUP_COUNT, WEAPON_PICKUP_DURATION_MS,
};
use super::PlayerId;

/// Facing used until a player sends its first non-zero look vector
pub const DEFAULT_LOOK: Vec2 = Vec2::new(0.0, -1.0);

/// Player state (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    /// Top-left corner of the player box
    pub position: Vec2,
    pub hp: u8,
    pub weapon: WeaponKind,
    /// When a picked-up weapon reverts to basic
    pub weapon_expires_at: Option<u64>,
    pub last_shot_at: Option<u64>,
    /// Last non-zero facing vector
    pub look: Vec2,
    /// Distance still available before real time catches up
    move_budget: f32,
    budget_at: Option<u64>,
}

impl Player {
    fn new(id: PlayerId, position: Vec2) -> Self {
        Self {
            id,
            position,
            hp: MAX_HP,
            weapon: WeaponKind::Basic,
            weapon_expires_at: None,
            last_shot_at: None,
            look: DEFAULT_LOOK,
            move_budget: 0.0,
            budget_at: None,
        }
    }

    /// Revert a timed weapon to basic once it has run out
    pub fn expire_weapon(&mut self, now_ms: u64) {
        if self.weapon_expires_at.is_some_and(|t| t <= now_ms) {
            self.weapon = WeaponKind::Basic;
            self.weapon_expires_at = None;
        }
    }

    /// Top up the movement budget for the time elapsed since the last move.
    ///
    /// `step` is the per-message allowance; the budget refills at that step
    /// per client frame and never holds more than `MOVE_BURST_MS` of travel.
    fn refill_budget(&mut self, step: f32, now_ms: u64) -> f32 {
        let per_ms = step * MOVE_FRAMES_PER_SEC / 1000.0;
        let cap = per_ms * MOVE_BURST_MS as f32;
        let elapsed = match self.budget_at {
            Some(last) => now_ms.saturating_sub(last),
            None => MOVE_BURST_MS,
        };

        self.move_budget = (self.move_budget + elapsed as f32 * per_ms).min(cap);
        self.budget_at = Some(self.budget_at.map_or(now_ms, |last| last.max(now_ms)));
        self.move_budget
    }

    pub fn bbox(&self) -> Rect {
        Rect::new(self.position.x, self.position.y, PLAYER_SIZE, PLAYER_SIZE)
    }

    pub fn center(&self) -> Vec2 {
        self.bbox().center()
    }

    /// Slightly enlarged box used for projectile hits
    pub fn hitbox(&self) -> Rect {
        self.bbox().expand(HIT_MARGIN)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum WorldError {
    #[error("player {0} is already in the world")]
    DuplicatePlayer(PlayerId),

    #[error("player id {0} is outside the allowed range")]
    InvalidId(PlayerId),

    #[error("world already holds the maximum number of players")]
    Full,
}

/// Reasons a move intent is dropped
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MoveError {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("move vector is not finite")]
    NonFinite,

    #[error("move of {requested} exceeds allowed step {allowed}")]
    TooFast { requested: f32, allowed: f32 },

    #[error("move of {requested} exceeds remaining budget {remaining}")]
    OverBudget { requested: f32, remaining: f32 },

    #[error("move leaves the map")]
    OutOfBounds,

    #[error("move blocked by a wall")]
    Blocked,
}

/// Reasons a shoot intent is dropped
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ShootError {
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),

    #[error("shoot direction is zero or not finite")]
    InvalidDirection,

    #[error("weapon cooling down")]
    Cooldown,
}

/// A pickup taken off the map by a player
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Claim<K> {
    pub player: PlayerId,
    pub pickup_id: u64,
    pub kind: K,
}

/// What happened during one simulation step
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickOutcome {
    pub hits: Vec<HitResult>,
    pub weapon_claims: Vec<Claim<WeaponKind>>,
    pub powerup_claims: Vec<Claim<PowerupKind>>,
    pub spawned_pickups: usize,
}

/// The whole authoritative world
pub struct WorldState {
    players: BTreeMap<PlayerId, Player>,
    bullets: Vec<Bullet>,
    walls: Vec<Rect>,
    weapon_pickups: Vec<WeaponPickup>,
    powerup_pickups: Vec<PowerupPickup>,
    active_powerups: Vec<ActivePowerup>,
    scores: [u32; MAX_PLAYERS],
    events: EventQueue,
    rng: ChaCha8Rng,
    next_bullet_id: u64,
    next_pickup_id: u64,
}

impl WorldState {
    /// Fresh world: generated walls plus the initial pickups
    pub fn new(seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let walls = generate_walls(&mut rng);
        let mut world = Self::from_parts(rng, walls);

        for _ in 0..WEAPON_PICKUP_COUNT {
            world.spawn_weapon_pickup();
        }
        for _ in 0..POWERUP_PICKUP_COUNT {
            world.spawn_powerup_pickup();
        }
        world
    }

    /// World with explicit walls and no pickups
    pub fn with_layout(seed: u64, walls: Vec<Rect>) -> Self {
        Self::from_parts(ChaCha8Rng::seed_from_u64(seed), walls)
    }

    fn from_parts(rng: ChaCha8Rng, walls: Vec<Rect>) -> Self {
        Self {
            players: BTreeMap::new(),
            bullets: Vec::new(),
            walls,
            weapon_pickups: Vec::new(),
            powerup_pickups: Vec::new(),
            active_powerups: Vec::new(),
            scores: [0; MAX_PLAYERS],
            events: EventQueue::new(),
            rng,
            next_bullet_id: 0,
            next_pickup_id: 0,
        }
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn bullets(&self) -> &[Bullet] {
        &self.bullets
    }

    pub fn walls(&self) -> &[Rect] {
        &self.walls
    }

    pub fn weapon_pickups(&self) -> &[WeaponPickup] {
        &self.weapon_pickups
    }

    pub fn powerup_pickups(&self) -> &[PowerupPickup] {
        &self.powerup_pickups
    }

    pub fn active_powerups(&self) -> &[ActivePowerup] {
        &self.active_powerups
    }

    pub fn scores(&self) -> &[u32; MAX_PLAYERS] {
        &self.scores
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn has_powerup(&self, id: PlayerId, kind: PowerupKind, now_ms: u64) -> bool {
        self.active_powerups
            .iter()
            .any(|p| p.player == id && p.kind == kind && p.expires_at > now_ms)
    }

    /// Longest displacement a single move message may declare
    pub fn move_allowance(&self, id: PlayerId, now_ms: u64) -> f32 {
        let multiplier = if self.has_powerup(id, PowerupKind::Speed, now_ms) {
            SPEED_POWERUP_MULTIPLIER
        } else {
            1.0
        };
        BASE_MOVE_STEP * multiplier * MOVE_TOLERANCE
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Place a new player on a wall-free spawn cell
    pub fn add_player(&mut self, id: PlayerId) -> Result<Vec2, WorldError> {
        if id as usize >= MAX_PLAYERS {
            return Err(WorldError::InvalidId(id));
        }
        if self.players.contains_key(&id) {
            return Err(WorldError::DuplicatePlayer(id));
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(WorldError::Full);
        }

        let spawn = find_spawn(&mut self.rng, &self.walls);
        self.players.insert(id, Player::new(id, spawn));
        Ok(spawn)
    }

    /// Remove a player and everything keyed by its id
    pub fn remove_player(&mut self, id: PlayerId) -> Option<Player> {
        let player = self.players.remove(&id)?;
        self.active_powerups.retain(|p| p.player != id);
        self.bullets.retain(|b| b.owner != id);
        Some(player)
    }

    // ------------------------------------------------------------------
    // Intents
    // ------------------------------------------------------------------

    /// Apply a move atomically: either the whole displacement or nothing.
    ///
    /// The look vector is stored even when the displacement is rejected.
    pub fn apply_move(
        &mut self,
        id: PlayerId,
        delta: Vec2,
        look: Option<Vec2>,
        now_ms: u64,
    ) -> Result<Vec2, MoveError> {
        let allowed = self.move_allowance(id, now_ms);
        let walls = &self.walls;
        let player = self
            .players
            .get_mut(&id)
            .ok_or(MoveError::UnknownPlayer(id))?;

        if let Some(look) = look.and_then(Vec2::normalized) {
            player.look = look;
        }

        if !delta.is_finite() {
            return Err(MoveError::NonFinite);
        }

        let requested = delta.length();
        if requested > allowed {
            return Err(MoveError::TooFast { requested, allowed });
        }

        let remaining = player.refill_budget(allowed, now_ms);
        if requested > remaining {
            return Err(MoveError::OverBudget {
                requested,
                remaining,
            });
        }

        let candidate = player.position.add(delta);
        let bbox = Rect::new(candidate.x, candidate.y, PLAYER_SIZE, PLAYER_SIZE);
        if !CollisionSystem::rect_in_bounds(&bbox) {
            return Err(MoveError::OutOfBounds);
        }
        if CollisionSystem::hits_any_wall(&bbox, walls) {
            return Err(MoveError::Blocked);
        }

        player.position = candidate;
        player.move_budget -= requested;
        Ok(candidate)
    }

    /// Fire the player's current weapon if its cooldown has elapsed.
    ///
    /// Returns the number of pellets spawned.
    pub fn apply_shoot(
        &mut self,
        id: PlayerId,
        direction: Vec2,
        now_ms: u64,
    ) -> Result<usize, ShootError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(ShootError::UnknownPlayer(id))?;

        let direction = direction
            .normalized()
            .ok_or(ShootError::InvalidDirection)?;

        player.expire_weapon(now_ms);

        let stats = WeaponStats::for_kind(player.weapon);
        if !CombatSystem::can_fire(player.last_shot_at, now_ms, &stats) {
            return Err(ShootError::Cooldown);
        }

        let pellets = CombatSystem::fire(
            id,
            player.weapon,
            player.center(),
            direction,
            &mut self.next_bullet_id,
        );
        player.last_shot_at = Some(now_ms);

        let count = pellets.len();
        self.bullets.extend(pellets);
        Ok(count)
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance the world by one tick: timed effects, bullets, pickups, then
    /// any scheduled events that have come due.
    pub fn step(&mut self, now_ms: u64) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        self.expire_effects(now_ms);
        outcome.hits = self.update_bullets();
        self.resolve_pickups(now_ms, &mut outcome);
        outcome.spawned_pickups = self.run_scheduled(now_ms);

        outcome
    }

    fn expire_effects(&mut self, now_ms: u64) {
        for player in self.players.values_mut() {
            player.expire_weapon(now_ms);
        }
        self.active_powerups.retain(|p| p.expires_at > now_ms);
    }

    /// Move every bullet and remove those that leave range, bounds, hit a
    /// wall, or hit an opposing player. Each bullet is removed exactly once.
    fn update_bullets(&mut self) -> Vec<HitResult> {
        let mut hits = Vec::new();
        let mut idx = 0;

        while idx < self.bullets.len() {
            let bullet = &mut self.bullets[idx];
            bullet.advance();

            let expired = bullet.out_of_range()
                || !CollisionSystem::point_in_bounds(bullet.position)
                || CollisionSystem::point_in_any_wall(bullet.position, &self.walls);

            if expired {
                self.bullets.remove(idx);
                continue;
            }

            let bullet = &self.bullets[idx];
            let target = self
                .players
                .values()
                .filter(|p| p.id != bullet.owner)
                .find(|p| bullet.hits(&p.hitbox()))
                .map(|p| p.id);

            match target {
                Some(target) => {
                    let bullet = self.bullets.remove(idx);
                    hits.push(self.apply_hit(&bullet, target));
                }
                None => idx += 1,
            }
        }

        hits
    }

    fn apply_hit(&mut self, bullet: &Bullet, target_id: PlayerId) -> HitResult {
        let damage = bullet.impact_damage();
        let mut killed = false;

        if let Some(target) = self.players.get_mut(&target_id) {
            let (new_hp, dead) = CombatSystem::apply_damage(target.hp, damage);
            target.hp = new_hp;
            killed = dead;
        }

        if killed {
            if let Some(score) = self.scores.get_mut(bullet.owner as usize) {
                *score += 1;
            }
            let spawn = find_spawn(&mut self.rng, &self.walls);
            if let Some(target) = self.players.get_mut(&target_id) {
                target.position = spawn;
                target.hp = MAX_HP;
            }
        }

        HitResult {
            bullet_id: bullet.id,
            shooter: bullet.owner,
            target: target_id,
            damage,
            target_killed: killed,
        }
    }

    /// Claim pickups in player id order; a claimed pickup leaves the map
    /// immediately and its replacement is scheduled.
    fn resolve_pickups(&mut self, now_ms: u64, outcome: &mut TickOutcome) {
        for player in self.players.values_mut() {
            let bbox = player.bbox();

            if let Some(idx) = self
                .weapon_pickups
                .iter()
                .position(|pickup| in_reach(&bbox, pickup.position))
            {
                let pickup = self.weapon_pickups.remove(idx);
                player.weapon = pickup.kind;
                player.weapon_expires_at = Some(now_ms + WEAPON_PICKUP_DURATION_MS);
                self.events.schedule(
                    now_ms + PICKUP_RESPAWN_DELAY_MS,
                    ScheduledEvent::SpawnWeaponPickup,
                );
                outcome.weapon_claims.push(Claim {
                    player: player.id,
                    pickup_id: pickup.id,
                    kind: pickup.kind,
                });
            }

            if let Some(idx) = self
                .powerup_pickups
                .iter()
                .position(|pickup| in_reach(&bbox, pickup.position))
            {
                let pickup = self.powerup_pickups.remove(idx);
                let expires_at = now_ms + POWERUP_DURATION_MS;

                match self
                    .active_powerups
                    .iter_mut()
                    .find(|p| p.player == player.id && p.kind == pickup.kind)
                {
                    Some(active) => active.expires_at = expires_at,
                    None => self.active_powerups.push(ActivePowerup {
                        player: player.id,
                        kind: pickup.kind,
                        expires_at,
                    }),
                }

                self.events.schedule(
                    now_ms + PICKUP_RESPAWN_DELAY_MS,
                    ScheduledEvent::SpawnPowerupPickup,
                );
                outcome.powerup_claims.push(Claim {
                    player: player.id,
                    pickup_id: pickup.id,
                    kind: pickup.kind,
                });
            }
        }
    }

    fn run_scheduled(&mut self, now_ms: u64) -> usize {
        if self.events.is_empty() {
            return 0;
        }
        let due = self.events.drain_due(now_ms);
        for event in &due {
            match event {
                ScheduledEvent::SpawnWeaponPickup => self.spawn_weapon_pickup(),
                ScheduledEvent::SpawnPowerupPickup => self.spawn_powerup_pickup(),
            }
        }
        due.len()
    }

    fn next_pickup_id(&mut self) -> u64 {
        let id = self.next_pickup_id;
        self.next_pickup_id += 1;
        id
    }

    fn spawn_weapon_pickup(&mut self) {
        let kind = random_weapon_kind(&mut self.rng);
        let position = place_pickup(&mut self.rng, &self.walls);
        let id = self.next_pickup_id();
        self.weapon_pickups.push(WeaponPickup { id, kind, position });
    }

    fn spawn_powerup_pickup(&mut self) {
        let kind = random_powerup_kind(&mut self.rng);
        let position = place_pickup(&mut self.rng, &self.walls);
        let id = self.next_pickup_id();
        self.powerup_pickups.push(PowerupPickup { id, kind, position });
    }

    /// Test hook: put a player at an exact position
    #[cfg(test)]
    pub fn place_player(&mut self, id: PlayerId, position: Vec2) {
        self.players.insert(id, Player::new(id, position));
    }

    #[cfg(test)]
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.get_mut(&id)
    }

    #[cfg(test)]
    pub fn place_weapon_pickup(&mut self, kind: WeaponKind, position: Vec2) {
        let id = self.next_pickup_id();
        self.weapon_pickups.push(WeaponPickup { id, kind, position });
    }

    #[cfg(test)]
    pub fn place_powerup_pickup(&mut self, kind: PowerupKind, position: Vec2) {
        let id = self.next_pickup_id();
        self.powerup_pickups.push(PowerupPickup { id, kind, position });
    }
}
