//! Gameplay constants shared by every simulation system

/// Maximum simultaneous players in the arena
pub const MAX_PLAYERS: usize = 2;

// Map geometry
pub const MAP_WIDTH: f32 = 2000.0;
pub const MAP_HEIGHT: f32 = 1500.0;
/// Walls, spawns and pickups snap to this grid
pub const GRID_SIZE: f32 = 40.0;
pub const BORDER_THICKNESS: f32 = 40.0;
pub const INTERIOR_WALL_COUNT: usize = 36;
/// Longest interior wall, in grid cells
pub const MAX_WALL_CELLS: u32 = 4;
pub const WALL_PLACEMENT_ATTEMPTS: usize = 400;

// Player
pub const PLAYER_SIZE: f32 = 20.0;
pub const MAX_HP: u8 = 3;
/// Displacement a client may declare for one frame of movement
pub const BASE_MOVE_STEP: f32 = 2.0;
/// Slack applied on top of the allowed step for float noise on the client
pub const MOVE_TOLERANCE: f32 = 1.05;
/// Client frame rate the move step is calibrated for
pub const MOVE_FRAMES_PER_SEC: f32 = 60.0;
/// Movement a player may bank ahead of real time, in milliseconds of travel
pub const MOVE_BURST_MS: u64 = 100;
/// Extra margin around the player box when testing bullet hits
pub const HIT_MARGIN: f32 = 2.0;
pub const SPAWN_ATTEMPTS: usize = 100;

// Pickups
pub const WEAPON_PICKUP_COUNT: usize = 2;
pub const POWERUP_PICKUP_COUNT: usize = 1;
/// Half-extent of the square claim area around a pickup center
pub const PICKUP_RADIUS: f32 = 16.0;
/// Pickups are never placed closer than this to a wall
pub const PICKUP_WALL_MARGIN: f32 = 30.0;
pub const PICKUP_PLACEMENT_ATTEMPTS: usize = 50;
pub const PICKUP_RESPAWN_DELAY_MS: u64 = 2_000;
/// How long a weapon granted by a pickup is held before reverting to basic
pub const WEAPON_PICKUP_DURATION_MS: u64 = 20_000;
pub const POWERUP_DURATION_MS: u64 = 10_000;
pub const SPEED_POWERUP_MULTIPLIER: f32 = 1.75;

// Vision
pub const CONE_LENGTH: f32 = 400.0;
pub const CONE_ANGLE: f32 = std::f32::consts::PI * 0.6;
pub const TORCH_CONE_MULTIPLIER: f32 = 1.5;
pub const LOS_STEP: f32 = 8.0;
/// A player who fired within this window is visible to everyone
pub const SHOT_REVEAL_MS: u64 = 5_000;
