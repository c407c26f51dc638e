//! Arena layout: border walls, grid-snapped interior walls and spawn cells

use rand::Rng;

use super::physics::{CollisionSystem, Rect, Vec2};
use super::tuning::{
    BORDER_THICKNESS, GRID_SIZE, INTERIOR_WALL_COUNT, MAP_HEIGHT, MAP_WIDTH, MAX_WALL_CELLS,
    PLAYER_SIZE, SPAWN_ATTEMPTS, WALL_PLACEMENT_ATTEMPTS,
};

/// The four walls enclosing the map
pub fn border_walls() -> Vec<Rect> {
    vec![
        Rect::new(0.0, 0.0, MAP_WIDTH, BORDER_THICKNESS),
        Rect::new(0.0, MAP_HEIGHT - BORDER_THICKNESS, MAP_WIDTH, BORDER_THICKNESS),
        Rect::new(0.0, 0.0, BORDER_THICKNESS, MAP_HEIGHT),
        Rect::new(MAP_WIDTH - BORDER_THICKNESS, 0.0, BORDER_THICKNESS, MAP_HEIGHT),
    ]
}

fn grid_columns() -> u32 {
    (MAP_WIDTH / GRID_SIZE) as u32
}

fn grid_rows() -> u32 {
    (MAP_HEIGHT / GRID_SIZE) as u32
}

/// Generate the full wall set: borders plus non-overlapping interior segments.
///
/// Candidates that overlap an existing wall are discarded and retried until
/// either the target count or the attempt budget is reached.
pub fn generate_walls<R: Rng>(rng: &mut R) -> Vec<Rect> {
    let mut walls = border_walls();
    let mut placed = 0;
    let mut attempts = 0;

    while placed < INTERIOR_WALL_COUNT && attempts < WALL_PLACEMENT_ATTEMPTS {
        attempts += 1;

        let cells = rng.gen_range(1..=MAX_WALL_CELLS) as f32;
        let (w, h) = if rng.gen_bool(0.5) {
            (cells * GRID_SIZE, GRID_SIZE)
        } else {
            (GRID_SIZE, cells * GRID_SIZE)
        };

        // Keep one free cell between the border and any interior wall
        let col = rng.gen_range(2..grid_columns() - 2) as f32;
        let row = rng.gen_range(2..grid_rows() - 2) as f32;
        let candidate = Rect::new(col * GRID_SIZE, row * GRID_SIZE, w, h);

        if candidate.x + candidate.w > MAP_WIDTH - BORDER_THICKNESS * 2.0
            || candidate.y + candidate.h > MAP_HEIGHT - BORDER_THICKNESS * 2.0
        {
            continue;
        }

        if CollisionSystem::hits_any_wall(&candidate, &walls) {
            continue;
        }

        walls.push(candidate);
        placed += 1;
    }

    walls
}

fn player_box_at(cell: Vec2) -> Rect {
    Rect::new(cell.x, cell.y, PLAYER_SIZE, PLAYER_SIZE)
}

fn is_free_spawn(cell: Vec2, walls: &[Rect]) -> bool {
    let bbox = player_box_at(cell);
    CollisionSystem::rect_in_bounds(&bbox) && !CollisionSystem::hits_any_wall(&bbox, walls)
}

/// Pick a wall-free grid cell for a player's top-left corner.
///
/// Random cells are tried first; when the attempt budget runs out the grid is
/// scanned in order so the result is always wall-free when any cell is.
pub fn find_spawn<R: Rng>(rng: &mut R, walls: &[Rect]) -> Vec2 {
    for _ in 0..SPAWN_ATTEMPTS {
        let col = rng.gen_range(0..grid_columns()) as f32;
        let row = rng.gen_range(0..grid_rows()) as f32;
        let cell = Vec2::new(col * GRID_SIZE, row * GRID_SIZE);
        if is_free_spawn(cell, walls) {
            return cell;
        }
    }

    (0..grid_rows())
        .flat_map(|row| (0..grid_columns()).map(move |col| (col, row)))
        .map(|(col, row)| Vec2::new(col as f32 * GRID_SIZE, row as f32 * GRID_SIZE))
        .find(|&cell| is_free_spawn(cell, walls))
        .unwrap_or(Vec2::new(MAP_WIDTH / 2.0, MAP_HEIGHT / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_generated_walls_do_not_overlap() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let walls = generate_walls(&mut rng);

        assert!(walls.len() > 4, "interior walls should be placed");
        for (i, a) in walls.iter().enumerate().skip(4) {
            for (j, b) in walls.iter().enumerate() {
                if i != j {
                    assert!(!CollisionSystem::aabb_overlap(a, b), "wall {i} overlaps {j}");
                }
            }
        }
    }

    #[test]
    fn test_interior_walls_are_grid_snapped() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for wall in generate_walls(&mut rng).iter().skip(4) {
            assert_eq!(wall.x % GRID_SIZE, 0.0);
            assert_eq!(wall.y % GRID_SIZE, 0.0);
            assert_eq!(wall.w % GRID_SIZE, 0.0);
            assert_eq!(wall.h % GRID_SIZE, 0.0);
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = generate_walls(&mut ChaCha8Rng::seed_from_u64(42));
        let b = generate_walls(&mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_spawn_is_wall_free() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let walls = generate_walls(&mut rng);
        for _ in 0..50 {
            let spawn = find_spawn(&mut rng, &walls);
            assert!(is_free_spawn(spawn, &walls));
        }
    }

    #[test]
    fn test_spawn_falls_back_to_scan() {
        // Everything except one cell is walled off
        let walls = vec![
            Rect::new(0.0, 0.0, MAP_WIDTH, 400.0),
            Rect::new(0.0, 440.0, MAP_WIDTH, MAP_HEIGHT - 440.0),
            Rect::new(0.0, 400.0, 400.0, 40.0),
            Rect::new(440.0, 400.0, MAP_WIDTH - 440.0, 40.0),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let spawn = find_spawn(&mut rng, &walls);
        assert_eq!(spawn, Vec2::new(400.0, 400.0));
    }
}
