//! Per-socket inbound rate limiting

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shoot frames per second per socket. The basic weapon's cooldown caps an
/// honest client far below this, so only floods are ever refused.
pub const SHOOT_RATE_LIMIT: u32 = 20;

/// Which quota an inbound frame draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Move,
    Shoot,
}

/// Inbound frame limiter owned by one socket task.
///
/// Moves and shots draw from separate quotas, so a high-refresh client that
/// spends its move quota never loses a shot.
pub struct PlayerRateLimiter {
    move_limiter: Limiter,
    shoot_limiter: Limiter,
}

impl PlayerRateLimiter {
    pub fn new(moves_per_second: NonZeroU32) -> Self {
        let shots_per_second = NonZeroU32::new(SHOOT_RATE_LIMIT).unwrap_or(NonZeroU32::MIN);
        Self {
            move_limiter: RateLimiter::direct(Quota::per_second(moves_per_second)),
            shoot_limiter: RateLimiter::direct(Quota::per_second(shots_per_second)),
        }
    }

    /// Check if an input frame is allowed (returns true if allowed)
    pub fn check_input(&self, kind: InputKind) -> bool {
        let limiter = match kind {
            InputKind::Move => &self.move_limiter,
            InputKind::Shoot => &self.shoot_limiter,
        };
        limiter.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_beyond_quota_is_refused() {
        let limiter = PlayerRateLimiter::new(NonZeroU32::new(5).unwrap());
        let allowed = (0..20)
            .filter(|_| limiter.check_input(InputKind::Move))
            .count();
        assert_eq!(allowed, 5);
    }

    #[test]
    fn test_spent_move_quota_does_not_block_shots() {
        let limiter = PlayerRateLimiter::new(NonZeroU32::new(5).unwrap());
        while limiter.check_input(InputKind::Move) {}

        assert!(limiter.check_input(InputKind::Shoot));
        assert!(!limiter.check_input(InputKind::Move));
    }

    #[test]
    fn test_shoot_flood_is_refused() {
        let limiter = PlayerRateLimiter::new(NonZeroU32::new(5).unwrap());
        let allowed = (0..100)
            .filter(|_| limiter.check_input(InputKind::Shoot))
            .count();
        assert_eq!(allowed, SHOOT_RATE_LIMIT as usize);
    }
}
