//! Time utilities for game simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Simulation and broadcast rate
pub const SIMULATION_TPS: u32 = 30;

/// Wall-clock budget of one tick
pub fn tick_duration() -> Duration {
    Duration::from_micros(1_000_000 / SIMULATION_TPS as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_duration_matches_rate() {
        assert_eq!(tick_duration(), Duration::from_micros(33_333));
    }

    #[test]
    fn test_unix_millis_is_recent() {
        // Any time after 2020-01-01
        assert!(unix_millis() > 1_577_836_800_000);
    }
}
