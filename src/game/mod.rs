//! Game simulation modules

pub mod combat;
pub mod map;
pub mod r#match;
pub mod physics;
pub mod pickups;
pub mod schedule;
pub mod snapshot;
pub mod tuning;
pub mod visibility;
pub mod world;

pub use r#match::{GameMatch, MatchHandle};
pub use snapshot::SnapshotPolicy;
pub use world::WorldState;

use crate::ws::protocol::ClientMsg;

/// Player slot id, unique only among currently connected players
pub type PlayerId = u8;

/// Commands sent from socket tasks to the match task
#[derive(Debug, Clone)]
pub enum MatchCommand {
    /// A socket was admitted under this id
    Join { player_id: PlayerId },
    /// Gameplay intent, stamped with its receipt time
    Input {
        player_id: PlayerId,
        msg: ClientMsg,
        received_at: u64,
    },
    /// The socket for this id closed
    Leave { player_id: PlayerId },
}
