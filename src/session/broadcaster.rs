//! Broadcaster - serializes snapshots and pushes them to every socket

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::game::snapshot::{SnapshotBuilder, SnapshotPolicy, SnapshotStats};
use crate::game::{PlayerId, WorldState};
use crate::ws::protocol::ServerMsg;

use super::manager::{ConnectionManager, Delivery, Frame};

/// Log bandwidth figures every this many broadcasts
const STATS_LOG_INTERVAL: u64 = 300;

pub struct Broadcaster {
    connections: Arc<ConnectionManager>,
    policy: SnapshotPolicy,
    builder: SnapshotBuilder,
    stats: SnapshotStats,
}

impl Broadcaster {
    pub fn new(connections: Arc<ConnectionManager>, policy: SnapshotPolicy) -> Self {
        Self {
            connections,
            policy,
            builder: SnapshotBuilder::new(),
            stats: SnapshotStats::default(),
        }
    }

    /// Send this tick's snapshot to every connected socket.
    ///
    /// Called only after the tick has fully resolved, so no partial state
    /// ever leaves the match task.
    pub fn publish(&mut self, world: &WorldState, now_ms: u64) {
        let recipients = self.connections.connected_ids();
        if recipients.is_empty() {
            return;
        }

        match self.policy {
            SnapshotPolicy::Full => {
                let msg = ServerMsg::State(self.builder.build(world));
                if let Some(frame) = self.encode(&msg) {
                    for id in recipients {
                        self.deliver(id, frame.clone());
                    }
                }
            }
            SnapshotPolicy::Visibility => {
                for id in recipients {
                    let msg = ServerMsg::State(self.builder.build_for(world, id, now_ms));
                    if let Some(frame) = self.encode(&msg) {
                        self.deliver(id, frame);
                    }
                }
            }
        }

        if self.stats.total_snapshots % STATS_LOG_INTERVAL == 0 {
            debug!(
                total_snapshots = self.stats.total_snapshots,
                total_bytes = self.stats.total_bytes,
                avg_bytes = self.stats.avg_bytes_per_snapshot,
                "Snapshot bandwidth"
            );
        }
    }

    fn encode(&mut self, msg: &ServerMsg) -> Option<Frame> {
        match serde_json::to_string(msg) {
            Ok(json) => {
                self.stats.record(json.len());
                Some(Arc::from(json))
            }
            Err(e) => {
                error!(error = %e, "Failed to serialize snapshot");
                None
            }
        }
    }

    fn deliver(&self, player_id: PlayerId, frame: Frame) {
        match self.connections.send_to(player_id, frame) {
            Delivery::Queued => {}
            Delivery::Lagging => {
                warn!(player_id, "Client lagging, snapshot dropped");
            }
            Delivery::Closed => {
                debug!(player_id, "Outbox closed, snapshot skipped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::border_walls;
    use crate::game::physics::Vec2;

    #[tokio::test]
    async fn test_full_policy_sends_same_frame_to_all() {
        let connections = Arc::new(ConnectionManager::new(4));
        let mut a = connections.admit().unwrap();
        let mut b = connections.admit().unwrap();

        let mut world = WorldState::with_layout(1, border_walls());
        world.place_player(0, Vec2::new(400.0, 400.0));
        world.place_player(1, Vec2::new(800.0, 400.0));

        let mut broadcaster = Broadcaster::new(connections, SnapshotPolicy::Full);
        broadcaster.publish(&world, 0);

        let frame_a = a.outbox_rx.recv().await.unwrap();
        let frame_b = b.outbox_rx.recv().await.unwrap();
        assert!(Arc::ptr_eq(&frame_a, &frame_b));

        let value: serde_json::Value = serde_json::from_str(&frame_a).unwrap();
        assert_eq!(value["type"], "state");
        assert_eq!(value["players"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_visibility_policy_builds_per_viewer() {
        let connections = Arc::new(ConnectionManager::new(4));
        let mut a = connections.admit().unwrap();
        let mut b = connections.admit().unwrap();

        let mut world = WorldState::with_layout(1, border_walls());
        world.place_player(0, Vec2::new(400.0, 400.0));
        world.place_player(1, Vec2::new(700.0, 400.0));
        // Player 0 looks at player 1, player 1 looks away
        world.player_mut(0).unwrap().look = Vec2::new(1.0, 0.0);
        world.player_mut(1).unwrap().look = Vec2::new(1.0, 0.0);

        let mut broadcaster = Broadcaster::new(connections, SnapshotPolicy::Visibility);
        broadcaster.publish(&world, 60_000);

        let seen_by_0: serde_json::Value =
            serde_json::from_str(&a.outbox_rx.recv().await.unwrap()).unwrap();
        let seen_by_1: serde_json::Value =
            serde_json::from_str(&b.outbox_rx.recv().await.unwrap()).unwrap();
        assert_eq!(seen_by_0["players"].as_array().unwrap().len(), 2);
        // Player 1 sits in player 0's beam, so it sees the beam holder too
        assert_eq!(seen_by_1["players"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_no_recipients_no_work() {
        let connections = Arc::new(ConnectionManager::new(4));
        let world = WorldState::with_layout(1, border_walls());
        let mut broadcaster = Broadcaster::new(connections, SnapshotPolicy::Full);
        broadcaster.publish(&world, 0);
        assert_eq!(broadcaster.stats.total_snapshots, 0);
    }
}
