//! Match task and authoritative tick loop

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::session::{Broadcaster, ConnectionManager};
use crate::util::time::{tick_duration, unix_millis};
use crate::ws::protocol::ClientMsg;

use super::physics::Vec2;
use super::snapshot::SnapshotPolicy;
use super::world::{TickOutcome, WorldState};
use super::{MatchCommand, PlayerId};

/// Bound on queued commands across all sockets
const COMMAND_QUEUE_CAPACITY: usize = 256;

/// The match task has shut down and no longer accepts commands
#[derive(Debug, thiserror::Error)]
#[error("match task has stopped")]
pub struct MatchClosed;

/// Cloneable sender side of the match task
#[derive(Clone)]
pub struct MatchHandle {
    command_tx: mpsc::Sender<MatchCommand>,
}

impl MatchHandle {
    pub async fn join(&self, player_id: PlayerId) -> Result<(), MatchClosed> {
        self.send(MatchCommand::Join { player_id }).await
    }

    /// Forward a gameplay intent, stamped with the time it arrived
    pub async fn input(&self, player_id: PlayerId, msg: ClientMsg) -> Result<(), MatchClosed> {
        self.send(MatchCommand::Input {
            player_id,
            msg,
            received_at: unix_millis(),
        })
        .await
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<(), MatchClosed> {
        self.send(MatchCommand::Leave { player_id }).await
    }

    async fn send(&self, command: MatchCommand) -> Result<(), MatchClosed> {
        self.command_tx.send(command).await.map_err(|_| MatchClosed)
    }
}

/// The single writer of the world.
///
/// Socket tasks only enqueue commands; everything that mutates the world
/// happens inside `tick`, in receipt order.
pub struct GameMatch {
    world: WorldState,
    command_rx: mpsc::Receiver<MatchCommand>,
    broadcaster: Broadcaster,
    tick_count: u64,
    inputs_closed: bool,
}

impl GameMatch {
    pub fn new(
        world: WorldState,
        policy: SnapshotPolicy,
        connections: Arc<ConnectionManager>,
    ) -> (Self, MatchHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);

        let game_match = Self {
            world,
            command_rx,
            broadcaster: Broadcaster::new(connections, policy),
            tick_count: 0,
            inputs_closed: false,
        };

        (game_match, MatchHandle { command_tx })
    }

    /// Run the tick loop until every handle is dropped
    pub async fn run(mut self) {
        info!(walls = self.world.walls().len(), "Match started");

        let budget = tick_duration();
        let mut tick_interval = interval(budget);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tick_interval.tick().await;

            let started = Instant::now();
            self.tick(unix_millis());

            let elapsed = started.elapsed();
            if elapsed > budget {
                warn!(
                    tick = self.tick_count,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Tick overran its budget"
                );
            }

            if self.inputs_closed {
                info!(tick = self.tick_count, "All handles dropped, stopping match");
                break;
            }
        }
    }

    /// One full tick: queued commands, simulation, then broadcast
    pub fn tick(&mut self, now_ms: u64) -> TickOutcome {
        self.tick_count += 1;
        self.process_commands();

        let outcome = self.world.step(now_ms);
        self.log_outcome(&outcome);

        self.broadcaster.publish(&self.world, now_ms);
        outcome
    }

    #[cfg(test)]
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Drain every command queued since the previous tick
    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(command) => self.handle_command(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.inputs_closed = true;
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, command: MatchCommand) {
        match command {
            MatchCommand::Join { player_id } => match self.world.add_player(player_id) {
                Ok(spawn) => {
                    info!(
                        player_id,
                        x = spawn.x,
                        y = spawn.y,
                        players = self.world.player_count(),
                        "Player spawned"
                    );
                }
                Err(e) => {
                    warn!(player_id, error = %e, "Join rejected");
                }
            },
            MatchCommand::Input {
                player_id,
                msg,
                received_at,
            } => self.handle_input(player_id, msg, received_at),
            MatchCommand::Leave { player_id } => {
                if self.world.remove_player(player_id).is_some() {
                    info!(player_id, "Player left match");
                }
            }
        }
    }

    fn handle_input(&mut self, player_id: PlayerId, msg: ClientMsg, received_at: u64) {
        match msg {
            ClientMsg::Move { dx, dy, look } => {
                let look = look.map(Vec2::from);
                if let Err(e) =
                    self.world
                        .apply_move(player_id, Vec2::new(dx, dy), look, received_at)
                {
                    debug!(player_id, error = %e, "Move dropped");
                }
            }
            ClientMsg::Shoot { dx, dy } => {
                match self
                    .world
                    .apply_shoot(player_id, Vec2::new(dx, dy), received_at)
                {
                    Ok(pellets) => debug!(player_id, pellets, "Shot fired"),
                    Err(e) => debug!(player_id, error = %e, "Shot dropped"),
                }
            }
        }
    }

    fn log_outcome(&self, outcome: &TickOutcome) {
        for hit in &outcome.hits {
            if hit.target_killed {
                info!(
                    shooter = hit.shooter,
                    target = hit.target,
                    bullet_id = hit.bullet_id,
                    scores = ?self.world.scores(),
                    "Player killed"
                );
            } else {
                debug!(
                    shooter = hit.shooter,
                    target = hit.target,
                    bullet_id = hit.bullet_id,
                    damage = hit.damage,
                    "Hit"
                );
            }
        }
        for claim in &outcome.weapon_claims {
            info!(
                player_id = claim.player,
                pickup_id = claim.pickup_id,
                weapon = ?claim.kind,
                "Weapon picked up"
            );
        }
        for claim in &outcome.powerup_claims {
            info!(
                player_id = claim.player,
                pickup_id = claim.pickup_id,
                powerup = ?claim.kind,
                "Power-up picked up"
            );
        }
        if outcome.spawned_pickups > 0 {
            debug!(
                spawned = outcome.spawned_pickups,
                pending = self.world.pending_events(),
                "Pickups respawned"
            );
        }
    }
}
