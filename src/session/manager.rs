//! Connection manager - admission, id allocation and the id→socket table

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::game::tuning::MAX_PLAYERS;
use crate::game::PlayerId;

/// A serialized text frame ready for the socket writer
pub type Frame = Arc<str>;

/// Admission failures
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AdmitError {
    #[error("room is full ({0} players)")]
    Full(usize),
}

/// Transport side of a connected player
#[derive(Debug, Clone)]
pub struct PlayerConnection {
    pub player_id: PlayerId,
    /// Distinguishes connections that reuse the same player id
    pub session_id: Uuid,
    outbox: mpsc::Sender<Frame>,
}

/// Everything a socket task needs after admission
#[derive(Debug)]
pub struct Admission {
    pub player_id: PlayerId,
    pub session_id: Uuid,
    pub outbox_rx: mpsc::Receiver<Frame>,
}

/// Outcome of pushing a frame to one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// Outbox full, frame dropped
    Lagging,
    /// Socket writer already gone
    Closed,
}

/// Owns the id→outbox table. Ids are the lowest free slots, so a freed id is
/// handed to the next connection.
pub struct ConnectionManager {
    slots: Mutex<[Option<PlayerConnection>; MAX_PLAYERS]>,
    outbox_capacity: usize,
}

impl ConnectionManager {
    pub fn new(outbox_capacity: usize) -> Self {
        Self {
            slots: Mutex::new(std::array::from_fn(|_| None)),
            outbox_capacity: outbox_capacity.max(1),
        }
    }

    /// Reserve the lowest free id, or reject when every slot is taken
    pub fn admit(&self) -> Result<Admission, AdmitError> {
        let mut slots = self.slots.lock();
        let Some(index) = slots.iter().position(Option::is_none) else {
            warn!(max_players = MAX_PLAYERS, "Connection rejected, room full");
            return Err(AdmitError::Full(MAX_PLAYERS));
        };

        let player_id = index as PlayerId;
        let session_id = Uuid::new_v4();
        let (outbox, outbox_rx) = mpsc::channel(self.outbox_capacity);

        slots[index] = Some(PlayerConnection {
            player_id,
            session_id,
            outbox,
        });

        info!(player_id, session_id = %session_id, "Connection admitted");
        Ok(Admission {
            player_id,
            session_id,
            outbox_rx,
        })
    }

    /// Free a slot, but only if it still belongs to this session
    pub fn release(&self, player_id: PlayerId, session_id: Uuid) -> bool {
        let mut slots = self.slots.lock();
        match slots.get_mut(player_id as usize) {
            Some(slot) if slot.as_ref().is_some_and(|c| c.session_id == session_id) => {
                *slot = None;
                info!(player_id, session_id = %session_id, "Connection released");
                true
            }
            _ => {
                debug!(player_id, session_id = %session_id, "Release for stale session ignored");
                false
            }
        }
    }

    pub fn connected_ids(&self) -> Vec<PlayerId> {
        self.slots
            .lock()
            .iter()
            .flatten()
            .map(|c| c.player_id)
            .collect()
    }

    pub fn connected_count(&self) -> usize {
        self.slots.lock().iter().flatten().count()
    }

    /// Queue a frame for one player without waiting on its socket
    pub fn send_to(&self, player_id: PlayerId, frame: Frame) -> Delivery {
        let outbox = {
            let slots = self.slots.lock();
            match slots.get(player_id as usize).and_then(Option::as_ref) {
                Some(conn) => conn.outbox.clone(),
                None => return Delivery::Closed,
            }
        };

        match outbox.try_send(frame) {
            Ok(()) => Delivery::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => Delivery::Lagging,
            Err(mpsc::error::TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[test]
    fn test_ids_assigned_lowest_first() {
        let manager = ConnectionManager::new(4);
        let a = assert_ok!(manager.admit());
        let b = assert_ok!(manager.admit());
        assert_eq!(a.player_id, 0);
        assert_eq!(b.player_id, 1);
        assert_eq!(manager.connected_count(), 2);
    }

    #[test]
    fn test_third_connection_is_rejected() {
        let manager = ConnectionManager::new(4);
        let _a = manager.admit().unwrap();
        let _b = manager.admit().unwrap();
        assert_eq!(manager.admit().unwrap_err(), AdmitError::Full(2));
        assert_eq!(manager.connected_ids(), vec![0, 1]);
    }

    #[test]
    fn test_freed_id_is_reused() {
        let manager = ConnectionManager::new(4);
        let a = manager.admit().unwrap();
        let _b = manager.admit().unwrap();

        assert!(manager.release(a.player_id, a.session_id));
        let c = manager.admit().unwrap();
        assert_eq!(c.player_id, 0);
        assert_ne!(c.session_id, a.session_id);

        // The old session cannot evict the new one
        assert!(!manager.release(a.player_id, a.session_id));
        assert_eq!(manager.connected_count(), 2);
    }

    #[tokio::test]
    async fn test_send_to_reaches_outbox() {
        let manager = ConnectionManager::new(4);
        let mut admission = manager.admit().unwrap();

        assert_eq!(manager.send_to(0, Arc::from("hello")), Delivery::Queued);
        assert_eq!(admission.outbox_rx.recv().await.as_deref(), Some("hello"));
        assert_eq!(manager.send_to(1, Arc::from("nobody")), Delivery::Closed);
    }

    #[test]
    fn test_slow_outbox_drops_frames() {
        let manager = ConnectionManager::new(1);
        let _admission = manager.admit().unwrap();

        assert_eq!(manager.send_to(0, Arc::from("a")), Delivery::Queued);
        assert_eq!(manager.send_to(0, Arc::from("b")), Delivery::Lagging);
    }

    #[test]
    fn test_dropped_receiver_reports_closed() {
        let manager = ConnectionManager::new(1);
        let admission = manager.admit().unwrap();
        drop(admission);
        assert_eq!(manager.send_to(0, Arc::from("a")), Delivery::Closed);
    }
}
