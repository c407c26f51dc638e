//! Deterministic scheduled-event queue drained by the tick loop

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Deferred world actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScheduledEvent {
    SpawnWeaponPickup,
    SpawnPowerupPickup,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Entry {
    due_ms: u64,
    /// Insertion order breaks ties between events due at the same instant
    seq: u64,
    event: ScheduledEvent,
}

/// Min-heap of events keyed by due time
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<Entry>>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due_ms: u64, event: ScheduledEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(Entry { due_ms, seq, event }));
    }

    /// Pop every event due at or before `now_ms`, in due order
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<ScheduledEvent> {
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.heap.peek() {
            if entry.due_ms > now_ms {
                break;
            }
            if let Some(Reverse(entry)) = self.heap.pop() {
                due.push(entry.event);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_fire_only_when_due() {
        let mut queue = EventQueue::new();
        queue.schedule(2_000, ScheduledEvent::SpawnWeaponPickup);

        assert!(queue.drain_due(1_999).is_empty());
        assert_eq!(queue.drain_due(2_000), vec![ScheduledEvent::SpawnWeaponPickup]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_due_order_then_insertion_order() {
        let mut queue = EventQueue::new();
        queue.schedule(500, ScheduledEvent::SpawnPowerupPickup);
        queue.schedule(100, ScheduledEvent::SpawnWeaponPickup);
        queue.schedule(500, ScheduledEvent::SpawnWeaponPickup);

        assert_eq!(queue.len(), 3);
        assert_eq!(
            queue.drain_due(1_000),
            vec![
                ScheduledEvent::SpawnWeaponPickup,
                ScheduledEvent::SpawnPowerupPickup,
                ScheduledEvent::SpawnWeaponPickup,
            ]
        );
    }
}
