//! # Event bus for lifecycle and readyable events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. Readyables publish from whatever
//! thread resolves them, so publishing must never block or await.
//!
//! ```text
//! Readyable (activated/resolved) ──┐
//! Lifecycle (status/setup/close) ──┼──► Bus ──► lifecycle listener ──► PendingTracker
//! SubscriberSet (overflow/panic) ──┘                                └─► SubscriberSet
//! ```
//!
//! ## Rules
//! - `publish()` never blocks; with no receivers the event is dropped.
//! - One ring buffer of `capacity` events is shared by all receivers; a
//!   receiver that falls behind observes `RecvError::Lagged(n)`.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone; clones publish into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[test]
    fn receivers_only_see_later_events() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::CloseRequested));
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::StatusChanged));
        assert_eq!(rx.try_recv().unwrap().kind, EventKind::StatusChanged);
        assert!(rx.try_recv().is_err());
    }
}
