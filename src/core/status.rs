//! # Lifecycle status and phases.
//!
//! [`Status`] is the coarse state of one host. It only moves forward:
//!
//! ```text
//! Uninitialized ─► Initializing ─► Initialized ─► Ready ─► Closing ─► Closed
//!        └──────────────┴───────────────┴───────────┴─────────┴──────► Failed
//! ```
//!
//! `Closed` and `Failed` are terminal. A transition to an earlier or equal
//! status is ignored, so a late `ready` resolution arriving after closing
//! began cannot move the host back.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::events::{Bus, Event, EventKind};

/// Coarse state of a lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Built; plugins may still register setups.
    Uninitialized,
    /// Setups are running.
    Initializing,
    /// Setups ran and `ready` is activated.
    Initialized,
    /// `ready` succeeded.
    Ready,
    /// Host close was intercepted; `closing` is activated.
    Closing,
    /// `closed` succeeded.
    Closed,
    /// A setup faulted, or `ready`/`closed` failed.
    Failed,
}

impl Status {
    /// True for `Closed` and `Failed`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Closed | Status::Failed)
    }

    /// Stable lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Uninitialized => "uninitialized",
            Status::Initializing => "initializing",
            Status::Initialized => "initialized",
            Status::Ready => "ready",
            Status::Closing => "closing",
            Status::Closed => "closed",
            Status::Failed => "failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four well-known readyables of a lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Resolved by the host's one-shot listening notification.
    Listening,
    /// Depends on `Listening`; the host is usable once it succeeds.
    Ready,
    /// Activated when the host close is intercepted; runs the original close.
    Closing,
    /// Depends on `Closing`; activated once `Closing` resolved either way.
    Closed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Listening => "listening",
            Phase::Ready => "ready",
            Phase::Closing => "closing",
            Phase::Closed => "closed",
        }
    }
}

/// Shared, monotonic status holder publishing every accepted transition.
pub(crate) struct StatusCell {
    current: Mutex<Status>,
    bus: Bus,
    host: Arc<str>,
}

impl StatusCell {
    pub(crate) fn new(bus: Bus, host: Arc<str>) -> Self {
        Self {
            current: Mutex::new(Status::Uninitialized),
            bus,
            host,
        }
    }

    pub(crate) fn get(&self) -> Status {
        *self.lock()
    }

    /// Moves to `next` if it is later than the current status and the
    /// current status is not terminal. Returns whether the move happened.
    pub(crate) fn advance(&self, next: Status) -> bool {
        let mut current = self.lock();
        let from = *current;
        if from.is_terminal() || next <= from {
            debug!(host = %self.host, status = %from, ignored = %next, "status transition ignored");
            return false;
        }
        *current = next;
        // Published under the lock so StatusChanged events keep transition order.
        self.bus.publish(
            Event::new(EventKind::StatusChanged)
                .with_host(Arc::clone(&self.host))
                .with_status(next),
        );
        drop(current);
        info!(host = %self.host, from = %from, to = %next, "lifecycle status changed");
        true
    }

    fn lock(&self) -> MutexGuard<'_, Status> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_cell() -> (StatusCell, tokio::sync::broadcast::Receiver<Event>) {
        let bus = Bus::new(16);
        let rx = bus.subscribe();
        (StatusCell::new(bus, Arc::from("api")), rx)
    }

    #[test]
    fn moves_forward_and_publishes() {
        let (cell, mut rx) = status_cell();
        assert_eq!(cell.get(), Status::Uninitialized);
        assert!(cell.advance(Status::Initializing));
        assert!(cell.advance(Status::Ready));
        assert_eq!(cell.get(), Status::Ready);

        let first = rx.try_recv().unwrap();
        assert_eq!(first.kind, EventKind::StatusChanged);
        assert_eq!(first.status, Some(Status::Initializing));
        assert_eq!(first.host.as_deref(), Some("api"));
        assert_eq!(rx.try_recv().unwrap().status, Some(Status::Ready));
    }

    #[test]
    fn never_moves_backwards() {
        let (cell, mut rx) = status_cell();
        cell.advance(Status::Closing);
        let _ = rx.try_recv();
        assert!(!cell.advance(Status::Ready));
        assert!(!cell.advance(Status::Closing));
        assert_eq!(cell.get(), Status::Closing);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn terminal_states_stick() {
        let (cell, _rx) = status_cell();
        cell.advance(Status::Closed);
        assert!(!cell.advance(Status::Failed));
        assert_eq!(cell.get(), Status::Closed);

        let (cell, _rx) = status_cell();
        cell.advance(Status::Initializing);
        assert!(cell.advance(Status::Failed));
        assert!(!cell.advance(Status::Closed));
        assert_eq!(cell.get(), Status::Failed);
    }

    #[test]
    fn labels() {
        assert_eq!(Status::Initialized.to_string(), "initialized");
        assert!(Status::Failed.is_terminal());
        assert!(!Status::Closing.is_terminal());
        assert_eq!(Phase::Closed.as_str(), "closed");
    }
}
