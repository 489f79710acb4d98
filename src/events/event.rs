//! # Runtime events emitted by the lifecycle and its readyables.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Lifecycle events**: status transitions, setup faults, close requests
//! - **Readyable events**: activation and resolution of graph nodes
//! - **Subscriber events**: overflow and panics inside user subscribers
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! host label, the readyable name, and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use readyvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ReadyableFailed)
//!     .with_host("api")
//!     .with_readyable("db")
//!     .with_reason("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::ReadyableFailed);
//! assert_eq!(ev.readyable.as_deref(), Some("db"));
//! assert_eq!(ev.reason.as_deref(), Some("connection refused"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::Status;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `readyable`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `readyable`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Lifecycle events ===
    /// Lifecycle status advanced.
    ///
    /// Sets:
    /// - `host`: lifecycle name
    /// - `status`: new status
    StatusChanged,

    /// A setup callback failed; initialization aborts.
    ///
    /// Sets:
    /// - `host`: lifecycle name
    /// - `reason`: error or panic message
    SetupFailed,

    /// The host reported its transport listening (or failing to listen).
    ///
    /// Sets:
    /// - `host`: lifecycle name
    /// - `reason`: error message, if the host reported a failure
    ListeningNotified,

    /// The host close operation was intercepted.
    ///
    /// Sets:
    /// - `host`: lifecycle name
    CloseRequested,

    // === Readyable events ===
    /// Readyable activated (children, dependencies and handlers started).
    ///
    /// Sets:
    /// - `host`: lifecycle name
    /// - `readyable`: readyable name
    ReadyableActivated,

    /// Readyable resolved without error.
    ///
    /// Sets:
    /// - `host`: lifecycle name
    /// - `readyable`: readyable name
    ReadyableSucceeded,

    /// Readyable resolved with an error.
    ///
    /// Sets:
    /// - `host`: lifecycle name
    /// - `readyable`: readyable name
    /// - `reason`: failure message
    ReadyableFailed,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Label of the lifecycle (host) that emitted the event.
    pub host: Option<Arc<str>>,
    /// Readyable (or subscriber) name, if applicable.
    pub readyable: Option<Arc<str>>,
    /// New lifecycle status, for [`EventKind::StatusChanged`].
    pub status: Option<Status>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            host: None,
            readyable: None,
            status: None,
            reason: None,
        }
    }

    /// Attaches the lifecycle label.
    #[inline]
    pub fn with_host(mut self, host: impl Into<Arc<str>>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Attaches a readyable name.
    #[inline]
    pub fn with_readyable(mut self, name: impl Into<Arc<str>>) -> Self {
        self.readyable = Some(name.into());
        self
    }

    /// Attaches a lifecycle status.
    #[inline]
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_readyable(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_readyable(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_readyable_resolution(&self) -> bool {
        matches!(
            self.kind,
            EventKind::ReadyableSucceeded | EventKind::ReadyableFailed
        )
    }
}
