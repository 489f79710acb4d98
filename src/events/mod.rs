//! Runtime events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Lifecycle` (status, setup, listening, close),
//!   lifecycle-scoped `Readyable`s (activation, resolution),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the lifecycle listener (feeds `PendingTracker` and fans
//!   out to `SubscriberSet`), and any receiver from `Lifecycle::events()`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
