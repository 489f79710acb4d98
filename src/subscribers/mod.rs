//! # Event subscribers.
//!
//! ```text
//! Bus ──► lifecycle listener ──► SubscriberSet::emit(&Event)
//!                                   ├──► [queue S1] ─► worker ─► S1.on_event()
//!                                   └──► [queue SN] ─► worker ─► SN.on_event()
//! ```
//!
//! - [`Subscribe`]: trait implemented by observers.
//! - [`SubscriberSet`]: non-blocking fan-out with per-subscriber queues.
//! - `LogWriter` (feature `logging`): re-emits events as `tracing` records.

mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
mod embedded;

pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
