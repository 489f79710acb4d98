//! # LogWriter: events as tracing records
//!
//! Re-emits every [`Event`] through `tracing` under the `readyvisor::events`
//! target. Failures log at `warn`, everything else at `info`/`debug`.
//!
//! ## Example output (with `tracing-subscriber`'s fmt layer)
//! ```text
//! INFO readyvisor::events: status host=api status=Initializing
//! DEBUG readyvisor::events: activated host=api readyable=ready
//! WARN readyvisor::events: failed host=api readyable=db reason=connection refused
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let host = e.host.as_deref().unwrap_or("-");
        let name = e.readyable.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::StatusChanged => {
                info!(target: "readyvisor::events", host, status = ?e.status, "status");
            }
            EventKind::SetupFailed => {
                warn!(target: "readyvisor::events", host, reason, "setup-failed");
            }
            EventKind::ListeningNotified => {
                info!(target: "readyvisor::events", host, reason, "listening");
            }
            EventKind::CloseRequested => {
                info!(target: "readyvisor::events", host, "close-requested");
            }
            EventKind::ReadyableActivated => {
                debug!(target: "readyvisor::events", host, readyable = name, "activated");
            }
            EventKind::ReadyableSucceeded => {
                debug!(target: "readyvisor::events", host, readyable = name, "succeeded");
            }
            EventKind::ReadyableFailed => {
                warn!(target: "readyvisor::events", host, readyable = name, reason, "failed");
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "readyvisor::events", subscriber = name, reason, "subscriber-overflow");
            }
            EventKind::SubscriberPanicked => {
                warn!(target: "readyvisor::events", subscriber = name, reason, "subscriber-panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
