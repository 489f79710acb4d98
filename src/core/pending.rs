//! # Tracker of activated-but-unresolved readyables.
//!
//! Fed by the lifecycle bus listener. A readyable that never resolves
//! stalls everything depending on it; [`PendingTracker::snapshot`] names
//! the ones still waiting.
//!
//! ## Architecture
//! ```text
//! Readyable ──► Bus ──► lifecycle listener ──► PendingTracker::update()
//!                                                     │
//!                                                     ▼
//!                                          HashMap<name, {last_seq, pending}>
//! ```
//!
//! ## Rules
//! - `ReadyableActivated` marks pending; `ReadyableSucceeded`/`ReadyableFailed` clear it.
//! - Events with `seq <= last_seq` for the same readyable are **rejected** (stale).
//! - Reads are **eventually consistent** with the graph.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::events::{Event, EventKind};

#[derive(Debug, Clone, Copy)]
struct Entry {
    last_seq: u64,
    pending: bool,
}

pub(crate) struct PendingTracker {
    state: RwLock<HashMap<String, Entry>>,
}

impl PendingTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
        }
    }

    /// Applies a readyable event if it is newer than the last one seen for
    /// that readyable. Returns whether the pending flag changed.
    pub(crate) async fn update(&self, ev: &Event) -> bool {
        let pending = match ev.kind {
            EventKind::ReadyableActivated => true,
            _ if ev.is_readyable_resolution() => false,
            _ => return false,
        };
        let Some(name) = ev.readyable.as_deref() else {
            return false;
        };

        let mut state = self.state.write().await;
        let entry = state.entry(name.to_string()).or_insert(Entry {
            last_seq: 0,
            pending: false,
        });
        if ev.seq <= entry.last_seq {
            return false;
        }
        entry.last_seq = ev.seq;
        let changed = entry.pending != pending;
        entry.pending = pending;
        changed
    }

    /// Sorted names of readyables activated and not yet resolved.
    pub(crate) async fn snapshot(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut names: Vec<String> = state
            .iter()
            .filter(|(_, e)| e.pending)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        names
    }
}
