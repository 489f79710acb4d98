//! Helpers shared by unit tests: an ordered event log and timed handlers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::signal::Completion;

#[derive(Clone, Default)]
pub(crate) struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub(crate) fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub(crate) fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }
}

/// Handler logging `<label>-start`, sleeping `ms`, logging `<label>-end`, then succeeding.
pub(crate) fn timed(log: &Log, label: &'static str, ms: u64) -> impl FnOnce(Completion) + Send + use<> {
    let log = log.clone();
    move |done| {
        log.push(format!("{label}-start"));
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            log.push(format!("{label}-end"));
            done.ok();
        });
    }
}

/// Like [`timed`] but fails with `error`.
pub(crate) fn timed_fail(
    log: &Log,
    label: &'static str,
    ms: u64,
    error: &'static str,
) -> impl FnOnce(Completion) + Send + use<> {
    let log = log.clone();
    move |done| {
        log.push(format!("{label}-start"));
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            log.push(format!("{label}-end"));
            done.fail(error);
        });
    }
}
