//! # One-shot, cached completion signal.
//!
//! A [`Signal`] starts **pending** and is resolved exactly once by the holder
//! of its [`Completion`]. The outcome is cached: every listener, whether it
//! subscribed before or after resolution, observes the same outcome exactly once.
//!
//! ## Internal scheme
//! ```text
//! Signal::pending() ──► (Completion, Signal)
//!
//! subscribe(l):
//!   ├─ Pending(listeners)  ─► listeners.push(l)
//!   └─ Resolved(outcome)   ─► l(outcome.clone())        (outside the lock)
//!
//! Completion::finish(outcome):
//!   ├─ lock: Pending(listeners) ─► Resolved(outcome); take listeners
//!   └─ unlock; drain listeners in registration order
//! ```
//!
//! ## Rules
//! - The terminal state is written **before** the drain, so a listener that
//!   races with resolution is either drained or invoked directly, never lost.
//! - Listeners never run while the state lock is held.
//! - `Completion` is consumed on use: a signal cannot be resolved twice.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;
use tracing::warn;

use crate::error::ReadyError;

/// Result every signal resolves to.
pub type Outcome = Result<(), ReadyError>;

type Listener = Box<dyn FnOnce(Outcome) + Send + 'static>;

enum State {
    Pending(Vec<Listener>),
    Resolved(Outcome),
}

/// Tri-state read of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Readiness {
    /// Not yet resolved.
    Pending,
    /// Resolved without error.
    Succeeded,
    /// Resolved with an error.
    Failed,
}

impl Readiness {
    #[inline]
    pub fn is_pending(self) -> bool {
        matches!(self, Readiness::Pending)
    }

    #[inline]
    pub fn is_succeeded(self) -> bool {
        matches!(self, Readiness::Succeeded)
    }

    #[inline]
    pub fn is_failed(self) -> bool {
        matches!(self, Readiness::Failed)
    }
}

/// Cloneable observer handle of a one-shot outcome.
///
/// Clones share the same state.
///
/// ## Example
/// ```
/// use std::sync::{Arc, Mutex};
/// use readyvisor::{Readiness, Signal};
///
/// let (done, signal) = Signal::pending();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let early = seen.clone();
/// signal.subscribe(move |o| early.lock().unwrap().push(("early", o.is_ok())));
/// assert_eq!(signal.readiness(), Readiness::Pending);
///
/// done.ok();
///
/// let late = seen.clone();
/// signal.subscribe(move |o| late.lock().unwrap().push(("late", o.is_ok())));
/// assert_eq!(*seen.lock().unwrap(), vec![("early", true), ("late", true)]);
/// ```
#[derive(Clone)]
pub struct Signal {
    state: Arc<Mutex<State>>,
}

impl Signal {
    /// Creates a pending signal and the completion that resolves it.
    #[must_use]
    pub fn pending() -> (Completion, Signal) {
        let state = Arc::new(Mutex::new(State::Pending(Vec::new())));
        let done = Completion {
            state: Some(Arc::clone(&state)),
        };
        (done, Signal { state })
    }

    /// Creates a signal that is already resolved with `outcome`.
    #[must_use]
    pub fn resolved(outcome: Outcome) -> Signal {
        Signal {
            state: Arc::new(Mutex::new(State::Resolved(outcome))),
        }
    }

    /// Creates a signal that already succeeded.
    #[must_use]
    pub fn ok() -> Signal {
        Self::resolved(Ok(()))
    }

    /// Registers a listener for the outcome.
    ///
    /// - While pending, the listener is queued (registration order is kept).
    /// - Once resolved, the listener runs immediately on the calling thread
    ///   with the cached outcome.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let mut state = lock(&self.state);
        match &mut *state {
            State::Pending(listeners) => listeners.push(Box::new(listener)),
            State::Resolved(outcome) => {
                let outcome = outcome.clone();
                drop(state);
                listener(outcome);
            }
        }
    }

    /// Waits for the outcome.
    ///
    /// Returns immediately when already resolved. If the signal is never
    /// resolved this future never completes.
    pub async fn wait(&self) -> Outcome {
        if let Some(outcome) = self.outcome() {
            return outcome;
        }
        let (tx, rx) = oneshot::channel();
        self.subscribe(move |outcome| {
            let _ = tx.send(outcome);
        });
        match rx.await {
            Ok(outcome) => outcome,
            // The listener is owned by the state we borrow, so it can only be
            // dropped unsent if the signal stays pending forever.
            Err(_) => std::future::pending().await,
        }
    }

    /// Returns the cached outcome, if resolved.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        match &*lock(&self.state) {
            State::Pending(_) => None,
            State::Resolved(outcome) => Some(outcome.clone()),
        }
    }

    /// Tri-state read, no side effects.
    #[must_use]
    pub fn readiness(&self) -> Readiness {
        match &*lock(&self.state) {
            State::Pending(_) => Readiness::Pending,
            State::Resolved(Ok(())) => Readiness::Succeeded,
            State::Resolved(Err(_)) => Readiness::Failed,
        }
    }

    /// True if both handles observe the same underlying state.
    #[must_use]
    pub fn same(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("readiness", &self.readiness())
            .finish()
    }
}

/// Producer half of a [`Signal`].
///
/// Handed to handlers as their completion callback and returned by the
/// one-shot bridge. Finishing consumes it, so it can fire at most once.
/// Dropping it unfinished leaves the signal pending forever (a warning is logged).
#[must_use = "a dropped completion leaves its signal pending forever"]
pub struct Completion {
    state: Option<Arc<Mutex<State>>>,
}

impl Completion {
    /// Resolves the signal as succeeded.
    pub fn ok(self) {
        self.finish::<ReadyError>(Ok(()));
    }

    /// Resolves the signal as failed.
    pub fn fail(self, error: impl Into<ReadyError>) {
        self.finish(Err(error));
    }

    /// Resolves the signal with `result`.
    pub fn finish<E>(mut self, result: Result<(), E>)
    where
        E: Into<ReadyError>,
    {
        if let Some(state) = self.state.take() {
            resolve(&state, result.map_err(Into::into));
        }
    }

    /// Drops the completion without resolving and without the warning; for
    /// producers whose signal can no longer be observed.
    pub(crate) fn dismiss(mut self) {
        self.state = None;
    }

    /// Adapts this completion into a plain callback for `FnMut` call sites.
    ///
    /// The callback is one-shot: invoking it a second time panics.
    pub fn into_once_fn(self) -> impl FnMut(Outcome) + Send + 'static {
        let mut slot = Some(self);
        move |outcome| match slot.take() {
            Some(done) => done.finish(outcome),
            None => panic!("one-shot completion callback invoked more than once"),
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.state.is_some() {
            warn!("completion dropped without being finished; its signal stays pending");
        }
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("finished", &self.state.is_none())
            .finish()
    }
}

fn resolve(state: &Mutex<State>, outcome: Outcome) {
    let listeners = {
        let mut guard = lock(state);
        if matches!(&*guard, State::Resolved(_)) {
            panic!("signal resolved more than once");
        }
        match std::mem::replace(&mut *guard, State::Resolved(outcome.clone())) {
            State::Pending(listeners) => listeners,
            State::Resolved(_) => Vec::new(),
        }
    };
    for listener in listeners {
        listener(outcome.clone());
    }
}

/// The state is always replaced in one assignment, so a poisoned lock still
/// holds a consistent value.
fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
