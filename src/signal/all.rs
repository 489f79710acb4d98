//! # Fan-in over signals.
//!
//! [`all`] combines any number of signals into one derived signal:
//! - succeeds once **every** member succeeded;
//! - fails with the **first** member failure observed.
//!
//! Members are never cancelled; outcomes arriving after the derived signal
//! resolved are ignored.
//!
//! ```text
//! member[0] ─┐
//! member[1] ─┼─► Barrier { remaining, completion } ─► derived Signal
//! member[N] ─┘
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use super::deps::Dependencies;
use super::state::{Completion, Outcome, Signal};

/// Shared countdown for one fan-in.
struct Barrier {
    remaining: usize,
    done: Option<Completion>,
}

impl Barrier {
    /// Records one member outcome; returns the completion once the derived
    /// signal should resolve.
    fn record(&mut self, outcome: &Outcome) -> Option<Completion> {
        match outcome {
            Err(_) => self.done.take(),
            Ok(()) => {
                self.remaining = self.remaining.saturating_sub(1);
                if self.remaining == 0 {
                    self.done.take()
                } else {
                    None
                }
            }
        }
    }
}

/// Combines `deps` into a single signal (fan-in barrier).
///
/// An empty set resolves as succeeded immediately.
///
/// ## Example
/// ```
/// use readyvisor::{Readiness, Signal, all};
///
/// let (a_done, a) = Signal::pending();
/// let (b_done, b) = Signal::pending();
/// let both = all(vec![a, b]);
///
/// a_done.ok();
/// assert_eq!(both.readiness(), Readiness::Pending);
/// b_done.ok();
/// assert_eq!(both.readiness(), Readiness::Succeeded);
/// ```
#[must_use]
pub fn all<D: Dependencies>(deps: D) -> Signal {
    all_of(deps.into_signals())
}

/// Subscribes `callback` to the fan-in of `deps`; it fires exactly once.
pub fn run<D, F>(deps: D, callback: F)
where
    D: Dependencies,
    F: FnOnce(Outcome) + Send + 'static,
{
    all(deps).subscribe(callback);
}

pub(crate) fn all_of(signals: Vec<Signal>) -> Signal {
    if signals.is_empty() {
        return Signal::ok();
    }

    let (done, derived) = Signal::pending();
    let barrier = Arc::new(Mutex::new(Barrier {
        remaining: signals.len(),
        done: Some(done),
    }));

    for member in signals {
        let barrier = Arc::clone(&barrier);
        member.subscribe(move |outcome| {
            let ready = barrier
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(&outcome);
            if let Some(done) = ready {
                done.finish(outcome);
            }
        });
    }
    derived
}
