//! # One-shot bridge from an external event into the graph.
//!
//! [`cb`] adds a placeholder dependency to a readyable and returns the
//! [`Completion`] that resolves it. Typical uses: "transport is listening",
//! "wrapped close finished".
//!
//! ```text
//! cb(&r) ──► (done, placeholder)      r.depend_on(placeholder)
//!                │
//!   external event ──► done.finish(result) ──► placeholder resolved ──► r may proceed
//! ```

use crate::signal::{Completion, Signal};

use super::node::Readyable;

/// Adds a one-shot external dependency to `readyable`.
///
/// Finishing the completion with an error fails `readyable` (its handlers
/// never start). For call sites that need an `FnMut`, see
/// [`Completion::into_once_fn`].
///
/// # Panics
/// If `readyable` is already activated.
pub fn cb(readyable: &Readyable) -> Completion {
    let (done, placeholder) = Signal::pending();
    readyable.depend_on(placeholder);
    done
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReadyError;
    use crate::signal::Readiness;
    use crate::testing::{Log, timed};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn one_off_dependency_success() {
        let log = Log::default();
        let readyable = Readyable::new("listening");
        let listened = cb(&readyable);
        readyable.handle(timed(&log, "readyable", 5));

        readyable.run();
        assert!(log.is_empty());

        tokio::time::sleep(Duration::from_millis(15)).await;
        assert!(log.is_empty());
        listened.ok();
        assert_eq!(log.entries(), ["readyable-start"]);

        assert_eq!(readyable.wait().await, Ok(()));
        assert_eq!(log.entries(), ["readyable-start", "readyable-end"]);
    }

    #[tokio::test(start_paused = true)]
    async fn one_off_dependency_error() {
        let log = Log::default();
        let readyable = Readyable::new("listening");
        let listened = cb(&readyable);
        readyable.handle(timed(&log, "readyable", 5));

        readyable.run();
        tokio::time::sleep(Duration::from_millis(15)).await;
        listened.fail("bind failed");

        assert_eq!(readyable.wait().await, Err(ReadyError::fail("bind failed")));
        assert_eq!(readyable.readiness(), Readiness::Failed);
        assert!(log.is_empty());
    }

    #[test]
    fn callback_form_resolves_once() {
        let readyable = Readyable::new("closed");
        let mut notify = cb(&readyable).into_once_fn();
        readyable.run();
        assert!(readyable.readiness().is_pending());
        notify(Ok(()));
        assert!(readyable.readiness().is_succeeded());
    }

    #[test]
    #[should_panic(expected = "after activation")]
    fn bridge_after_activation_panics() {
        let readyable = Readyable::new("late");
        readyable.run();
        let _done = cb(&readyable);
    }
}
