//! # Readiness-gated functions.
//!
//! Both wrappers own a private, already-activated [`Readyable`] (the *gate*)
//! that depends on the dependencies given at creation. The gate is computed
//! once; every call observes its cached outcome.
//!
//! | Wrapper     | Call before the gate succeeded          | After |
//! |-------------|------------------------------------------|-------|
//! | [`SyncFn`]  | `Err(ReadyError::NotReady)`, `f` not run | `f(args)` |
//! | [`AsyncFn`] | waits for the gate; forwards its error   | `f(args).await` |
//!
//! Arguments are passed as one value; use a tuple for several.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::ReadyError;
use crate::readyable::Readyable;
use crate::signal::{Readiness, Signal};

/// Synchronous function callable only once its gate succeeded.
///
/// ## Example
/// ```
/// use readyvisor::{Readyable, SyncFn};
///
/// let db = Readyable::new("db");
/// let count = SyncFn::new("count", &db, |table: &str| table.len());
///
/// assert!(count.call("users").unwrap_err().is_not_ready());
/// db.run();
/// assert_eq!(count.call("users"), Ok(5));
/// ```
pub struct SyncFn<F> {
    gate: Readyable,
    f: F,
}

impl<F> SyncFn<F> {
    /// Wraps `f` behind a gate depending on `deps`. The gate is activated
    /// immediately.
    pub fn new<D>(name: impl Into<Arc<str>>, deps: D, f: F) -> Self
    where
        D: crate::signal::Dependencies,
    {
        Self::with_gate(Readyable::new(name), deps, f)
    }

    pub(crate) fn with_gate<D>(gate: Readyable, deps: D, f: F) -> Self
    where
        D: crate::signal::Dependencies,
    {
        gate.depend_on(deps).run();
        Self { gate, f }
    }

    /// Invokes `f` if the gate succeeded.
    ///
    /// # Errors
    /// [`ReadyError::NotReady`] while the gate is pending, and also after
    /// it failed.
    pub fn call<A, R>(&self, args: A) -> Result<R, ReadyError>
    where
        F: Fn(A) -> R,
    {
        match self.gate.readiness() {
            Readiness::Succeeded => Ok((self.f)(args)),
            Readiness::Pending | Readiness::Failed => Err(ReadyError::not_ready(self.gate.name())),
        }
    }

    /// The gate, for composing "this function is callable" into the graph.
    pub fn ready(&self) -> &Readyable {
        &self.gate
    }

    /// Shorthand for the gate's signal.
    pub fn signal(&self) -> Signal {
        self.gate.signal()
    }

    pub fn name(&self) -> &str {
        self.gate.name()
    }
}

impl<F> fmt::Debug for SyncFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncFn").field("gate", &self.gate).finish()
    }
}

/// Async function whose calls wait for its gate.
///
/// Calls issued while the gate is pending are all serviced once it
/// resolves; the gate never re-runs.
pub struct AsyncFn<F> {
    gate: Readyable,
    f: F,
}

impl<F> AsyncFn<F> {
    /// Wraps `f` behind a gate depending on `deps`. The gate is activated
    /// immediately.
    pub fn new<D>(name: impl Into<Arc<str>>, deps: D, f: F) -> Self
    where
        D: crate::signal::Dependencies,
    {
        Self::with_gate(Readyable::new(name), deps, f)
    }

    pub(crate) fn with_gate<D>(gate: Readyable, deps: D, f: F) -> Self
    where
        D: crate::signal::Dependencies,
    {
        gate.depend_on(deps).run();
        Self { gate, f }
    }

    /// Waits for the gate, then invokes `f`.
    ///
    /// # Errors
    /// The gate's error if it failed, otherwise whatever `f` returns.
    pub async fn call<A, Fut, R, E>(&self, args: A) -> Result<R, ReadyError>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: Into<ReadyError>,
    {
        if !self.gate.readiness().is_succeeded() {
            self.gate.wait().await?;
        }
        (self.f)(args).await.map_err(Into::into)
    }

    /// The gate, for composing "this function is callable" into the graph.
    pub fn ready(&self) -> &Readyable {
        &self.gate
    }

    pub fn signal(&self) -> Signal {
        self.gate.signal()
    }

    pub fn name(&self) -> &str {
        self.gate.name()
    }
}

impl<F> fmt::Debug for AsyncFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncFn").field("gate", &self.gate).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Log, timed};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn sync_fn_is_not_ready_until_gate_succeeds() {
        let log = Log::default();
        let dep = Readyable::new("dep");
        dep.handle(timed(&log, "dep", 10));
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let double = SyncFn::new("double", &dep, move |x: u32| {
            c.fetch_add(1, Ordering::SeqCst);
            x * 2
        });

        for _ in 0..3 {
            assert_eq!(double.call(1), Err(ReadyError::not_ready("double")));
        }
        dep.run();
        assert!(double.call(1).unwrap_err().is_not_ready());

        double.ready().wait().await.unwrap();
        assert_eq!(double.call(21), Ok(42));
        assert_eq!(double.call(2), Ok(4));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn sync_fn_stays_not_ready_after_gate_failure() {
        let f = SyncFn::new("f", Signal::resolved(Err(ReadyError::fail("down"))), |(): ()| 1);
        assert_eq!(f.ready().readiness(), Readiness::Failed);
        assert_eq!(f.call(()), Err(ReadyError::not_ready("f")));
    }

    #[test]
    fn sync_fn_gate_composes_into_the_graph() {
        let (done, dep) = Signal::pending();
        let f = SyncFn::new("f", dep, |(): ()| ());
        let consumer = Readyable::new("consumer");
        consumer.depend_on(f.ready()).run();
        assert!(consumer.readiness().is_pending());
        done.ok();
        assert!(consumer.readiness().is_succeeded());
        assert_eq!(f.name(), "f");
    }

    #[tokio::test(start_paused = true)]
    async fn async_fn_queues_calls_until_ready() {
        let log = Log::default();
        let dep = Readyable::new("dep");
        dep.handle(timed(&log, "dep", 10));
        let runs = Arc::new(AtomicUsize::new(0));
        let r = runs.clone();
        let add = AsyncFn::new("add", &dep, move |(a, b): (u32, u32)| {
            r.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ReadyError>(a + b) }
        });

        dep.run();
        let results = futures::future::join_all((0..5).map(|i| add.call((i, 10)))).await;
        assert_eq!(
            results,
            vec![Ok(10), Ok(11), Ok(12), Ok(13), Ok(14)]
        );
        assert_eq!(runs.load(Ordering::SeqCst), 5);
        assert_eq!(log.entries(), ["dep-start", "dep-end"]);

        // Ready now: runs straight away.
        assert_eq!(add.call((1, 1)).await, Ok(2));
    }

    #[tokio::test(start_paused = true)]
    async fn async_fn_forwards_gate_error() {
        let dep = Readyable::new("dep");
        dep.handle(|done| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                done.fail("dep broke");
            });
        });
        let runs = Arc::new(AtomicUsize::new(0));
        let r = runs.clone();
        let f = AsyncFn::new("f", &dep, move |(): ()| {
            r.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ReadyError>(()) }
        });
        dep.run();

        let results = futures::future::join_all((0..3).map(|_| f.call(()))).await;
        assert!(results.iter().all(|r| *r == Err(ReadyError::fail("dep broke"))));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn async_fn_maps_function_error() {
        let f = AsyncFn::new("f", Signal::ok(), |code: u16| async move {
            if code == 0 { Ok(()) } else { Err(format!("exit {code}")) }
        });
        assert_eq!(f.call(0).await, Ok(()));
        assert_eq!(f.call(3).await, Err(ReadyError::fail("exit 3")));
    }
}
