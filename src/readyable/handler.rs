//! # Handlers: units of work gated by a readyable.
//!
//! A [`Handler`] is started once, after every dependency of its readyable
//! succeeded, and reports back through the [`Completion`] it is given.
//!
//! Two shapes are supported:
//! - any `FnOnce(Completion)` closure (callback style; the closure may hand
//!   the completion to a timer, another task, an external callback...);
//! - [`HandlerFn`], wrapping an async closure that returns
//!   `Result<(), ReadyError>`; it is spawned on the current tokio runtime.
//!
//! ## Example
//! ```rust
//! use readyvisor::{HandlerFn, ReadyError, Readyable};
//!
//! let db = Readyable::new("db");
//! db.handle(|done| done.ok());
//! db.handle_async(|| async { Ok::<(), ReadyError>(()) });
//! db.attach(HandlerFn::new(|| async { Ok::<(), ReadyError>(()) }));
//! ```

use std::fmt;
use std::future::Future;

use crate::error::ReadyError;
use crate::signal::Completion;

/// One-shot unit of work attached to a readyable.
pub trait Handler: Send + 'static {
    /// Starts the work. `done` must eventually be finished exactly once;
    /// until then the owning readyable stays pending.
    fn handle(self: Box<Self>, done: Completion);
}

impl<F> Handler for F
where
    F: FnOnce(Completion) + Send + 'static,
{
    fn handle(self: Box<Self>, done: Completion) {
        (*self)(done)
    }
}

/// Async-closure handler.
///
/// The closure is called when the handler starts; the returned future is
/// spawned with [`tokio::spawn`] and its result finishes the completion.
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HandlerFn")
    }
}

impl<F, Fut, E> Handler for HandlerFn<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<ReadyError> + Send + 'static,
{
    fn handle(self: Box<Self>, done: Completion) {
        let fut = (self.f)();
        tokio::spawn(async move {
            done.finish(fut.await);
        });
    }
}

pub(crate) type BoxHandler = Box<dyn Handler>;
