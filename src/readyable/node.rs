//! # Readyable: a one-shot node of the readiness graph.
//!
//! A [`Readyable`] is configured while inert (`depend_on`, `handle`,
//! `during`), activated exactly once with [`Readyable::run`], and from then
//! on behaves as a read-only cached [`Signal`].
//!
//! ## Activation
//! ```text
//! run()
//!   ├─► children (during) .run()           depth-first, before anything else
//!   ├─► all(dependencies)                  fan-in, concurrently
//!   │      ├─ Err(e) ─► resolve Err(e)      handlers never start
//!   │      └─ Ok     ─► start every handler (fan-out, registration order)
//!   │                     └─► all(handler completions)
//!   │                            ├─ first Err(e) ─► resolve Err(e)
//!   │                            └─ all Ok       ─► resolve Ok
//!   └─► cached outcome broadcast to every current and future subscriber
//! ```
//!
//! ## Rules
//! - Configuring after activation, or activating twice, panics.
//! - Nothing is cancelled: siblings of a failed handler keep running, their
//!   outcome is simply ignored.
//! - Dependency cycles are not detected; a cycle never resolves.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::handler::{BoxHandler, Handler, HandlerFn};
use crate::error::ReadyError;
use crate::events::{Bus, Event, EventKind};
use crate::signal::{AsSignal, Completion, Dependencies, Outcome, Readiness, Signal, all_of};

/// Options for [`Readyable::during`].
#[derive(Debug, Clone)]
pub struct DuringOptions {
    /// Whether the parent's own resolution waits for the child (default `true`).
    pub depend_on: bool,
    /// Child name; defaults to `<parent>/during-<n>`.
    pub name: Option<Arc<str>>,
}

impl DuringOptions {
    /// Child is activated with the parent but does not gate it.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            depend_on: false,
            name: None,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Default for DuringOptions {
    fn default() -> Self {
        Self {
            depend_on: true,
            name: None,
        }
    }
}

/// Where a lifecycle-owned readyable reports its events.
#[derive(Clone)]
pub(crate) struct Scope {
    pub(crate) bus: Bus,
    pub(crate) host: Arc<str>,
}

impl Scope {
    fn publish(&self, ev: Event) {
        self.bus.publish(ev.with_host(Arc::clone(&self.host)));
    }
}

struct Setup {
    done: Completion,
    dependencies: Vec<Signal>,
    handlers: Vec<BoxHandler>,
    children: Vec<Readyable>,
}

enum Stage {
    Configuring(Setup),
    Activated,
}

struct Inner {
    name: Arc<str>,
    signal: Signal,
    scope: Option<Scope>,
    stage: Mutex<Stage>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let stage = self.stage.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Stage::Configuring(setup) = std::mem::replace(stage, Stage::Activated) {
            // Never activated: nobody can observe the outcome any more.
            setup.done.dismiss();
        }
    }
}

/// One-shot activatable node: dependency fan-in, then handler fan-out.
///
/// Cheap to clone; clones refer to the same node.
///
/// ## Example
/// ```rust
/// use readyvisor::{Readiness, Readyable};
///
/// let config = Readyable::new("config");
/// config.handle(|done| done.ok());
///
/// let server = Readyable::new("server");
/// server.depend_on(&config).handle(|done| done.ok());
///
/// server.run();
/// assert_eq!(server.readiness(), Readiness::Pending); // config not activated yet
///
/// config.run();
/// assert_eq!(server.readiness(), Readiness::Succeeded);
/// ```
#[derive(Clone)]
pub struct Readyable {
    inner: Arc<Inner>,
}

impl Readyable {
    /// Creates an inert readyable.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self::build(name.into(), None)
    }

    pub(crate) fn scoped(name: impl Into<Arc<str>>, scope: Scope) -> Self {
        Self::build(name.into(), Some(scope))
    }

    fn build(name: Arc<str>, scope: Option<Scope>) -> Self {
        let (done, signal) = Signal::pending();
        Self {
            inner: Arc::new(Inner {
                name,
                signal,
                scope,
                stage: Mutex::new(Stage::Configuring(Setup {
                    done,
                    dependencies: Vec::new(),
                    handlers: Vec::new(),
                    children: Vec::new(),
                })),
            }),
        }
    }

    /// Adds one or many dependencies; cumulative.
    ///
    /// # Panics
    /// If the readyable is already activated.
    pub fn depend_on<D: Dependencies>(&self, deps: D) -> &Self {
        let signals = deps.into_signals();
        self.configure("depend_on", |setup| setup.dependencies.extend(signals));
        self
    }

    /// Registers a callback-style handler.
    ///
    /// The closure receives a [`Completion`] it must finish exactly once.
    ///
    /// # Panics
    /// If the readyable is already activated.
    pub fn handle<F>(&self, f: F) -> &Self
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        self.attach(f)
    }

    /// Registers an async handler, spawned on tokio when it starts.
    ///
    /// # Panics
    /// If the readyable is already activated.
    pub fn handle_async<F, Fut, E>(&self, f: F) -> &Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<ReadyError> + Send + 'static,
    {
        self.attach(HandlerFn::new(f))
    }

    /// Registers any [`Handler`] implementation.
    ///
    /// # Panics
    /// If the readyable is already activated.
    pub fn attach<H: Handler>(&self, handler: H) -> &Self {
        let handler: BoxHandler = Box::new(handler);
        self.configure("handle", |setup| setup.handlers.push(handler));
        self
    }

    /// Creates a child readyable activated together with this one.
    ///
    /// With `depend_on` (the default) this readyable's resolution also waits
    /// for the child; [`DuringOptions::detached`] only co-activates it.
    ///
    /// # Panics
    /// If the readyable is already activated.
    pub fn during(&self, opts: DuringOptions) -> Readyable {
        self.configure("during", |setup| {
            let name = opts.name.unwrap_or_else(|| {
                format!("{}/during-{}", self.inner.name, setup.children.len() + 1).into()
            });
            let child = Readyable::build(name, self.inner.scope.clone());
            if opts.depend_on {
                setup.dependencies.push(child.signal());
            }
            setup.children.push(child.clone());
            child
        })
    }

    /// Activates the readyable (one-shot).
    ///
    /// # Panics
    /// If called a second time.
    pub fn run(&self) -> &Self {
        let previous = std::mem::replace(&mut *self.lock_stage(), Stage::Activated);
        let Stage::Configuring(setup) = previous else {
            panic!("readyable `{}` activated twice", self.inner.name)
        };
        let Setup {
            done,
            dependencies,
            handlers,
            children,
        } = setup;

        debug!(
            readyable = %self.inner.name,
            dependencies = dependencies.len(),
            handlers = handlers.len(),
            children = children.len(),
            "activating readyable"
        );
        self.publish(Event::new(EventKind::ReadyableActivated));
        self.report_resolution();

        for child in &children {
            child.run();
        }

        all_of(dependencies).subscribe(move |outcome| match outcome {
            Err(err) => done.fail(err),
            Ok(()) => {
                let started: Vec<Signal> = handlers.into_iter().map(start_handler).collect();
                all_of(started).subscribe(move |outcome| done.finish(outcome));
            }
        });
        self
    }

    /// Tri-state read: pending, succeeded or failed.
    #[must_use]
    pub fn readiness(&self) -> Readiness {
        self.inner.signal.readiness()
    }

    /// Whether [`run`](Self::run) was already called.
    #[must_use]
    pub fn is_activated(&self) -> bool {
        matches!(*self.lock_stage(), Stage::Activated)
    }

    /// Returns the signal view of this readyable.
    #[must_use]
    pub fn signal(&self) -> Signal {
        self.inner.signal.clone()
    }

    /// Subscribes to the cached outcome; see [`Signal::subscribe`].
    pub fn subscribe<F>(&self, listener: F)
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        self.inner.signal.subscribe(listener);
    }

    /// Waits for the outcome; see [`Signal::wait`].
    pub async fn wait(&self) -> Outcome {
        self.inner.signal.wait().await
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn configure<R>(&self, op: &str, f: impl FnOnce(&mut Setup) -> R) -> R {
        let mut stage = self.lock_stage();
        if let Stage::Configuring(setup) = &mut *stage {
            return f(setup);
        }
        drop(stage);
        panic!("readyable `{}`: {op} after activation", self.inner.name)
    }

    fn report_resolution(&self) {
        let name = Arc::clone(&self.inner.name);
        let scope = self.inner.scope.clone();
        self.inner.signal.subscribe(move |outcome| {
            let ev = match outcome {
                Ok(()) => {
                    debug!(readyable = %name, "readyable succeeded");
                    Event::new(EventKind::ReadyableSucceeded)
                }
                Err(err) => {
                    warn!(readyable = %name, error = %err, "readyable failed");
                    Event::new(EventKind::ReadyableFailed).with_reason(err.to_string())
                }
            };
            if let Some(scope) = scope {
                scope.publish(ev.with_readyable(name));
            }
        });
    }

    fn publish(&self, ev: Event) {
        if let Some(scope) = &self.inner.scope {
            scope.publish(ev.with_readyable(Arc::clone(&self.inner.name)));
        }
    }

    fn lock_stage(&self) -> MutexGuard<'_, Stage> {
        self.inner.stage.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn start_handler(handler: BoxHandler) -> Signal {
    let (done, signal) = Signal::pending();
    handler.handle(done);
    signal
}

impl fmt::Debug for Readyable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Readyable")
            .field("name", &self.inner.name)
            .field("activated", &self.is_activated())
            .field("readiness", &self.readiness())
            .finish()
    }
}

impl AsSignal for Readyable {
    fn as_signal(&self) -> Signal {
        self.signal()
    }
}

impl Dependencies for Readyable {
    fn into_signals(self) -> Vec<Signal> {
        vec![self.signal()]
    }
}

impl Dependencies for &Readyable {
    fn into_signals(self) -> Vec<Signal> {
        vec![self.signal()]
    }
}
