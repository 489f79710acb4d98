//! # Lifecycle: one host's readiness and shutdown graph.
//!
//! A [`Lifecycle`] owns four well-known readyables and the status machine
//! driven by them. Plugins register work through its helpers while the host
//! is being constructed; the host reports "listening" and hands over its
//! close operation.
//!
//! ## Graph
//! ```text
//!  notify_listening() ──► [placeholder] ──► listening ──► ready
//!  initialize() setups ──► [placeholder] ─────────────────►  │ Ok  ─► status Ready
//!                                                            └ Err ─► status Failed
//!
//!  close(original) ──► closing (+ original as handler) ──► (resolved either way)
//!                                                              └─► closed.run()
//!                                                                     │ Ok  ─► status Closed
//!                                                                     └ Err ─► status Failed
//! ```
//!
//! ## Initialization
//! ```text
//! build() ─► next scheduling turn ─► initialize():
//!   status Initializing
//!   listening.run()
//!   setups in registration order
//!     └ Err or panic ─► status Failed, SetupFailed, ready fails, panic
//!   status Initialized
//!   ready.run()
//! ```
//! [`Lifecycle::initialized`] re-raises a setup panic of the scheduled task.
//!
//! ## Event flow
//! ```text
//! readyables / status / close ── publish(Event) ──► Bus ──► listener ──► PendingTracker
//!                                                                   └──► SubscriberSet
//! ```
//! The listener drains the bus and stops once `closed` resolved or the
//! lifecycle is dropped.
//!
//! ## Example
//! ```rust
//! use readyvisor::{Lifecycle, LifecycleConfig, ReadyError, Status};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let lc = Lifecycle::builder(LifecycleConfig::named("api")).build();
//!
//!     // Plugin: a cache warmed once the host listens.
//!     let warm = lc.during(lc.ready(), Default::default());
//!     lc.handle_async(&warm, || async { Ok::<(), ReadyError>(()) });
//!     let lookup = lc.sync_fn("lookup", lc.ready(), |key: &str| key.len());
//!
//!     lc.initialized().await;
//!     assert!(lookup.call("k").unwrap_err().is_not_ready());
//!
//!     lc.notify_listening(Ok::<(), ReadyError>(()));
//!     lc.ready().wait().await.unwrap();
//!     assert_eq!(lc.status(), Status::Ready);
//!     assert_eq!(lookup.call("key"), Ok(3));
//!
//!     lc.close(|done: readyvisor::Completion| done.ok()).wait().await.unwrap();
//!     assert_eq!(lc.status(), Status::Closed);
//! }
//! ```

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{
    builder::LifecycleBuilder,
    config::LifecycleConfig,
    gate::{AsyncFn, SyncFn},
    pending::PendingTracker,
    registry, shutdown,
    status::{Phase, Status, StatusCell},
};
use crate::error::{ReadyError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::readyable::{DuringOptions, Handler, Readyable, Scope, cb};
use crate::signal::{self, Completion, Dependencies, Outcome, Signal};
use crate::subscribers::SubscriberSet;

type BoxSetup = Box<dyn FnOnce() -> Result<(), ReadyError> + Send + 'static>;

/// Per-host readiness and shutdown orchestrator.
pub struct Lifecycle {
    cfg: LifecycleConfig,
    host: Arc<str>,
    bus: Bus,
    status: Arc<StatusCell>,

    listening: Readyable,
    ready: Readyable,
    closing: Readyable,
    closed: Readyable,

    /// One-shot bridge resolved by `notify_listening`; `None` once used or
    /// when listening is not awaited.
    listening_done: Mutex<Option<Completion>>,
    /// `None` once initialization began.
    setups: Mutex<Option<Vec<BoxSetup>>>,
    /// Extra dependency of `ready`: succeeds after the setups, fails with a
    /// setup fault.
    setups_done: Mutex<Option<Completion>>,
    init_task: Mutex<Option<JoinHandle<()>>>,
    close_requested: AtomicBool,

    pending: Arc<PendingTracker>,
    runtime_token: CancellationToken,
}

impl Lifecycle {
    /// Returns a builder for a standalone lifecycle.
    pub fn builder(cfg: LifecycleConfig) -> LifecycleBuilder {
        LifecycleBuilder::new(cfg)
    }

    /// Returns the lifecycle of `host` from the process-wide registry,
    /// creating it with the default config on first access. Its label is
    /// derived from the host type and identity.
    ///
    /// The registry does not keep `host` alive.
    pub fn of<H>(host: &Arc<H>) -> Arc<Lifecycle>
    where
        H: Send + Sync + 'static,
    {
        registry::global().of(host)
    }

    pub(crate) fn new_internal(
        cfg: LifecycleConfig,
        bus: Bus,
        pending: Arc<PendingTracker>,
        runtime_token: CancellationToken,
    ) -> Self {
        let host: Arc<str> = Arc::from(cfg.name.as_str());
        let scope = Scope {
            bus: bus.clone(),
            host: Arc::clone(&host),
        };
        let phase = |p: Phase| Readyable::scoped(p.as_str(), scope.clone());

        let listening = phase(Phase::Listening);
        let ready = phase(Phase::Ready);
        let closing = phase(Phase::Closing);
        let closed = phase(Phase::Closed);

        let listening_done = cfg.await_listening.then(|| cb(&listening));
        ready.depend_on(&listening);
        let setups_done = cb(&ready);
        closed.depend_on(&closing);

        let status = Arc::new(StatusCell::new(bus.clone(), Arc::clone(&host)));
        {
            let status = Arc::clone(&status);
            ready.subscribe(move |outcome| {
                status.advance(if outcome.is_ok() {
                    Status::Ready
                } else {
                    Status::Failed
                });
            });
        }
        {
            let status = Arc::clone(&status);
            closed.subscribe(move |outcome| {
                status.advance(if outcome.is_ok() {
                    Status::Closed
                } else {
                    Status::Failed
                });
            });
        }

        Self {
            cfg,
            host,
            bus,
            status,
            listening,
            ready,
            closing,
            closed,
            listening_done: Mutex::new(listening_done),
            setups: Mutex::new(Some(Vec::new())),
            setups_done: Mutex::new(Some(setups_done)),
            init_task: Mutex::new(None),
            close_requested: AtomicBool::new(false),
            pending,
            runtime_token,
        }
    }

    /// Forwards bus events to the pending tracker and subscribers until
    /// `closed` resolved, then drains what is left and stops the workers.
    pub(crate) fn spawn_listener(&self, subs: SubscriberSet, pending: Arc<PendingTracker>) {
        let mut rx = self.bus.subscribe();
        let token = self.runtime_token.clone();
        let host = Arc::clone(&self.host);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => forward(&pending, &subs, ev).await,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(host = %host, skipped, "lifecycle listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => forward(&pending, &subs, ev).await,
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            subs.shutdown().await;
            debug!(host = %host, "lifecycle listener stopped");
        });
    }

    // ---- Phases ----

    /// Resolved once the host reports listening (and its handlers finished).
    pub fn listening(&self) -> &Readyable {
        &self.listening
    }

    /// Depends on `listening`; drives status `Ready`/`Failed`.
    pub fn ready(&self) -> &Readyable {
        &self.ready
    }

    /// Activated by [`close`](Self::close); runs the host's original close.
    pub fn closing(&self) -> &Readyable {
        &self.closing
    }

    /// Depends on `closing`; drives status `Closed`/`Failed`.
    pub fn closed(&self) -> &Readyable {
        &self.closed
    }

    pub fn phase(&self, phase: Phase) -> &Readyable {
        match phase {
            Phase::Listening => &self.listening,
            Phase::Ready => &self.ready,
            Phase::Closing => &self.closing,
            Phase::Closed => &self.closed,
        }
    }

    // ---- State ----

    pub fn status(&self) -> Status {
        self.status.get()
    }

    /// Host label.
    pub fn name(&self) -> &str {
        &self.host
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.cfg
    }

    /// Sorted names of lifecycle readyables that were activated and have not
    /// resolved yet, as last seen by the bus listener.
    pub async fn pending_readyables(&self) -> Vec<String> {
        self.pending.snapshot().await
    }

    /// Raw receiver of every event published after this call.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    // ---- Host bridge ----

    /// Reports that the host transport is listening (or failed to).
    ///
    /// # Panics
    /// On a second call, or when the config does not await listening.
    pub fn notify_listening<E>(&self, result: Result<(), E>)
    where
        E: Into<ReadyError>,
    {
        let Some(done) = lock(&self.listening_done).take() else {
            if self.cfg.await_listening {
                panic!("lifecycle `{}`: listening notified more than once", self.host);
            }
            panic!("lifecycle `{}`: listening is not awaited", self.host);
        };
        let outcome: Outcome = result.map_err(Into::into);

        let mut ev = Event::new(EventKind::ListeningNotified).with_host(Arc::clone(&self.host));
        match &outcome {
            Ok(()) => info!(host = %self.host, "host listening"),
            Err(err) => {
                warn!(host = %self.host, error = %err, "host failed to listen");
                ev = ev.with_reason(err.to_string());
            }
        }
        self.bus.publish(ev);
        done.finish(outcome);
    }

    /// Intercepts the host close: `original` becomes a handler of
    /// `closing`, which is activated; `closed` is activated once `closing`
    /// resolved, successfully or not.
    ///
    /// Returns the `closed` signal, the completion of the wrapped close.
    /// A second call runs nothing: `original` is dropped and the same
    /// signal is returned.
    pub fn close<H: Handler>(&self, original: H) -> Signal {
        if self.close_requested.swap(true, Ordering::SeqCst) {
            warn!(host = %self.host, "close requested again; keeping the first close");
            return self.closed.signal();
        }
        self.bus
            .publish(Event::new(EventKind::CloseRequested).with_host(Arc::clone(&self.host)));
        self.status.advance(Status::Closing);

        self.closing.attach(original).run();
        let closed = self.closed.clone();
        let token = self.runtime_token.clone();
        self.closing.subscribe(move |_| {
            closed.run();
            // Queued behind the resolution event of `closed`.
            closed.subscribe(move |_| token.cancel());
        });
        self.closed.signal()
    }

    /// Waits for a termination signal (SIGINT/SIGTERM/SIGQUIT, Ctrl-C
    /// elsewhere), then closes with `original` and waits for `closed`.
    ///
    /// # Errors
    /// The `closed` outcome, or a failure to listen for signals (nothing is
    /// closed then).
    pub async fn close_on_shutdown_signal<H: Handler>(&self, original: H) -> Outcome {
        match shutdown::shutdown_requested().await {
            Ok(signal) => info!(host = %self.host, signal, "termination signal received"),
            Err(err) => {
                warn!(host = %self.host, error = %err, "cannot listen for termination signals");
                return Err(ReadyError::from_error(&err));
            }
        }
        self.close(original).wait().await
    }

    // ---- Initialization ----

    /// Queues a setup callback, run once during initialization in
    /// registration order.
    ///
    /// # Panics
    /// If initialization already began or the status left `Uninitialized`
    /// (for example after an early [`close`](Self::close)).
    pub fn setup<F, E>(&self, f: F) -> &Self
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Into<ReadyError> + 'static,
    {
        let mut setups = lock(&self.setups);
        let status = self.status.get();
        if let (Some(queue), Status::Uninitialized) = (setups.as_mut(), status) {
            queue.push(Box::new(move || f().map_err(Into::into)));
            return self;
        }
        drop(setups);
        panic!(
            "lifecycle `{}`: setup registered after initialization began (status {status})",
            self.host
        );
    }

    /// Runs initialization on the calling thread; see the module docs.
    ///
    /// Skipped (with a warning) if the host was closed before.
    ///
    /// # Panics
    /// - when called twice;
    /// - when a setup returns an error or panics (status becomes `Failed`
    ///   and `SetupFailed` is published first; a setup panic is re-raised
    ///   with its original payload).
    pub fn initialize(&self) {
        let Some(setups) = lock(&self.setups).take() else {
            panic!("lifecycle `{}` initialized twice", self.host);
        };
        let status = self.status.get();
        if status != Status::Uninitialized {
            warn!(host = %self.host, %status, "initialization skipped");
            if let Some(done) = lock(&self.setups_done).take() {
                done.dismiss();
            }
            return;
        }

        self.status.advance(Status::Initializing);
        self.listening.run();
        debug!(host = %self.host, setups = setups.len(), "running setups");
        for setup in setups {
            self.run_setup(setup);
        }
        self.status.advance(Status::Initialized);
        if let Some(done) = lock(&self.setups_done).take() {
            done.ok();
        }
        self.ready.run();
    }

    /// Initializes on the next scheduling turn, for lifecycles built with
    /// `auto_initialize` off.
    ///
    /// Lets the host finish its synchronous construction first. A setup
    /// fault fails `ready` and surfaces as a panic of the returned task.
    #[must_use = "a setup fault is only re-raised by awaiting the handle"]
    pub fn spawn_initialize(self: &Arc<Self>) -> JoinHandle<()> {
        let me = Arc::clone(self);
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            me.initialize();
        })
    }

    /// Schedules initialization on behalf of the builder. The task holds the
    /// lifecycle weakly, so a lifecycle dropped before its turn never
    /// initializes.
    pub(crate) fn schedule_initialize(self: &Arc<Self>) {
        let me = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            tokio::task::yield_now().await;
            if let Some(lc) = me.upgrade() {
                lc.initialize();
            }
        });
        *lock(&self.init_task) = Some(task);
    }

    /// Waits for the initialization scheduled by the builder.
    ///
    /// Returns at once if none was scheduled or another caller already
    /// awaited it.
    ///
    /// # Panics
    /// Re-raises a setup fault with its original payload.
    pub async fn initialized(&self) {
        let Some(task) = lock(&self.init_task).take() else {
            return;
        };
        if let Err(err) = task.await {
            if err.is_panic() {
                panic::resume_unwind(err.into_panic());
            }
            warn!(host = %self.host, "initialization task cancelled");
        }
    }

    fn run_setup(&self, setup: BoxSetup) {
        match panic::catch_unwind(AssertUnwindSafe(setup)) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let err = match err {
                    ReadyError::Failed { error } => ReadyError::Setup { error },
                    other => other,
                };
                self.setup_failed(err.clone());
                panic!("lifecycle `{}`: {err}", self.host);
            }
            Err(payload) => {
                self.setup_failed(ReadyError::setup(panic_message(&*payload)));
                panic::resume_unwind(payload);
            }
        }
    }

    /// Marks the host failed and fails `ready` with `err`.
    fn setup_failed(&self, err: ReadyError) {
        error!(host = %self.host, error = %err, "setup failed");
        self.bus.publish(
            Event::new(EventKind::SetupFailed)
                .with_host(Arc::clone(&self.host))
                .with_reason(err.to_string()),
        );
        self.status.advance(Status::Failed);
        if let Some(done) = lock(&self.setups_done).take() {
            done.fail(err);
        }
        if !self.ready.is_activated() {
            self.ready.run();
        }
    }

    // ---- Plugin helpers ----

    /// Creates a readyable reporting to this lifecycle's bus.
    pub fn readyable(&self, name: impl Into<Arc<str>>) -> Readyable {
        Readyable::scoped(
            name,
            Scope {
                bus: self.bus.clone(),
                host: Arc::clone(&self.host),
            },
        )
    }

    /// See [`Readyable::during`].
    pub fn during(&self, readyable: &Readyable, opts: DuringOptions) -> Readyable {
        readyable.during(opts)
    }

    /// See [`Readyable::depend_on`].
    pub fn depend_on<'r, D: Dependencies>(&self, readyable: &'r Readyable, deps: D) -> &'r Readyable {
        readyable.depend_on(deps)
    }

    /// See [`Readyable::handle`].
    pub fn handle<'r, F>(&self, readyable: &'r Readyable, f: F) -> &'r Readyable
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        readyable.handle(f)
    }

    /// See [`Readyable::handle_async`].
    pub fn handle_async<'r, F, Fut, E>(&self, readyable: &'r Readyable, f: F) -> &'r Readyable
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<ReadyError> + Send + 'static,
    {
        readyable.handle_async(f)
    }

    /// See [`cb`](crate::cb).
    pub fn cb(&self, readyable: &Readyable) -> Completion {
        cb(readyable)
    }

    /// Calls `callback` once with the aggregate outcome of `deps`.
    pub fn run<D, F>(&self, deps: D, callback: F)
    where
        D: Dependencies,
        F: FnOnce(Outcome) + Send + 'static,
    {
        signal::run(deps, callback);
    }

    /// Gates a synchronous function on `deps`; see [`SyncFn`].
    pub fn sync_fn<D, F>(&self, name: impl Into<Arc<str>>, deps: D, f: F) -> SyncFn<F>
    where
        D: Dependencies,
    {
        SyncFn::with_gate(self.readyable(name), deps, f)
    }

    /// Gates an async function on `deps`; see [`AsyncFn`].
    pub fn async_fn<D, F>(&self, name: impl Into<Arc<str>>, deps: D, f: F) -> AsyncFn<F>
    where
        D: Dependencies,
    {
        AsyncFn::with_gate(self.readyable(name), deps, f)
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.runtime_token.cancel();
    }
}

async fn forward(pending: &PendingTracker, subs: &SubscriberSet, ev: Event) {
    pending.update(&ev).await;
    subs.emit_arc(Arc::new(ev));
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscribers::Subscribe;
    use crate::testing::{Log, timed, timed_fail};
    use async_trait::async_trait;
    use std::time::Duration;

    fn lifecycle(await_listening: bool) -> Arc<Lifecycle> {
        Lifecycle::builder(LifecycleConfig {
            await_listening,
            auto_initialize: false,
            ..LifecycleConfig::named("api")
        })
        .build()
    }

    fn statuses(rx: &mut broadcast::Receiver<Event>) -> Vec<Status> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::StatusChanged {
                out.extend(ev.status);
            }
        }
        out
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn phases_run_in_dependency_order() {
        let log = Log::default();
        let lc = lifecycle(false);
        lc.handle(lc.listening(), timed(&log, "listening", 5));
        lc.handle(lc.ready(), timed(&log, "ready", 5));
        lc.handle(lc.closing(), timed(&log, "closing", 5));
        lc.handle(lc.closed(), timed(&log, "closed", 5));

        lc.initialize();
        lc.ready().wait().await.unwrap();
        for phase in [Phase::Closing, Phase::Closed] {
            lc.phase(phase).run();
            lc.phase(phase).wait().await.unwrap();
        }

        assert_eq!(
            log.entries(),
            [
                "listening-start",
                "listening-end",
                "ready-start",
                "ready-end",
                "closing-start",
                "closing-end",
                "closed-start",
                "closed-end"
            ]
        );
        assert_eq!(lc.status(), Status::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_waits_for_listening_notification() {
        let log = Log::default();
        let lc = Lifecycle::builder(LifecycleConfig::named("api")).build();
        let mut rx = lc.events();
        lc.handle(lc.ready(), timed(&log, "ready", 5));
        let setup_log = log.clone();
        lc.setup(move || {
            setup_log.push("setup");
            Ok::<(), ReadyError>(())
        });

        assert_eq!(lc.status(), Status::Uninitialized);
        lc.initialized().await;
        assert_eq!(lc.status(), Status::Initialized);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(log.entries(), ["setup"]);
        assert!(lc.ready().readiness().is_pending());

        lc.notify_listening(Ok::<(), ReadyError>(()));
        lc.ready().wait().await.unwrap();
        assert_eq!(log.entries(), ["setup", "ready-start", "ready-end"]);
        assert_eq!(lc.status(), Status::Ready);
        assert_eq!(
            statuses(&mut rx),
            [Status::Initializing, Status::Initialized, Status::Ready]
        );
    }

    #[tokio::test]
    async fn spawn_initialize_waits_for_the_next_turn() {
        let lc = lifecycle(false);
        let init = lc.spawn_initialize();
        assert_eq!(lc.status(), Status::Uninitialized);

        init.await.unwrap();
        lc.ready().wait().await.unwrap();
        assert_eq!(lc.status(), Status::Ready);
        // Nothing was scheduled by the builder.
        lc.initialized().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_listening_fails_ready() {
        let log = Log::default();
        let lc = lifecycle(true);
        lc.handle(lc.ready(), timed(&log, "ready", 5));
        lc.initialize();

        lc.notify_listening(Err("address in use"));
        assert_eq!(lc.ready().wait().await, Err(ReadyError::fail("address in use")));
        assert_eq!(lc.status(), Status::Failed);
        assert!(log.is_empty());
    }

    #[tokio::test]
    #[should_panic(expected = "listening notified more than once")]
    async fn second_listening_notification_panics() {
        let lc = lifecycle(true);
        lc.notify_listening(Ok::<(), ReadyError>(()));
        lc.notify_listening(Ok::<(), ReadyError>(()));
    }

    #[tokio::test]
    #[should_panic(expected = "listening is not awaited")]
    async fn notification_without_awaited_listening_panics() {
        lifecycle(false).notify_listening(Ok::<(), ReadyError>(()));
    }

    #[tokio::test]
    async fn setup_error_marks_failed_and_panics() {
        let lc = lifecycle(false);
        let mut rx = lc.events();
        let ran_second = Arc::new(AtomicBool::new(false));
        let flag = ran_second.clone();
        lc.setup(|| Err("bad config"));
        lc.setup(move || {
            flag.store(true, Ordering::SeqCst);
            Ok::<(), ReadyError>(())
        });

        let err = panic::catch_unwind(AssertUnwindSafe(|| lc.initialize())).unwrap_err();
        assert_eq!(panic_message(&*err), "lifecycle `api`: setup failed: bad config");
        assert_eq!(lc.status(), Status::Failed);
        assert!(!ran_second.load(Ordering::SeqCst));

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::SetupFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn setup_fault_fails_ready_and_is_reraised() {
        let log = Log::default();
        let lc = Lifecycle::builder(LifecycleConfig::named("api")).build();
        lc.handle(lc.ready(), timed(&log, "ready", 5));
        lc.setup(|| Err("bad config"));

        let waiter = {
            let ready = lc.ready().clone();
            tokio::spawn(async move { ready.wait().await })
        };
        let init = {
            let lc = Arc::clone(&lc);
            tokio::spawn(async move { lc.initialized().await })
        };

        let err = init.await.unwrap_err();
        assert!(err.is_panic());
        assert_eq!(
            panic_message(&*err.into_panic()),
            "lifecycle `api`: setup failed: bad config"
        );
        assert_eq!(waiter.await.unwrap(), Err(ReadyError::setup("bad config")));
        assert_eq!(lc.status(), Status::Failed);
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn setup_panic_is_reraised_with_its_payload() {
        let lc = lifecycle(false);
        lc.setup(|| -> Result<(), ReadyError> { panic!("boom") });

        let err = panic::catch_unwind(AssertUnwindSafe(|| lc.initialize())).unwrap_err();
        assert_eq!(err.downcast_ref::<&str>(), Some(&"boom"));
        assert_eq!(lc.status(), Status::Failed);
        assert_eq!(
            lc.ready().signal().outcome(),
            Some(Err(ReadyError::setup("boom")))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn built_lifecycle_initializes_on_next_turn() {
        struct Host;
        let host = Arc::new(Host);
        let lc = Lifecycle::of(&host);
        let log = Log::default();
        let setup_log = log.clone();
        lc.setup(move || {
            setup_log.push("setup");
            Ok::<(), ReadyError>(())
        });

        assert_eq!(lc.status(), Status::Uninitialized);
        settle().await;
        assert_eq!(log.entries(), ["setup"]);
        assert_eq!(lc.status(), Status::Initialized);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_an_unclosed_lifecycle_stops_its_listener() {
        let lc = lifecycle(true);
        let mut rx = lc.events();
        let token = lc.runtime_token.clone();
        drop(lc);

        assert!(token.is_cancelled());
        let res = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await;
        assert!(matches!(res, Ok(Err(RecvError::Closed))));
    }

    #[tokio::test]
    #[should_panic(expected = "setup registered after initialization began")]
    async fn setup_after_early_close_panics() {
        let lc = lifecycle(false);
        let _closed = lc.close(|done: Completion| done.ok());
        lc.setup(|| Ok::<(), ReadyError>(()));
    }

    #[tokio::test]
    #[should_panic(expected = "setup registered after initialization began")]
    async fn late_setup_panics() {
        let lc = lifecycle(false);
        lc.initialize();
        lc.setup(|| Ok::<(), ReadyError>(()));
    }

    #[tokio::test]
    #[should_panic(expected = "initialized twice")]
    async fn initializing_twice_panics() {
        let lc = lifecycle(false);
        lc.initialize();
        lc.initialize();
    }

    #[tokio::test(start_paused = true)]
    async fn close_runs_closing_then_closed() {
        let log = Log::default();
        let lc = lifecycle(false);
        let mut rx = lc.events();
        lc.handle(lc.closing(), timed(&log, "drain", 10));
        lc.handle(lc.closed(), timed(&log, "closed", 5));
        lc.initialize();
        lc.ready().wait().await.unwrap();

        let closed = lc.close(timed(&log, "original", 5));
        assert_eq!(lc.status(), Status::Closing);
        assert_eq!(closed.wait().await, Ok(()));
        assert_eq!(
            log.entries(),
            [
                "drain-start",
                "original-start",
                "original-end",
                "drain-end",
                "closed-start",
                "closed-end"
            ]
        );
        assert_eq!(lc.status(), Status::Closed);
        assert_eq!(
            statuses(&mut rx),
            [
                Status::Initializing,
                Status::Initialized,
                Status::Ready,
                Status::Closing,
                Status::Closed
            ]
        );

        let again = lc.close(timed(&log, "second", 5));
        assert!(again.same(&closed));
        settle().await;
        assert!(!log.entries().contains(&"second-start".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_close_still_completes_as_failed() {
        let log = Log::default();
        let lc = lifecycle(false);
        lc.handle(lc.closed(), timed(&log, "closed", 5));
        lc.initialize();

        let closed = lc.close(timed_fail(&log, "original", 5, "flush failed"));
        assert_eq!(closed.wait().await, Err(ReadyError::fail("flush failed")));
        assert!(lc.closed().is_activated());
        assert_eq!(lc.status(), Status::Failed);
        assert_eq!(log.entries(), ["original-start", "original-end"]);
    }

    #[tokio::test(start_paused = true)]
    async fn sync_fn_gated_on_ready() {
        let lc = lifecycle(true);
        let lookup = lc.sync_fn("lookup", lc.ready(), |key: u32| key + 1);
        lc.initialize();

        for _ in 0..3 {
            assert_eq!(lookup.call(1), Err(ReadyError::not_ready("lookup")));
        }
        lc.notify_listening(Ok::<(), ReadyError>(()));
        assert_eq!(lookup.call(1), Ok(2));
        assert_eq!(lookup.call(2), Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn async_fn_services_every_early_call() {
        let lc = lifecycle(true);
        let echo = Arc::new(lc.async_fn("echo", lc.ready(), |n: usize| async move {
            Ok::<_, ReadyError>(n)
        }));
        lc.initialize();

        let calls: Vec<_> = (0..4)
            .map(|n| {
                let echo = Arc::clone(&echo);
                tokio::spawn(async move { echo.call(n).await })
            })
            .collect();
        settle().await;
        assert!(calls.iter().all(|c| !c.is_finished()));

        lc.notify_listening(Ok::<(), ReadyError>(()));
        for (n, call) in calls.into_iter().enumerate() {
            assert_eq!(call.await.unwrap(), Ok(n));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn pending_readyables_names_stalled_nodes() {
        let lc = lifecycle(true);
        lc.initialize();
        settle().await;
        assert_eq!(lc.pending_readyables().await, ["listening", "ready"]);

        lc.notify_listening(Ok::<(), ReadyError>(()));
        settle().await;
        assert!(lc.pending_readyables().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn during_children_report_to_the_lifecycle() {
        let lc = lifecycle(false);
        let mut rx = lc.events();
        let db = lc.during(lc.ready(), DuringOptions::default().named("db"));
        lc.handle(&db, |done| done.ok());
        lc.initialize();
        lc.ready().wait().await.unwrap();

        let mut names = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::ReadyableSucceeded {
                assert_eq!(ev.host.as_deref(), Some("api"));
                names.extend(ev.readyable.as_deref().map(str::to_string));
            }
        }
        assert_eq!(names, ["listening", "db", "ready"]);
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn kinds(&self) -> Vec<EventKind> {
            self.seen.lock().unwrap().iter().map(|ev| ev.kind).collect()
        }

        fn saw_closed_last(&self) -> bool {
            self.seen.lock().unwrap().last().is_some_and(|ev| {
                ev.kind == EventKind::ReadyableSucceeded && ev.readyable.as_deref() == Some("closed")
            })
        }
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.seen.lock().unwrap().push(ev.clone());
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn subscribers_see_events_until_closed() {
        let rec = Arc::new(Recorder::default());
        let lc = Lifecycle::builder(LifecycleConfig {
            await_listening: false,
            auto_initialize: false,
            ..LifecycleConfig::default()
        })
        .with_subscribers(vec![rec.clone() as Arc<dyn Subscribe>])
        .build();

        lc.initialize();
        lc.close(|done: Completion| done.ok()).wait().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), lc.runtime_token.cancelled())
            .await
            .unwrap();

        let delivered = tokio::time::timeout(Duration::from_secs(5), async {
            while !rec.saw_closed_last() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(delivered.is_ok());

        let kinds = rec.kinds();
        assert_eq!(kinds.first(), Some(&EventKind::StatusChanged));
        assert!(kinds.contains(&EventKind::CloseRequested));
    }

    #[tokio::test]
    async fn one_lifecycle_per_host() {
        struct Host;
        let host = Arc::new(Host);
        let a = Lifecycle::of(&host);
        let b = Lifecycle::of(&host);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &Lifecycle::of(&Arc::new(Host))));
    }
}
