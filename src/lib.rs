//! # readyvisor
//!
//! **Readyvisor** orchestrates readiness and shutdown of hosts assembled from
//! independently initialized plugins.
//!
//! Plugins register one-shot work as nodes of a dependency graph; each node
//! runs its work at most once and broadcasts the cached outcome to every
//! current and future observer. A per-host [`Lifecycle`] sequences the host
//! through `listening → ready → closing → closed`.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   plugin A   │   │   plugin B   │   │   plugin C   │
//!     │ setup/during │   │   sync_fn    │   │   async_fn   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Lifecycle (one per host)                                         │
//! │  - listening ──► ready            closing ──► closed              │
//! │  - StatusCell (monotonic status, StatusChanged events)            │
//! │  - setups (run once while initializing)                           │
//! │  - Bus ──► listener ──► PendingTracker / SubscriberSet            │
//! └──────┬──────────────────────────────────────────────────┬─────────┘
//!        ▼                                                  ▼
//!   Readyable::run()                                 host bridge
//!   ├─► children (during) first                      notify_listening(outcome)
//!   ├─► all(dependencies)  (fan-in)                  close(original) ─► Signal
//!   ├─► handlers           (fan-out, after deps)
//!   └─► cached Signal ──► every subscriber, before or after resolution
//! ```
//!
//! ### Readyable activation
//! ```text
//! run()
//!   ├─► during children .run()
//!   ├─► all(dependencies)
//!   │      ├─ Err(e) ─► resolve Err(e)            (handlers never start)
//!   │      └─ Ok     ─► start every handler
//!   │                     └─► all(handler completions)
//!   │                            ├─ first Err(e) ─► resolve Err(e)
//!   │                            └─ all Ok       ─► resolve Ok
//!   └─► nothing is cancelled; a stalled handler stalls its dependents
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                       |
//! |-------------------|--------------------------------------------------------------|------------------------------------------|
//! | **Signals**       | One-shot cached outcomes, fan-in barrier.                    | [`Signal`], [`Completion`], [`all`]      |
//! | **Graph**         | Dependency fan-in, handler fan-out, nested phases.           | [`Readyable`], [`Handler`], [`cb`]       |
//! | **Lifecycle**     | Per-host phases, status machine, setups, close interception. | [`Lifecycle`], [`Status`], [`Phase`]     |
//! | **Gated calls**   | Functions callable only once their dependencies succeeded.   | [`SyncFn`], [`AsyncFn`]                  |
//! | **Subscriber API**| Observe status changes and readyable resolution.             | [`Subscribe`], [`Event`]                 |
//! | **Errors**        | Cloneable outcome error with a distinct `NotReady` kind.     | [`ReadyError`]                           |
//! | **Configuration** | Host label, bus capacity, listening bridge.                  | [`LifecycleConfig`]                      |
//!
//! ## Optional features
//! - `logging`: exports a built-in [`LogWriter`] subscriber re-emitting events through `tracing`.
//!
//! ## Example
//! ```rust
//! use readyvisor::{Completion, Lifecycle, LifecycleConfig, ReadyError, Status};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), ReadyError> {
//!     let mut cfg = LifecycleConfig::named("api");
//!     cfg.await_listening = false;
//!     let lc = Lifecycle::builder(cfg).build();
//!
//!     // A plugin opens its pool while the host becomes ready.
//!     let pool = lc.readyable("pool");
//!     lc.handle(&pool, |done: Completion| done.ok());
//!     lc.depend_on(lc.ready(), &pool);
//!     lc.setup(move || {
//!         pool.run();
//!         Ok::<(), ReadyError>(())
//!     });
//!
//!     // Initialization runs on the next scheduling turn.
//!     lc.initialized().await;
//!     lc.ready().wait().await?;
//!     assert_eq!(lc.status(), Status::Ready);
//!
//!     lc.close(|done: Completion| done.ok()).wait().await?;
//!     assert_eq!(lc.status(), Status::Closed);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod readyable;
mod signal;
mod subscribers;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use core::{AsyncFn, Lifecycle, LifecycleBuilder, LifecycleConfig, Phase, Registry, Status, SyncFn};
pub use error::ReadyError;
pub use events::{Bus, Event, EventKind};
pub use readyable::{DuringOptions, Handler, HandlerFn, Readyable, cb};
pub use signal::{AsSignal, Completion, Dependencies, Outcome, Readiness, Signal, all, run};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
