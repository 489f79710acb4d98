//! Runtime core: the per-host lifecycle.
//!
//! The public API from this module is [`Lifecycle`] (with its builder,
//! config and registry), its [`Status`]/[`Phase`] vocabulary, and the
//! readiness-gated function wrappers.
//!
//! Internal modules:
//! - [`lifecycle`]: phases, status machine, setups, close interception, helpers;
//! - [`gate`]: `SyncFn` / `AsyncFn` wrappers behind a private readyable;
//! - [`status`]: monotonic status cell publishing `StatusChanged`;
//! - [`pending`]: activated-but-unresolved readyables, fed from the bus;
//! - [`registry`]: weak host-keyed lifecycle map;
//! - [`shutdown`]: OS termination signals.

mod builder;
mod config;
mod gate;
mod lifecycle;
mod pending;
mod registry;
mod shutdown;
mod status;

pub use builder::LifecycleBuilder;
pub use config::LifecycleConfig;
pub use gate::{AsyncFn, SyncFn};
pub use lifecycle::Lifecycle;
pub use registry::Registry;
pub use status::{Phase, Status};
