//! Signals: one-shot cached outcomes and fan-in.
//!
//! ## Contents
//! - [`Signal`], [`Completion`] observer and producer halves of one outcome
//! - [`Readiness`] tri-state read
//! - [`all`], [`run`] fan-in barrier
//! - [`Dependencies`], [`AsSignal`] "one or many" conversions

mod all;
mod deps;
mod state;

pub use all::{all, run};
pub use deps::{AsSignal, Dependencies};
pub use state::{Completion, Outcome, Readiness, Signal};

pub(crate) use all::all_of;
