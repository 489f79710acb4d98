//! Readyables: one-shot nodes of the readiness graph.
//!
//! ## Contents
//! - [`Readyable`], [`DuringOptions`] the node and its child options
//! - [`Handler`], [`HandlerFn`] work started once dependencies succeeded
//! - [`cb`] one-shot bridge from an external event

mod bridge;
mod handler;
mod node;

pub use bridge::cb;
pub use handler::{Handler, HandlerFn};
pub use node::{DuringOptions, Readyable};

pub(crate) use node::Scope;
