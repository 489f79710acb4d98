//! # Built-in subscribers
//!
//! - [`LogWriter`]: re-emits events as `tracing` records (demo/debug).

mod log;

pub use log::LogWriter;
