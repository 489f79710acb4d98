//! # Per-lifecycle configuration.
//!
//! Provides [`LifecycleConfig`], passed to [`Lifecycle::builder`](crate::Lifecycle::builder)
//! or used as the template of a [`Registry`](crate::Registry).
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by [`LifecycleConfig::bus_capacity_clamped`]

/// Configuration for one lifecycle.
///
/// ## Field semantics
/// - `name`: host label carried by every event and log record
/// - `bus_capacity`: event bus ring buffer size (min 1)
/// - `await_listening`: whether `listening` waits for
///   [`Lifecycle::notify_listening`](crate::Lifecycle::notify_listening)
/// - `auto_initialize`: whether building schedules initialization
#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    /// Host label used in events and logs.
    pub name: String,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// A receiver that lags behind more than `bus_capacity` events observes
    /// `Lagged` and skips older items.
    pub bus_capacity: usize,

    /// When `true`, the `listening` phase depends on a one-shot bridge that
    /// the host resolves with [`Lifecycle::notify_listening`](crate::Lifecycle::notify_listening).
    ///
    /// Hosts without a transport set this to `false`; `listening` then
    /// resolves as soon as its own handlers do.
    pub await_listening: bool,

    /// When `true`, [`LifecycleBuilder::build`](crate::LifecycleBuilder::build)
    /// schedules initialization on the next scheduling turn.
    ///
    /// With `false` the host calls [`Lifecycle::initialize`](crate::Lifecycle::initialize)
    /// or [`Lifecycle::spawn_initialize`](crate::Lifecycle::spawn_initialize) itself.
    pub auto_initialize: bool,
}

impl LifecycleConfig {
    /// Default configuration with the given host label.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for LifecycleConfig {
    /// - `name = "host"`
    /// - `bus_capacity = 1024`
    /// - `await_listening = true`
    /// - `auto_initialize = true`
    fn default() -> Self {
        Self {
            name: "host".to_string(),
            bus_capacity: 1024,
            await_listening: true,
            auto_initialize: true,
        }
    }
}
