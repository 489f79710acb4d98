use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{config::LifecycleConfig, lifecycle::Lifecycle, pending::PendingTracker};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for a [`Lifecycle`] with optional subscribers.
pub struct LifecycleBuilder {
    cfg: LifecycleConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl LifecycleBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: LifecycleConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events (status, readyable activation
    /// and resolution, setup faults) through dedicated workers with bounded
    /// queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the lifecycle, starts its bus listener and, unless
    /// [`auto_initialize`](LifecycleConfig::auto_initialize) is off, schedules
    /// initialization on the next scheduling turn.
    ///
    /// Must be called inside a tokio runtime.
    pub fn build(self) -> Arc<Lifecycle> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(self.subscribers, bus.clone());
        let pending = Arc::new(PendingTracker::new());
        let runtime_token = CancellationToken::new();

        let lifecycle = Arc::new(Lifecycle::new_internal(
            self.cfg,
            bus,
            Arc::clone(&pending),
            runtime_token,
        ));
        lifecycle.spawn_listener(subs, pending);
        if lifecycle.config().auto_initialize {
            lifecycle.schedule_initialize();
        }
        lifecycle
    }
}
