//! # Host-keyed lifecycle registry.
//!
//! Maps a host (any `Arc<H>`) to exactly one [`Lifecycle`], created on first
//! access. The registry holds the host **weakly**: it never keeps a host
//! alive, and the entry is released once the host is dropped.
//!
//! ## Architecture
//! ```text
//! Registry::of(&host)
//!     ├─► purge entries whose host was dropped
//!     ├─► key = address of the host allocation
//!     ├─► entry found ─► existing Arc<Lifecycle>
//!     └─► missing     ─► build as "<template name>:<host type>@<key>", insert, return
//! ```
//!
//! Purging drops the registry's handle on a dead host's lifecycle, which
//! stops its bus listener once no one else holds it.
//!
//! ## Rules
//! - One lifecycle per live host identity.
//! - An address reused by a new host after the old one was dropped gets a
//!   fresh lifecycle (the stale entry fails the weak check).
//! - [`Lifecycle::of`] uses a process-wide registry with the default config.
//! - Each lifecycle is labelled per host, so events of different hosts stay
//!   apart.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use tracing::debug;

use super::{config::LifecycleConfig, lifecycle::Lifecycle};

struct Entry {
    host: Weak<dyn Any + Send + Sync>,
    lifecycle: Arc<Lifecycle>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.host.strong_count() > 0
    }
}

/// Weak, identity-keyed map from hosts to their lifecycles.
pub struct Registry {
    template: LifecycleConfig,
    entries: Mutex<HashMap<usize, Entry>>,
}

impl Registry {
    /// Creates an empty registry; new lifecycles are built from `template`.
    pub fn new(template: LifecycleConfig) -> Self {
        Self {
            template,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the lifecycle of `host`, building it on first access.
    ///
    /// Must be called inside a tokio runtime the first time for a host.
    pub fn of<H>(&self, host: &Arc<H>) -> Arc<Lifecycle>
    where
        H: Send + Sync + 'static,
    {
        let key = key_of(host);
        let mut entries = self.purged();
        if let Some(e) = entries.get(&key) {
            return Arc::clone(&e.lifecycle);
        }

        let cfg = LifecycleConfig {
            name: format!("{}:{}@{key:#x}", self.template.name, short_type_name::<H>()),
            ..self.template.clone()
        };
        let lifecycle = Lifecycle::builder(cfg).build();
        let weak: Weak<H> = Arc::downgrade(host);
        let weak: Weak<dyn Any + Send + Sync> = weak;
        entries.insert(
            key,
            Entry {
                host: weak,
                lifecycle: Arc::clone(&lifecycle),
            },
        );
        debug!(host = %lifecycle.name(), live = entries.len(), "lifecycle registered");
        lifecycle
    }

    /// Returns the lifecycle of `host` if one was already built.
    pub fn get<H>(&self, host: &Arc<H>) -> Option<Arc<Lifecycle>>
    where
        H: Send + Sync + 'static,
    {
        self.purged()
            .get(&key_of(host))
            .map(|e| Arc::clone(&e.lifecycle))
    }

    /// Number of entries whose host is still alive.
    pub fn len(&self) -> usize {
        self.purged().len()
    }

    /// True if no live host is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Locks the map after dropping entries of dead hosts.
    fn purged(&self) -> MutexGuard<'_, HashMap<usize, Entry>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, e| e.is_live());
        entries
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(LifecycleConfig::default())
    }
}

/// Process-wide registry behind [`Lifecycle::of`].
pub(crate) fn global() -> &'static Registry {
    static GLOBAL: OnceLock<Registry> = OnceLock::new();
    GLOBAL.get_or_init(Registry::default)
}

fn key_of<H>(host: &Arc<H>) -> usize {
    Arc::as_ptr(host) as *const () as usize
}

/// `my_app::Server<T>` → `Server`.
fn short_type_name<H>() -> &'static str {
    let full = std::any::type_name::<H>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Host;

    #[tokio::test]
    async fn same_host_same_lifecycle() {
        let registry = Registry::new(LifecycleConfig::named("api"));
        let host = Arc::new(Host);
        let other = Arc::new(Host);

        let a = registry.of(&host);
        let b = registry.of(&host);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &registry.of(&other)));
        assert_eq!(registry.len(), 2);
        assert!(a.name().starts_with("api:Host@0x"));
        assert_ne!(a.name(), registry.of(&other).name());
    }

    #[tokio::test]
    async fn does_not_keep_host_alive() {
        let registry = Registry::default();
        let host = Arc::new(Host);
        let _ = registry.of(&host);
        let weak = Arc::downgrade(&host);

        drop(host);
        assert!(weak.upgrade().is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn releases_lifecycle_of_dropped_host() {
        let registry = Registry::default();
        let host = Arc::new(Host);
        let lifecycle = Arc::downgrade(&registry.of(&host));

        drop(host);
        assert!(lifecycle.upgrade().is_some());
        assert!(registry.get(&Arc::new(Host)).is_none());
        assert!(lifecycle.upgrade().is_none());
    }

    #[test]
    fn short_type_names() {
        assert_eq!(short_type_name::<Host>(), "Host");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
        assert_eq!(short_type_name::<u8>(), "u8");
    }

    #[tokio::test]
    async fn get_does_not_create() {
        let registry = Registry::default();
        let host = Arc::new(String::from("host"));
        assert!(registry.get(&host).is_none());
        let built = registry.of(&host);
        assert!(Arc::ptr_eq(&registry.get(&host).unwrap(), &built));
    }
}
