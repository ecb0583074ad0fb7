//! Handles to shared component instances.

use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Weak};

use crate::registry::{Inner, Slot};
use crate::ConfigKey;

/// Lifecycle hooks of a component that lives in a [`SharedRegistry`](crate::SharedRegistry).
///
/// Implementing it is optional; it enables [`Shared::start`] and
/// [`Shared::shutdown`], which run the hooks once per generation no matter how
/// many callers hold a handle.
pub trait Component: Send + Sync {
    type Error;

    fn start(&self) -> Result<(), Self::Error>;

    fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A caller's handle to a shared component instance.
///
/// Every handle from the same generation points at the same instance. Capability
/// state that callers attach to the component (through its own interior
/// mutability) is therefore visible to all of them.
///
/// The handle holds a weak reference back to its registry. [`release`](Self::release)
/// and [`shutdown`](Self::shutdown) use it to drop the registry entry for its key.
pub struct Shared<C: ?Sized, T> {
    key: ConfigKey<C>,
    slot: Arc<Slot<T>>,
    component: Arc<T>,
    registry: Weak<Inner<C, T>>,
}

impl<C: ?Sized, T> Shared<C, T> {
    pub(crate) fn new(
        key: ConfigKey<C>,
        slot: Arc<Slot<T>>,
        component: Arc<T>,
        registry: Weak<Inner<C, T>>,
    ) -> Self {
        Self {
            key,
            slot,
            component,
            registry,
        }
    }

    /// The underlying component.
    pub fn component(&self) -> &Arc<T> {
        &self.component
    }

    /// The configuration key this instance was built for.
    pub fn key(&self) -> &ConfigKey<C> {
        &self.key
    }

    /// Registry-unique number of this instance's generation.
    pub fn generation(&self) -> u64 {
        self.slot.generation
    }

    /// Returns `true` if both handles belong to the same generation.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.slot, &other.slot)
    }

    /// Removes this generation's entry from the registry.
    ///
    /// Only the entry that still points at this generation is removed; if the
    /// key has since been taken by a newer instance, that instance is left
    /// alone. Safe to call any number of times from any handle.
    ///
    /// Returns `true` if this call removed the entry.
    pub fn release(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(&self.key, &self.slot),
            None => false,
        }
    }
}

impl<C: ?Sized, T: Component> Shared<C, T> {
    /// Starts the component, once per generation.
    ///
    /// Only the first call runs [`Component::start`] and sees its result.
    /// Concurrent callers wait until it has finished, then return `Ok(())`.
    pub fn start(&self) -> Result<(), T::Error> {
        let mut result = Ok(());
        self.slot.started.get_or_init(|| {
            result = self.component.start();
        });
        result
    }

    /// Shuts the component down, once per generation, and releases its registry entry.
    ///
    /// The entry is released even when [`Component::shutdown`] fails, so the
    /// same configuration can be built again. Concurrent callers wait until
    /// the first call has shut down and released the entry, then return `Ok(())`.
    pub fn shutdown(&self) -> Result<(), T::Error> {
        let mut result = Ok(());
        self.slot.stopped.get_or_init(|| {
            result = self.component.shutdown();
            self.release();
        });
        result
    }
}

impl<C: ?Sized, T> Clone for Shared<C, T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            slot: Arc::clone(&self.slot),
            component: Arc::clone(&self.component),
            registry: Weak::clone(&self.registry),
        }
    }
}

impl<C: ?Sized, T> Deref for Shared<C, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.component
    }
}

impl<C: ?Sized, T> fmt::Debug for Shared<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("key", &self.key)
            .field("generation", &self.slot.generation)
            .finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SharedRegistry;
    use parking_lot::Mutex;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Listener {
        starts: AtomicUsize,
        stops: AtomicUsize,
        fail_shutdown: bool,
        consumers: Mutex<Vec<&'static str>>,
    }

    #[derive(Debug, PartialEq)]
    struct ListenerError;

    impl Component for Listener {
        type Error = ListenerError;

        fn start(&self) -> Result<(), ListenerError> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn shutdown(&self) -> Result<(), ListenerError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            if self.fail_shutdown {
                Err(ListenerError)
            } else {
                Ok(())
            }
        }
    }

    fn setup() -> (SharedRegistry<u16, Listener>, ConfigKey<u16>) {
        (SharedRegistry::new(), ConfigKey::from_value(4318))
    }

    #[test]
    fn test_start_runs_once_per_generation() {
        let (registry, key) = setup();
        let traces = registry
            .get_or_add(&key, || Ok::<_, Infallible>(Listener::default()))
            .unwrap();
        let logs = registry
            .get_or_add(&key, || Ok::<_, Infallible>(Listener::default()))
            .unwrap();

        traces.start().unwrap();
        logs.start().unwrap();

        assert_eq!(traces.starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_shutdown_runs_once_and_releases() {
        let (registry, key) = setup();
        let traces = registry
            .get_or_add(&key, || Ok::<_, Infallible>(Listener::default()))
            .unwrap();
        let logs = traces.clone();

        traces.shutdown().unwrap();
        logs.shutdown().unwrap();

        assert_eq!(traces.stops.load(Ordering::SeqCst), 1);
        assert!(!registry.contains(&key));
    }

    #[test]
    fn test_failed_shutdown_still_releases() {
        let (registry, key) = setup();
        let shared = registry
            .get_or_add(&key, || {
                Ok::<_, Infallible>(Listener {
                    fail_shutdown: true,
                    ..Listener::default()
                })
            })
            .unwrap();

        assert_eq!(shared.shutdown(), Err(ListenerError));
        assert!(!registry.contains(&key));

        // Second call is a no-op
        assert_eq!(shared.shutdown(), Ok(()));
    }

    #[test]
    fn test_new_generation_has_fresh_lifecycle() {
        let (registry, key) = setup();
        let old = registry
            .get_or_add(&key, || Ok::<_, Infallible>(Listener::default()))
            .unwrap();
        old.start().unwrap();
        old.shutdown().unwrap();

        let new = registry
            .get_or_add(&key, || Ok::<_, Infallible>(Listener::default()))
            .unwrap();
        new.start().unwrap();

        assert!(!Shared::ptr_eq(&old, &new));
        assert_eq!(new.starts.load(Ordering::SeqCst), 1);
        assert!(registry.contains(&key));
    }

    #[test]
    fn test_capability_registration_is_shared() {
        let (registry, key) = setup();
        let traces = registry
            .get_or_add(&key, || Ok::<_, Infallible>(Listener::default()))
            .unwrap();
        let logs = registry
            .get_or_add(&key, || Ok::<_, Infallible>(Listener::default()))
            .unwrap();

        logs.consumers.lock().push("logs");

        assert_eq!(*traces.consumers.lock(), vec!["logs"]);
        assert!(Arc::ptr_eq(traces.component(), logs.component()));
        assert_eq!(traces.key(), &key);
    }

    #[test]
    fn test_debug_format() {
        let (registry, key) = setup();
        let shared = registry
            .get_or_add(&key, || Ok::<_, Infallible>(Listener::default()))
            .unwrap();

        let rendered = format!("{:?}", shared);
        assert!(rendered.starts_with("Shared { key: ConfigKey(0x"));
        assert!(rendered.contains("generation: 1"));
    }
}
