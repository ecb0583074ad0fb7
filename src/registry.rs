//! The shared-instance registry.
//!
//! A [`SharedRegistry`] maps configuration identities to lazily constructed
//! component instances. Each key owns at most one live instance (a generation);
//! construction runs at most once per generation even under concurrent first
//! access, and a failed construction leaves nothing behind.
//!
//! # Examples
//!
//! ```
//! use shared_component::{ConfigKey, Shared, SharedRegistry};
//! use std::convert::Infallible;
//!
//! struct Receiver {
//!     endpoint: String,
//! }
//!
//! let registry: SharedRegistry<String, Receiver> = SharedRegistry::new();
//! let config = ConfigKey::from_value("localhost:4318".to_string());
//!
//! // The traces factory builds the receiver...
//! let traces = registry
//!     .get_or_add(&config, || Ok::<_, Infallible>(Receiver { endpoint: config.as_str().to_owned() }))
//!     .unwrap();
//!
//! // ...and the logs factory gets the very same one.
//! let logs = registry
//!     .get_or_add(&config, || -> Result<Receiver, Infallible> { unreachable!() })
//!     .unwrap();
//!
//! assert!(Shared::ptr_eq(&traces, &logs));
//! assert_eq!(logs.endpoint, "localhost:4318");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::{ConfigKey, ErasedConfig, RegistryError, RegistryEvent, Shared};

/// Type alias for the user-supplied tracing callback.
///
/// The callback receives a reference to a `RegistryEvent` every time the
/// registry constructs, reuses or removes an instance. It runs with no registry
/// lock held.
pub type TraceCallback = dyn Fn(&RegistryEvent) + Send + Sync + 'static;

// -------------------------------------------------------------------------------------------------
// Internals
// -------------------------------------------------------------------------------------------------

/// One generation of a key: the instance once built, plus its lifecycle flags.
pub(crate) struct Slot<T> {
    pub(crate) generation: u64,
    pub(crate) component: OnceCell<Arc<T>>,
    // Set once the first `start`/`shutdown` call has finished; later callers wait on it.
    pub(crate) started: OnceCell<()>,
    pub(crate) stopped: OnceCell<()>,
}

impl<T> Slot<T> {
    fn new(generation: u64) -> Self {
        Self {
            generation,
            component: OnceCell::new(),
            started: OnceCell::new(),
            stopped: OnceCell::new(),
        }
    }
}

struct Entry<T> {
    slot: Arc<Slot<T>>,
    // Callers currently inside `get_or_add` for this slot.
    in_flight: usize,
}

pub(crate) struct Inner<C: ?Sized, T> {
    name: &'static str,
    entries: Mutex<HashMap<ConfigKey<C>, Entry<T>>>,
    trace: Mutex<Option<Arc<TraceCallback>>>,
    generations: AtomicU64,
}

impl<C: ?Sized, T> Inner<C, T> {
    fn emit_event(&self, event: &RegistryEvent) {
        let callback = self.trace.lock().clone();
        if let Some(callback) = callback {
            callback(event);
        }
    }

    /// Registers a caller on the current slot for `key`, creating an empty one if needed.
    fn enter<'a>(&'a self, key: &'a ConfigKey<C>) -> InFlight<'a, C, T> {
        let mut entries = self.entries.lock();
        let entry = entries.entry(key.clone()).or_insert_with(|| Entry {
            slot: Arc::new(Slot::new(
                self.generations.fetch_add(1, Ordering::Relaxed) + 1,
            )),
            in_flight: 0,
        });
        entry.in_flight += 1;

        InFlight {
            inner: self,
            key,
            slot: Arc::clone(&entry.slot),
        }
    }

    /// Removes the entry for `key` if it still belongs to `slot`.
    pub(crate) fn remove(&self, key: &ConfigKey<C>, slot: &Arc<Slot<T>>) -> bool {
        let removed = {
            let mut entries = self.entries.lock();
            match entries.get(key) {
                Some(entry) if Arc::ptr_eq(&entry.slot, slot) => {
                    entries.remove(key);
                    true
                }
                _ => false,
            }
        };

        if removed {
            info!(registry = self.name, key = ?key, generation = slot.generation, "removed shared component");
        } else {
            warn!(registry = self.name, key = ?key, generation = slot.generation, "shared component already replaced or removed");
        }

        self.emit_event(&RegistryEvent::Remove {
            key: key.id(),
            generation: slot.generation,
            removed,
        });

        removed
    }
}

/// Guard for a caller inside `get_or_add`.
///
/// Dropping it (also on constructor panic) releases the caller's interest in the
/// slot; the last caller out of a slot that never got an instance removes it.
struct InFlight<'a, C: ?Sized, T> {
    inner: &'a Inner<C, T>,
    key: &'a ConfigKey<C>,
    slot: Arc<Slot<T>>,
}

impl<C: ?Sized, T> Drop for InFlight<'_, C, T> {
    fn drop(&mut self) {
        let mut entries = self.inner.entries.lock();
        let Some(entry) = entries.get_mut(self.key) else {
            return;
        };
        if !Arc::ptr_eq(&entry.slot, &self.slot) {
            return;
        }

        entry.in_flight -= 1;
        if entry.in_flight == 0 && entry.slot.component.get().is_none() {
            entries.remove(self.key);
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Registry
// -------------------------------------------------------------------------------------------------

/// Concurrency-safe registry handing out one shared instance per configuration identity.
///
/// Keys are [`ConfigKey`]s, compared by pointer identity. Cloning the registry
/// clones a handle to the same map. Handles returned by
/// [`get_or_add`](Self::get_or_add) keep only a weak reference back to it, so
/// the registry stays the sole owner of its entries.
///
/// A registry that should live for the whole process is usually declared with
/// [`define_shared_registry!`](crate::define_shared_registry).
pub struct SharedRegistry<C: ?Sized, T> {
    inner: Arc<Inner<C, T>>,
}

impl<C: ?Sized, T> SharedRegistry<C, T> {
    /// Creates an empty registry named `"shared"`.
    pub fn new() -> Self {
        Self::with_name("shared")
    }

    /// Creates an empty registry; `name` labels its log records.
    pub fn with_name(name: &'static str) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                entries: Mutex::new(HashMap::new()),
                trace: Mutex::new(None),
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Returns the instance for `key`, constructing it with `constructor` if there is none.
    ///
    /// The constructor runs at most once per generation of `key`: concurrent
    /// callers for the same key wait for the one that is constructing and then
    /// receive its instance. Callers for other keys are not blocked by a slow
    /// constructor.
    ///
    /// The constructor must not call `get_or_add` for the same key on this
    /// registry; that deadlocks.
    ///
    /// # Errors
    ///
    /// Returns the constructor's error unchanged. Nothing is stored for `key`,
    /// so a later call may try again. A caller that was waiting on the failed
    /// construction runs its own constructor instead.
    pub fn get_or_add<E, F>(&self, key: &ConfigKey<C>, constructor: F) -> Result<Shared<C, T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let in_flight = self.inner.enter(key);
        let slot = Arc::clone(&in_flight.slot);

        let mut constructed = false;
        let result = slot
            .component
            .get_or_try_init(|| {
                constructed = true;
                constructor().map(Arc::new)
            })
            .map(Arc::clone);

        drop(in_flight);

        match result {
            Ok(component) => {
                let generation = slot.generation;
                if constructed {
                    info!(registry = self.inner.name, key = ?key, generation, "constructed shared component");
                    self.inner.emit_event(&RegistryEvent::Construct {
                        key: key.id(),
                        generation,
                    });
                } else {
                    debug!(registry = self.inner.name, key = ?key, generation, "reusing shared component");
                    self.inner.emit_event(&RegistryEvent::Reuse {
                        key: key.id(),
                        generation,
                    });
                }

                Ok(Shared::new(
                    key.clone(),
                    slot,
                    component,
                    Arc::downgrade(&self.inner),
                ))
            }
            Err(err) => {
                warn!(registry = self.inner.name, key = ?key, "shared component construction failed");
                self.inner
                    .emit_event(&RegistryEvent::ConstructFailed { key: key.id() });
                Err(err)
            }
        }
    }

    /// Returns the live instance for `key` without constructing one.
    pub fn get(&self, key: &ConfigKey<C>) -> Option<Shared<C, T>> {
        let found = {
            let entries = self.inner.entries.lock();
            entries.get(key).and_then(|entry| {
                let component = entry.slot.component.get()?;
                Some((Arc::clone(&entry.slot), Arc::clone(component)))
            })
        };

        match found {
            Some((slot, component)) => {
                debug!(registry = self.inner.name, key = ?key, generation = slot.generation, "found shared component");
                Some(Shared::new(
                    key.clone(),
                    slot,
                    component,
                    Arc::downgrade(&self.inner),
                ))
            }
            None => {
                debug!(registry = self.inner.name, key = ?key, "no shared component for key");
                None
            }
        }
    }

    /// Checks whether a constructed instance exists for `key`.
    pub fn contains(&self, key: &ConfigKey<C>) -> bool {
        self.inner
            .entries
            .lock()
            .get(key)
            .is_some_and(|entry| entry.slot.component.get().is_some())
    }

    /// Number of keys with a constructed instance.
    ///
    /// Keys whose first construction is still running are not counted.
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .lock()
            .values()
            .filter(|entry| entry.slot.component.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -------------------------------------------------------------------------------------------------
    // Tracing
    // -------------------------------------------------------------------------------------------------

    /// Sets a tracing callback invoked on every construction, reuse and removal.
    ///
    /// The callback runs with no registry lock held, so it may call back into
    /// the registry.
    pub fn set_trace_callback(&self, callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        *self.inner.trace.lock() = Some(Arc::new(callback));
    }

    /// Clears the tracing callback.
    pub fn clear_trace_callback(&self) {
        *self.inner.trace.lock() = None;
    }
}

impl<C: std::any::Any + Send + Sync, T> SharedRegistry<C, T> {
    /// Like [`get_or_add`](Self::get_or_add), for hosts that hand out type-erased configs.
    ///
    /// The config is downcast to `C` first; the typed key shares its identity
    /// with `config`, so every factory handed the same erased config resolves to
    /// the same instance.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::ConfigMismatch`] if `config` is not a `C`. The
    ///   constructor is not called.
    /// - [`RegistryError::Construction`] wrapping the constructor's error.
    pub fn get_or_add_erased<E, F>(
        &self,
        config: &ErasedConfig,
        constructor: F,
    ) -> Result<Shared<C, T>, RegistryError<E>>
    where
        F: FnOnce(&Arc<C>) -> Result<T, E>,
    {
        let key = config.downcast::<C>()?;
        self.get_or_add(&key, || constructor(key.config()))
            .map_err(RegistryError::Construction)
    }
}

impl<C: ?Sized, T> Clone for SharedRegistry<C, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: ?Sized, T> Default for SharedRegistry<C, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized, T> fmt::Debug for SharedRegistry<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRegistry")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .finish()
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
