//! Identity keys for shared components.
//!
//! A [`ConfigKey`] wraps an `Arc` to a configuration value and compares by the
//! address of that allocation, never by the value behind it. Two callers that
//! hold clones of the same `Arc` resolve to the same key; two configurations that
//! are structurally identical but allocated separately are different keys.
//!
//! Switching to value equality would silently change which callers share an
//! instance, so no `PartialEq`-based keying is offered.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::ConfigMismatch;

/// A type-erased configuration as handed out by a plugin host.
pub type ErasedConfig = ConfigKey<dyn Any + Send + Sync>;

/// Identity token for a configuration value.
///
/// The key holds a strong reference to the configuration, so the address it is
/// compared by stays reserved for as long as the key (or any entry built from
/// it) is alive.
///
/// # Examples
///
/// ```rust
/// use shared_component::ConfigKey;
/// use std::sync::Arc;
///
/// let config = Arc::new(String::from("0.0.0.0:4318"));
/// let a = ConfigKey::new(config.clone());
/// let b = ConfigKey::new(config);
/// assert_eq!(a, b);
///
/// // Same contents, different allocation: a different key.
/// let c = ConfigKey::from_value(String::from("0.0.0.0:4318"));
/// assert_ne!(a, c);
/// ```
pub struct ConfigKey<C: ?Sized> {
    config: Arc<C>,
}

impl<C: ?Sized> ConfigKey<C> {
    /// Wraps an existing shared configuration.
    pub fn new(config: Arc<C>) -> Self {
        Self { config }
    }

    /// The shared configuration behind this key.
    pub fn config(&self) -> &Arc<C> {
        &self.config
    }

    /// Address of the configuration allocation, used for hashing and display.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.config).cast::<()>() as usize
    }

    /// Returns `true` when both keys point at the same allocation.
    pub fn same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl<C> ConfigKey<C> {
    /// Allocates `config` and returns a key for the new allocation.
    pub fn from_value(config: C) -> Self {
        Self::new(Arc::new(config))
    }
}

impl ErasedConfig {
    /// Erases the configuration type of `config`, keeping its identity.
    pub fn erase<C: Any + Send + Sync>(config: Arc<C>) -> Self {
        Self::new(config)
    }

    /// Recovers a typed key for the same allocation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigMismatch`] when the configuration is not a `C`.
    pub fn downcast<C: Any + Send + Sync>(&self) -> Result<ConfigKey<C>, ConfigMismatch> {
        self.config
            .clone()
            .downcast::<C>()
            .map(ConfigKey::new)
            .map_err(|_| ConfigMismatch::of::<C>())
    }
}

impl<C: ?Sized> Clone for ConfigKey<C> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}

impl<C: ?Sized> PartialEq for ConfigKey<C> {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl<C: ?Sized> Eq for ConfigKey<C> {}

impl<C: ?Sized> Hash for ConfigKey<C> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl<C: ?Sized> From<Arc<C>> for ConfigKey<C> {
    fn from(config: Arc<C>) -> Self {
        Self::new(config)
    }
}

impl<C: ?Sized> std::ops::Deref for ConfigKey<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.config
    }
}

impl<C: ?Sized> fmt::Debug for ConfigKey<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigKey({:#x})", self.id())
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
