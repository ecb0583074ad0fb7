//! # Shared Component
//!
//! A thread-safe registry that keeps at most one live instance of a stateful
//! component per configuration, shared by every caller that asks for it.
//!
//! A plugin host often asks a factory for separate capabilities of the same
//! component (a traces receiver, a logs receiver) through separate entry points.
//! Both requests must end up on the same instance, or listeners and buffers get
//! duplicated. [`SharedRegistry::get_or_add`] gives every caller the same
//! instance for a configuration, and [`Shared::shutdown`] removes it again so the
//! configuration can be built afresh.
//!
//! ## Quick Start
//!
//! ```rust
//! use shared_component::{ConfigKey, Shared, SharedRegistry};
//! use std::convert::Infallible;
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct Receiver {
//!     consumers: Mutex<Vec<&'static str>>,
//! }
//!
//! let receivers: SharedRegistry<String, Receiver> = SharedRegistry::new();
//! let config = ConfigKey::from_value("localhost:4318".to_string());
//!
//! let traces = receivers.get_or_add(&config, || Ok::<_, Infallible>(Receiver::default())).unwrap();
//! let logs = receivers.get_or_add(&config, || Ok::<_, Infallible>(Receiver::default())).unwrap();
//! logs.consumers.lock().unwrap().push("logs");
//!
//! assert!(Shared::ptr_eq(&traces, &logs));
//! assert_eq!(traces.consumers.lock().unwrap().len(), 1);
//! ```
//!
//! ## Keys are identities
//!
//! [`ConfigKey`] compares configurations by allocation, not by value. Two
//! configs with equal contents that were allocated separately get separate
//! instances.
//!
//! ## Main Types
//!
//! - [`SharedRegistry`] - get-or-create by key, lookup, tracing callback
//! - [`Shared`] - handle to one instance; `release`, `start`, `shutdown`
//! - [`ConfigKey`] / [`ErasedConfig`] - identity keys, typed and type-erased
//! - [`Component`] - optional start/shutdown hooks
//! - [`define_shared_registry!`] - declare a process-wide registry static

mod config_key;
mod macros;
mod registry;
mod registry_error;
mod registry_event;
mod shared;

pub use config_key::{ConfigKey, ErasedConfig};
pub use registry::{SharedRegistry, TraceCallback};
pub use registry_error::{ConfigMismatch, RegistryError};
pub use registry_event::RegistryEvent;
pub use shared::{Component, Shared};
