/// Events emitted by a [`SharedRegistry`](crate::SharedRegistry).
///
/// These events are passed to the tracing callback set via `set_trace_callback`.
/// `key` is the address of the configuration allocation (see
/// [`ConfigKey::id`](crate::ConfigKey::id)).
///
/// # Examples
///
/// ```rust
/// use shared_component::RegistryEvent;
///
/// let event = RegistryEvent::Construct { key: 0x10, generation: 1 };
/// assert_eq!(event.to_string(), "construct { key: 0x10, generation: 1 }");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A constructor ran and its instance was stored.
    Construct {
        key: usize,
        /// Generation of the new instance
        generation: u64,
    },

    /// An existing instance was handed out.
    Reuse { key: usize, generation: u64 },

    /// A constructor failed; nothing was stored.
    ConstructFailed { key: usize },

    /// A handle asked for its entry to be removed.
    Remove {
        key: usize,
        generation: u64,
        /// `false` when the entry was already gone or belongs to a newer generation
        removed: bool,
    },
}

impl std::fmt::Display for RegistryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryEvent::Construct { key, generation } => {
                write!(f, "construct {{ key: {:#x}, generation: {} }}", key, generation)
            }
            RegistryEvent::Reuse { key, generation } => {
                write!(f, "reuse {{ key: {:#x}, generation: {} }}", key, generation)
            }
            RegistryEvent::ConstructFailed { key } => {
                write!(f, "construct_failed {{ key: {:#x} }}", key)
            }
            RegistryEvent::Remove {
                key,
                generation,
                removed,
            } => write!(
                f,
                "remove {{ key: {:#x}, generation: {}, removed: {} }}",
                key, generation, removed
            ),
        }
    }
}
