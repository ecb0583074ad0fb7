use thiserror::Error;

/// A configuration handed to a factory was not of the expected kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("config was not a `{expected}` config")]
pub struct ConfigMismatch {
    /// Type name of the configuration the caller expected.
    pub expected: &'static str,
}

impl ConfigMismatch {
    pub(crate) fn of<C: ?Sized>() -> Self {
        Self {
            expected: std::any::type_name::<C>(),
        }
    }
}

/// Errors returned by [`SharedRegistry::get_or_add_erased`](crate::SharedRegistry::get_or_add_erased).
///
/// The typed `get_or_add` never wraps anything and returns the constructor's
/// error as is. The erased path must also report a configuration of the wrong
/// kind, so the two cases are kept apart here. Construction errors display
/// exactly like the underlying error.
#[derive(Debug, PartialEq, Error)]
pub enum RegistryError<E> {
    #[error("config was not a `{expected}` config")]
    ConfigMismatch { expected: &'static str },

    #[error(transparent)]
    Construction(E),
}

impl<E> From<ConfigMismatch> for RegistryError<E> {
    fn from(err: ConfigMismatch) -> Self {
        RegistryError::ConfigMismatch {
            expected: err.expected,
        }
    }
}

impl<E> RegistryError<E> {
    /// Returns the constructor error, if this is one.
    pub fn into_construction(self) -> Option<E> {
        match self {
            RegistryError::Construction(err) => Some(err),
            RegistryError::ConfigMismatch { .. } => None,
        }
    }
}
