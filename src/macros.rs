//! Macros for declaring process-wide shared registries.

/// Declares a process-wide [`SharedRegistry`](crate::SharedRegistry) static.
///
/// The static is created lazily on first use and lives for the rest of the
/// process. Its identifier doubles as the registry name in log records.
///
/// # Examples
///
/// ```rust
/// use shared_component::{define_shared_registry, ConfigKey};
/// use std::convert::Infallible;
///
/// pub struct Config {
///     pub endpoint: String,
/// }
///
/// pub struct Receiver;
///
/// // One receiver per configuration, shared by every factory entry point
/// define_shared_registry!(pub RECEIVERS: Config => Receiver);
///
/// let config = ConfigKey::from_value(Config { endpoint: "localhost:4318".into() });
/// let traces = RECEIVERS.get_or_add(&config, || Ok::<_, Infallible>(Receiver)).unwrap();
/// let logs = RECEIVERS.get_or_add(&config, || Ok::<_, Infallible>(Receiver)).unwrap();
///
/// assert_eq!(traces.generation(), logs.generation());
/// assert_eq!(RECEIVERS.name(), "RECEIVERS");
/// ```
#[macro_export]
macro_rules! define_shared_registry {
    ($vis:vis $name:ident : $config:ty => $component:ty) => {
        $vis static $name: ::std::sync::LazyLock<$crate::SharedRegistry<$config, $component>> =
            ::std::sync::LazyLock::new(|| $crate::SharedRegistry::with_name(stringify!($name)));
    };
}
