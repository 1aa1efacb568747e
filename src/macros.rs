//! Macros for attaching a registry to a type.

/// Implements [`Multiton`](crate::Multiton) for a type with a single macro invocation.
///
/// The macro generates:
/// - A lazily initialized registry static (hidden inside the accessor)
/// - The `Multiton` impl pointing at it, with the registry named after the type
///
/// Use `factory = ...` for constructors that cannot fail and
/// `try_factory = ...` for ones returning `Result<Self, RegistryError>`.
/// `args = ...` may be omitted when the type takes no constructor arguments.
///
/// # Examples
///
/// ```rust
/// use multiton_registry::{define_multiton, Multiton};
/// use std::sync::Arc;
///
/// struct Pool {
///     host: String,
///     size: u32,
/// }
///
/// define_multiton!(Pool, key = String, args = u32, factory = |host, size| Pool {
///     host: host.clone(),
///     size,
/// });
///
/// let a = Pool::create("db".to_string(), 8).unwrap();
/// let b = Pool::create("db".to_string(), 32).unwrap();
///
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.size, 8);
/// ```
///
/// # Fallible Construction
///
/// ```rust
/// use multiton_registry::{define_multiton, Multiton, RegistryError};
///
/// struct Shard(u8);
///
/// define_multiton!(Shard, key = u32, try_factory = |id, ()| {
///     u8::try_from(*id)
///         .map(Shard)
///         .map_err(|_| RegistryError::invalid_arguments("shard id must fit in a byte"))
/// });
///
/// assert_eq!(Shard::get(7).unwrap().0, 7);
/// assert!(Shard::get(700).is_err());
/// assert!(!Shard::contains(&700));
/// ```
///
/// # Isolation
///
/// Every type gets its own registry:
///
/// ```rust
/// use multiton_registry::{define_multiton, Multiton};
///
/// struct Reader(String);
/// struct Writer(String);
///
/// define_multiton!(Reader, key = &'static str, factory = |k, ()| Reader(format!("r:{k}")));
/// define_multiton!(Writer, key = &'static str, factory = |k, ()| Writer(format!("w:{k}")));
///
/// assert_eq!(Reader::get("x").unwrap().0, "r:x");
/// assert_eq!(Writer::get("x").unwrap().0, "w:x");
/// ```
#[macro_export]
macro_rules! define_multiton {
    (@impl $ty:ty, $key:ty, $args:ty, $registry:expr) => {
        impl $crate::Multiton for $ty {
            type Key = $key;
            type Args = $args;

            fn registry() -> &'static $crate::InstanceRegistry<$key, $ty, $args> {
                // Storage for created instances (private to the accessor)
                static REGISTRY: ::std::sync::LazyLock<$crate::InstanceRegistry<$key, $ty, $args>> =
                    ::std::sync::LazyLock::new(|| $registry.with_name(stringify!($ty)));
                &REGISTRY
            }

            // All other methods (create, destroy, for_each, etc.) are provided by
            // the trait's default implementations.
        }
    };
    ($ty:ty, key = $key:ty, args = $args:ty, factory = $factory:expr $(,)?) => {
        $crate::define_multiton!(@impl $ty, $key, $args,
            $crate::InstanceRegistry::<$key, $ty, $args>::new($factory));
    };
    ($ty:ty, key = $key:ty, args = $args:ty, try_factory = $factory:expr $(,)?) => {
        $crate::define_multiton!(@impl $ty, $key, $args,
            $crate::InstanceRegistry::<$key, $ty, $args>::try_new($factory));
    };
    ($ty:ty, key = $key:ty, factory = $factory:expr $(,)?) => {
        $crate::define_multiton!($ty, key = $key, args = (), factory = $factory);
    };
    ($ty:ty, key = $key:ty, try_factory = $factory:expr $(,)?) => {
        $crate::define_multiton!($ty, key = $key, args = (), try_factory = $factory);
    };
}
