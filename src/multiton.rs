//! Per-type access to a keyed registry.
//!
//! This module provides the `Multiton` trait with default implementations for
//! creating, destroying and enumerating the instances of one type.
//!
//! Each implementing type owns exactly one [`InstanceRegistry`], so two types
//! never share instances even when their keys are equal. The
//! [`define_multiton!`](crate::define_multiton) macro writes the impl.

use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;

use crate::{Instance, InstanceRegistry, RegistryError, RegistryEvent};

/// A type whose instances are created once per key and cached.
///
/// Provides default implementations for all operations, requiring only the
/// `registry` accessor to be implemented. Values of the type are only ever
/// handed out as `Arc<Instance<Self::Key, Self>>`.
pub trait Multiton: Sized + Send + Sync + 'static {
    /// Identifies an instance.
    type Key: Eq + Hash + Clone + Debug + Send + Sync + 'static;

    /// Constructor arguments passed to the factory, `()` for none.
    type Args: 'static;

    /// Access the registry static.
    ///
    /// Must return the same registry on every call.
    fn registry() -> &'static InstanceRegistry<Self::Key, Self, Self::Args>;

    /// Returns the instance for `key`, building it from `args` on first use.
    ///
    /// See [`InstanceRegistry::create`].
    fn create(key: Self::Key, args: Self::Args) -> Result<Arc<Instance<Self::Key, Self>>, RegistryError> {
        Self::registry().create(key, args)
    }

    /// Returns the instance for `key` for types built without constructor arguments.
    fn get(key: Self::Key) -> Result<Arc<Instance<Self::Key, Self>>, RegistryError>
    where
        Self: Multiton<Args = ()>,
    {
        Self::registry().get(key)
    }

    /// Removes and returns the instance for `key`.
    fn destroy(key: &Self::Key) -> Result<Option<Arc<Instance<Self::Key, Self>>>, RegistryError> {
        Self::registry().destroy(key)
    }

    fn contains(key: &Self::Key) -> bool {
        Self::registry().contains(key)
    }

    fn len() -> usize {
        Self::registry().len()
    }

    fn is_empty() -> bool {
        Self::registry().is_empty()
    }

    /// Visits a snapshot of the instances in creation order.
    fn for_each(
        visitor: impl FnMut(&Self::Key, &Arc<Instance<Self::Key, Self>>),
    ) -> Result<(), RegistryError> {
        Self::registry().for_each(visitor)
    }

    fn try_for_each<E>(
        visitor: impl FnMut(&Self::Key, &Arc<Instance<Self::Key, Self>>) -> Result<(), E>,
    ) -> Result<(), E>
    where
        E: From<RegistryError>,
    {
        Self::registry().try_for_each(visitor)
    }

    /// Returns the instances in creation order.
    fn to_vec() -> Result<Vec<Arc<Instance<Self::Key, Self>>>, RegistryError> {
        Self::registry().to_vec()
    }

    fn keys() -> Result<Vec<Self::Key>, RegistryError> {
        Self::registry().keys()
    }

    /// Removes every instance of the type.
    ///
    /// This method is primarily intended for tests sharing one static registry.
    #[doc(hidden)]
    fn clear() -> Result<(), RegistryError> {
        Self::registry().clear()
    }

    fn set_trace_callback(callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        Self::registry().set_trace_callback(callback)
    }

    fn clear_trace_callback() {
        Self::registry().clear_trace_callback()
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
