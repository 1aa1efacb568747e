//! The record a registry hands out for each key.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// A cached instance together with the key it was created for.
///
/// The registry binds `id` before the factory runs and never changes it
/// afterwards. There is no public constructor and no `Clone` impl: the only
/// way to obtain an `Instance` is through an
/// [`InstanceRegistry`](crate::InstanceRegistry), which hands out shared
/// `Arc<Instance<K, V>>` handles to the one copy it owns.
///
/// Equality is identity. Two handles compare equal only if they point at the
/// same registry slot, even when their values are equal.
///
/// ```compile_fail
/// use multiton_registry::Instance;
///
/// // Instances can only be created by a registry.
/// let direct = Instance::new("db", 5);
/// ```
///
/// ```compile_fail
/// use multiton_registry::InstanceRegistry;
///
/// let pools = InstanceRegistry::new(|host: &String, ()| host.len());
/// let handle = pools.get("db".to_string()).unwrap();
/// // Instances cannot be duplicated outside the registry.
/// let copy: multiton_registry::Instance<String, usize> = (*handle).clone();
/// ```
pub struct Instance<K, V> {
    id: K,
    value: V,
}

impl<K, V> Instance<K, V> {
    /// Builds the record in two phases: the key is bound first and lent to
    /// `init`, which produces the value.
    pub(crate) fn build<A, E>(
        id: K,
        args: A,
        init: impl FnOnce(&K, A) -> Result<V, E>,
    ) -> Result<Self, E> {
        let value = init(&id, args)?;
        Ok(Self { id, value })
    }

    /// The key this instance is registered under.
    pub fn id(&self) -> &K {
        &self.id
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Whether two handles refer to the same cached instance.
    pub fn same(a: &Arc<Self>, b: &Arc<Self>) -> bool {
        Arc::ptr_eq(a, b)
    }
}

impl<K, V> Deref for Instance<K, V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

impl<K, V> PartialEq for Instance<K, V> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
    }
}

impl<K, V> Eq for Instance<K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Instance<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("value", &self.value)
            .finish()
    }
}
