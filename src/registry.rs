//! A thread-safe keyed registry holding one lazily created instance per key.
//!
//! The registry owns a factory and calls it the first time a key is requested.
//! Every later request for that key returns the same `Arc<Instance<K, V>>`
//! until the key is destroyed.
//!
//! # Examples
//!
//! ```
//! use multiton_registry::InstanceRegistry;
//!
//! let pools = InstanceRegistry::new(|host: &String, size: u32| format!("{host} x{size}"));
//!
//! let a = pools.create("db".to_string(), 4).unwrap();
//! let b = pools.create("db".to_string(), 16).unwrap();
//!
//! // first call wins: the factory ran once
//! assert!(std::sync::Arc::ptr_eq(&a, &b));
//! assert_eq!(b.value(), "db x4");
//! ```

use std::fmt::{self, Debug};
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread::{self, ThreadId};

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::{Instance, RegistryError, RegistryEvent};

/// Type alias for the user-supplied tracing callback.
///
/// The callback receives a reference to a `RegistryEvent` every time the registry is
/// interacted with. It must be thread-safe because registries are shared between threads.
pub type TraceCallback = dyn Fn(&RegistryEvent) + Send + Sync + 'static;

type Factory<K, V, A> = dyn Fn(&K, A) -> Result<V, RegistryError> + Send + Sync;

/// Registry of instances keyed by `K`, built on demand by a factory taking
/// constructor arguments `A`.
///
/// All mutations and snapshot copies are serialized by one registry-wide lock.
/// Lookups of keys that already exist never wait for that lock, so a slow
/// factory only blocks callers that need to create, destroy or enumerate.
///
/// # Re-entrancy
///
/// A factory runs while the registry-wide lock is held. It may look up keys
/// that already exist and call [`contains`](Self::contains), but it cannot
/// create new keys, destroy keys or enumerate the same registry. Such calls
/// are detected and return [`RegistryError::Reentrant`] instead of deadlocking.
pub struct InstanceRegistry<K, V, A = ()> {
    name: &'static str,
    entries: RwLock<IndexMap<K, Arc<Instance<K, V>>>>,
    lock: Mutex<()>,
    holder: Mutex<Option<ThreadId>>,
    factory: Box<Factory<K, V, A>>,
    trace: Mutex<Option<Arc<TraceCallback>>>,
    _args: PhantomData<fn(A)>,
}

/// Holds the registry-wide lock and records the owning thread.
struct LockGuard<'a> {
    _lock: MutexGuard<'a, ()>,
    holder: &'a Mutex<Option<ThreadId>>,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<K, V, A> InstanceRegistry<K, V, A>
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: 'static,
    A: 'static,
{
    /// Creates a registry around an infallible factory.
    ///
    /// The factory receives the key being created (already bound to the new
    /// instance) and the constructor arguments passed to [`create`](Self::create).
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&K, A) -> V + Send + Sync + 'static,
    {
        Self::try_new(move |key: &K, args: A| Ok(factory(key, args)))
    }

    /// Creates a registry around a factory that may fail.
    ///
    /// A failed factory call stores nothing; the key stays absent and the error
    /// is returned to the caller of `create`.
    ///
    /// # Examples
    ///
    /// ```
    /// use multiton_registry::{InstanceRegistry, RegistryError};
    ///
    /// let ports = InstanceRegistry::try_new(|_name: &&str, port: i64| {
    ///     u16::try_from(port).map_err(|_| RegistryError::invalid_arguments("port out of range"))
    /// });
    ///
    /// assert!(matches!(ports.create("api", 70_000), Err(RegistryError::InvalidArguments(_))));
    /// assert!(!ports.contains(&"api"));
    /// assert_eq!(**ports.create("api", 8080).unwrap(), 8080);
    /// ```
    pub fn try_new<F>(factory: F) -> Self
    where
        F: Fn(&K, A) -> Result<V, RegistryError> + Send + Sync + 'static,
    {
        Self {
            name: std::any::type_name::<V>(),
            entries: RwLock::new(IndexMap::new()),
            lock: Mutex::new(()),
            holder: Mutex::new(None),
            factory: Box::new(factory),
            trace: Mutex::new(None),
            _args: PhantomData,
        }
    }

    /// Labels the registry in trace events and log records.
    ///
    /// Defaults to the type name of `V`.
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Pre-sizes the entry map.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.entries
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .reserve(capacity);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    // -------------------------------------------------------------------------------------------------
    // Tracing
    // -------------------------------------------------------------------------------------------------

    /// Set a tracing callback for registry operations.
    ///
    /// The callback is invoked after each operation completes, outside the
    /// registry-wide lock, except for lookups made from inside a factory.
    /// Other registries can always be used from the callback.
    pub fn set_trace_callback(&self, callback: impl Fn(&RegistryEvent) + Send + Sync + 'static) {
        let mut guard = self.trace.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(Arc::new(callback));
    }

    /// Clear the tracing callback.
    ///
    /// Registered instances are not affected.
    pub fn clear_trace_callback(&self) {
        let mut guard = self.trace.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }

    /// Invokes the current callback, if any, with a lazily built event.
    fn emit_with(&self, event: impl FnOnce() -> RegistryEvent) {
        let callback = self
            .trace
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(&event());
        }
    }

    // -------------------------------------------------------------------------------------------------
    // Registry
    // -------------------------------------------------------------------------------------------------

    /// Returns the instance for `key`, creating it with `args` if it does not exist.
    ///
    /// Only the first successful call for a key runs the factory. Later calls
    /// return the cached instance and drop their `args` unused, even when
    /// they differ from the ones the instance was built with.
    ///
    /// # Errors
    ///
    /// - Whatever the factory returns; nothing is stored in that case
    /// - [`RegistryError::Reentrant`] when called from this registry's own
    ///   factory for a key that does not exist yet
    pub fn create(&self, key: K, args: A) -> Result<Arc<Instance<K, V>>, RegistryError> {
        if let Some(found) = self.lookup(&key) {
            trace!(registry = self.name, key = ?key, "instance cache hit");
            self.emit_created(&key, false);
            return Ok(found);
        }

        let guard = self.acquire()?;

        // Another thread may have created it while we waited for the lock.
        if let Some(found) = self.lookup(&key) {
            drop(guard);
            trace!(registry = self.name, key = ?key, "instance created concurrently");
            self.emit_created(&key, false);
            return Ok(found);
        }

        let instance = match Instance::build(key.clone(), args, |id, args| (self.factory)(id, args)) {
            Ok(instance) => Arc::new(instance),
            Err(err) => {
                drop(guard);
                warn!(registry = self.name, key = ?key, error = %err, "instance factory failed");
                return Err(err);
            }
        };

        self.write_entries().insert(key.clone(), Arc::clone(&instance));
        drop(guard);

        debug!(registry = self.name, key = ?key, "created instance");
        self.emit_created(&key, true);
        Ok(instance)
    }

    /// Removes the instance for `key` and returns it, or `None` if the key is absent.
    ///
    /// Handles already given out stay valid; the next `create` for the key runs
    /// the factory again and produces a new instance.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Reentrant`] when called from this registry's own factory.
    pub fn destroy(&self, key: &K) -> Result<Option<Arc<Instance<K, V>>>, RegistryError> {
        let guard = self.acquire()?;
        let removed = self.write_entries().shift_remove(key);
        drop(guard);

        if removed.is_some() {
            debug!(registry = self.name, key = ?key, "destroyed instance");
        }
        self.emit_with(|| RegistryEvent::Destroy {
            registry: self.name,
            key: format!("{key:?}"),
            found: removed.is_some(),
        });
        Ok(removed)
    }

    /// Check if an instance exists for `key`.
    ///
    /// Does not take the registry-wide lock and never runs the factory.
    pub fn contains(&self, key: &K) -> bool {
        let found = self.read_entries().contains_key(key);
        self.emit_with(|| RegistryEvent::Contains {
            registry: self.name,
            key: format!("{key:?}"),
            found,
        });
        found
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visits every instance in creation order.
    ///
    /// The visitor runs over a snapshot taken when the call starts, with no
    /// lock held. Instances created or destroyed by the visitor (or by other
    /// threads) do not change the ongoing iteration.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Reentrant`] when called from this registry's own factory.
    pub fn for_each(
        &self,
        mut visitor: impl FnMut(&K, &Arc<Instance<K, V>>),
    ) -> Result<(), RegistryError> {
        for instance in self.snapshot()? {
            visitor(instance.id(), &instance);
        }
        Ok(())
    }

    /// Like [`for_each`](Self::for_each), but stops at the first visitor error and returns it.
    ///
    /// The error type must accept a [`RegistryError`], which is returned when
    /// the snapshot cannot be taken.
    ///
    /// # Examples
    ///
    /// ```
    /// use multiton_registry::{InstanceRegistry, RegistryError};
    ///
    /// let tenants = InstanceRegistry::new(|id: &u32, ()| *id * 10);
    /// for id in 1..=3 {
    ///     tenants.get(id).unwrap();
    /// }
    ///
    /// let mut seen = Vec::new();
    /// let result = tenants.try_for_each(|id, _| {
    ///     if *id == 2 {
    ///         return Err(RegistryError::factory("tenant 2 is offline"));
    ///     }
    ///     seen.push(*id);
    ///     Ok(())
    /// });
    ///
    /// assert_eq!(result.unwrap_err().to_string(), "instance factory failed: tenant 2 is offline");
    /// assert_eq!(seen, vec![1]);
    /// ```
    ///
    /// # Errors
    ///
    /// The first visitor error, or [`RegistryError::Reentrant`] converted into
    /// `E` when called from this registry's own factory.
    pub fn try_for_each<E>(
        &self,
        mut visitor: impl FnMut(&K, &Arc<Instance<K, V>>) -> Result<(), E>,
    ) -> Result<(), E>
    where
        E: From<RegistryError>,
    {
        for instance in self.snapshot()? {
            visitor(instance.id(), &instance)?;
        }
        Ok(())
    }

    /// Returns the live instances in creation order.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Reentrant`] when called from this registry's own factory.
    pub fn to_vec(&self) -> Result<Vec<Arc<Instance<K, V>>>, RegistryError> {
        self.snapshot()
    }

    /// Returns the live keys in creation order.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Reentrant`] when called from this registry's own factory.
    pub fn keys(&self) -> Result<Vec<K>, RegistryError> {
        let mut keys = Vec::new();
        self.for_each(|key, _| keys.push(key.clone()))?;
        Ok(keys)
    }

    /// Removes every instance.
    ///
    /// Handles already given out stay valid.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Reentrant`] when called from this registry's own factory.
    pub fn clear(&self) -> Result<(), RegistryError> {
        let guard = self.acquire()?;
        self.write_entries().clear();
        drop(guard);

        debug!(registry = self.name, "cleared registry");
        self.emit_with(|| RegistryEvent::Clear {
            registry: self.name,
        });
        Ok(())
    }

    // -------------------------------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------------------------------

    fn lookup(&self, key: &K) -> Option<Arc<Instance<K, V>>> {
        self.read_entries().get(key).cloned()
    }

    /// Copies the current instances under the registry-wide lock.
    fn snapshot(&self) -> Result<Vec<Arc<Instance<K, V>>>, RegistryError> {
        let guard = self.acquire()?;
        let snapshot: Vec<_> = self.read_entries().values().cloned().collect();
        drop(guard);

        trace!(registry = self.name, len = snapshot.len(), "took snapshot");
        self.emit_with(|| RegistryEvent::Snapshot {
            registry: self.name,
            len: snapshot.len(),
        });
        Ok(snapshot)
    }

    fn emit_created(&self, key: &K, created: bool) {
        self.emit_with(|| RegistryEvent::Create {
            registry: self.name,
            key: format!("{key:?}"),
            created,
        });
    }

    /// Takes the registry-wide lock, refusing a thread that already holds it.
    fn acquire(&self) -> Result<LockGuard<'_>, RegistryError> {
        let current = thread::current().id();
        if *self.holder.lock().unwrap_or_else(PoisonError::into_inner) == Some(current) {
            warn!(registry = self.name, "re-entrant registry call from factory");
            return Err(RegistryError::Reentrant {
                registry: self.name,
            });
        }

        // Poisoned only by a panicking factory, which never touches the map.
        let lock = self.lock.lock().unwrap_or_else(|poisoned| {
            warn!(registry = self.name, "recovered registry lock after factory panic");
            self.lock.clear_poison();
            poisoned.into_inner()
        });
        *self.holder.lock().unwrap_or_else(PoisonError::into_inner) = Some(current);

        Ok(LockGuard {
            _lock: lock,
            holder: &self.holder,
        })
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, IndexMap<K, Arc<Instance<K, V>>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, IndexMap<K, Arc<Instance<K, V>>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> InstanceRegistry<K, V, ()>
where
    K: Eq + Hash + Clone + Debug + 'static,
    V: 'static,
{
    /// Returns the instance for `key`, creating it without constructor arguments.
    ///
    /// Equivalent to `create(key, ())`. Only registries whose factory takes no
    /// arguments have this method, so extra arguments cannot be passed through:
    ///
    /// ```compile_fail
    /// use multiton_registry::InstanceRegistry;
    ///
    /// let sized = InstanceRegistry::new(|name: &&str, size: u32| size);
    /// sized.get("y"); // `get` does not exist when the factory needs arguments
    /// ```
    ///
    /// ```compile_fail
    /// use multiton_registry::InstanceRegistry;
    ///
    /// let plain = InstanceRegistry::new(|name: &&str, ()| name.len());
    /// plain.get("y", 1); // and it never forwards extra arguments
    /// ```
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create).
    pub fn get(&self, key: K) -> Result<Arc<Instance<K, V>>, RegistryError> {
        self.create(key, ())
    }
}

impl<K, V, A> Debug for InstanceRegistry<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("InstanceRegistry")
            .field("name", &self.name)
            .field("len", &len)
            .finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------------------------------------
// Tests
// -------------------------------------------------------------------------------------------------
