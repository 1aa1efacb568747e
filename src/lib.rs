//! # Multiton Registry
//!
//! A thread-safe keyed singleton registry: at most one instance exists per
//! type and key, created lazily on first request and cached until destroyed.
//!
//! Where a singleton gives you one instance per type, a multiton gives you one
//! instance per (type, key) pair: a connection pool per host, a cache per tenant.
//!
//! ## Quick Start
//!
//! ```rust
//! use multiton_registry::{define_multiton, Multiton};
//! use std::sync::Arc;
//!
//! struct TenantCache {
//!     tenant: u64,
//! }
//!
//! define_multiton!(TenantCache, key = u64, factory = |id, ()| TenantCache { tenant: *id });
//!
//! let a = TenantCache::get(42).unwrap();
//! let b = TenantCache::get(42).unwrap();
//! assert!(Arc::ptr_eq(&a, &b));
//! assert_eq!(a.tenant, 42);
//!
//! TenantCache::destroy(&42).unwrap();
//! let c = TenantCache::get(42).unwrap();
//! assert!(!Arc::ptr_eq(&a, &c));
//! ```
//!
//! ## Features
//!
//! - **Thread-safe**: concurrent requests for a new key run the factory exactly once
//! - **Lazy**: nothing is built until a key is first requested
//! - **Snapshot iteration**: enumeration never holds the lock while visiting, so
//!   visitors may create or destroy instances
//! - **Identity preserving**: instances are never copied; everyone shares one `Arc`
//! - **Tracing support**: per-registry event callbacks plus `tracing` log records
//!
//! ## Main Types
//!
//! - [`InstanceRegistry`] - The keyed registry itself, usable on its own
//! - [`Multiton`] - Per-type access to a registry through associated functions
//! - [`define_multiton!`] - Implements `Multiton` for a type
//! - [`Instance`] - A cached instance together with its key
//! - [`RegistryError`] - Factory and re-entrancy failures
//! - [`RegistryEvent`] - Events passed to trace callbacks

mod instance;
mod macros;
mod multiton;
mod registry;
mod registry_error;
mod registry_event;

pub use instance::Instance;
pub use multiton::Multiton;
pub use registry::{InstanceRegistry, TraceCallback};
pub use registry_error::RegistryError;
pub use registry_event::RegistryEvent;
