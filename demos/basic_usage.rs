//! Basic usage example for multiton-registry.
//!
//! Demonstrates:
//! - Declaring a keyed singleton type with `define_multiton!`
//! - Creating instances on demand with `create()` and `get()`
//! - Removing instances with `destroy()`
//! - Enumerating live instances with `for_each()`
//!
//! Run with: `cargo run --example basic_usage`

use multiton_registry::{define_multiton, Multiton, RegistryError};
use std::sync::Arc;

#[derive(Debug)]
struct Pool {
    host: String,
    size: u32,
}

define_multiton!(Pool, key = String, args = u32, try_factory = |host, size| {
    if size == 0 {
        return Err(RegistryError::invalid_arguments("pool size must be positive"));
    }
    println!("   (factory) opening pool for {host} with {size} connections");
    Ok(Pool {
        host: host.clone(),
        size,
    })
});

fn main() {
    println!("=== multiton-registry: Basic Usage ===\n");

    // -------------------------------------------------------------------------
    // 1. Create instances on demand
    // -------------------------------------------------------------------------
    println!("1. Creating pools...");

    let primary = Pool::create("db-primary".to_string(), 10).unwrap();
    let replica = Pool::create("db-replica".to_string(), 4).unwrap();

    println!("   {} -> {} connections", primary.host, primary.size);
    println!("   {} -> {} connections", replica.host, replica.size);

    // -------------------------------------------------------------------------
    // 2. Later requests return the cached instance
    // -------------------------------------------------------------------------
    println!("\n2. Requesting db-primary again with different arguments...");

    let again = Pool::create("db-primary".to_string(), 50).unwrap();
    println!("   same instance: {}", Arc::ptr_eq(&primary, &again));
    println!("   size is still: {}", again.size);

    // -------------------------------------------------------------------------
    // 3. Factory failures are reported and nothing is cached
    // -------------------------------------------------------------------------
    println!("\n3. Creating a pool with invalid arguments...");

    match Pool::create("db-broken".to_string(), 0) {
        Ok(pool) => println!("   Unexpected pool: {:?}", pool),
        Err(e) => println!("   Error (expected): {}", e),
    }
    println!("   contains(db-broken) = {}", Pool::contains(&"db-broken".to_string()));

    // -------------------------------------------------------------------------
    // 4. Enumerate live instances
    // -------------------------------------------------------------------------
    println!("\n4. Enumerating pools in creation order...");

    Pool::for_each(|host, pool| println!("   {host}: {} connections", pool.size)).unwrap();

    // -------------------------------------------------------------------------
    // 5. Destroy and recreate
    // -------------------------------------------------------------------------
    println!("\n5. Destroying db-replica and creating it again...");

    let removed = Pool::destroy(&"db-replica".to_string()).unwrap();
    println!("   removed: {}", removed.is_some());

    let recreated = Pool::create("db-replica".to_string(), 8).unwrap();
    println!("   new instance: {}", !Arc::ptr_eq(&replica, &recreated));
    println!("   new size: {}", recreated.size);

    // -------------------------------------------------------------------------
    // Summary
    // -------------------------------------------------------------------------
    println!("\n=== Example Complete ===");
    println!("The registry now holds {} pools.", Pool::len());
}
