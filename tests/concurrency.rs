//! Integration tests for concurrent access.
//!
//! Every test builds its own registry, so they can run in parallel.

use multiton_registry::{InstanceRegistry, RegistryError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn counting_registry(delay: Duration) -> (Arc<InstanceRegistry<u32, u32>>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_clone = calls.clone();
    let registry = InstanceRegistry::new(move |key: &u32, ()| {
        calls_clone.fetch_add(1, Ordering::SeqCst);
        thread::sleep(delay);
        *key * 2
    });
    (Arc::new(registry), calls)
}

#[test]
fn test_concurrent_single_creation() {
    const THREADS: usize = 16;

    let (registry, calls) = counting_registry(Duration::from_millis(20));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                registry.get(7).unwrap()
            })
        })
        .collect();

    let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for instance in &instances {
        assert!(Arc::ptr_eq(instance, &instances[0]));
        assert_eq!(*instance.value(), 14);
    }
}

#[test]
fn test_many_keys_from_many_threads() {
    const THREADS: u32 = 8;
    const KEYS: u32 = 50;

    let (registry, calls) = counting_registry(Duration::ZERO);
    let barrier = Arc::new(Barrier::new(THREADS as usize));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                // Each thread walks the keys from a different starting point
                (0..KEYS)
                    .map(|i| registry.get((i + t * 7) % KEYS).unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    for handle in handles {
        for instance in handle.join().unwrap() {
            assert!(Arc::ptr_eq(&instance, &registry.get(*instance.id()).unwrap()));
        }
    }

    assert_eq!(calls.load(Ordering::SeqCst), KEYS as usize);
    assert_eq!(registry.len(), KEYS as usize);
}

#[test]
fn test_create_destroy_race_is_linearizable() {
    const ROUNDS: usize = 200;

    let (registry, calls) = counting_registry(Duration::ZERO);
    let barrier = Arc::new(Barrier::new(2));

    let creator = {
        let registry = registry.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            (0..ROUNDS)
                .map(|_| registry.get(1).unwrap())
                .collect::<Vec<_>>()
        })
    };
    let destroyer = {
        let registry = registry.clone();
        let barrier = barrier.clone();
        thread::spawn(move || {
            barrier.wait();
            (0..ROUNDS)
                .filter_map(|_| registry.destroy(&1).unwrap())
                .collect::<Vec<_>>()
        })
    };

    let created = creator.join().unwrap();
    let destroyed = destroyer.join().unwrap();

    // Every destroy removed a distinct instance, and every instance came from
    // exactly one factory call.
    for (i, a) in destroyed.iter().enumerate() {
        for b in &destroyed[i + 1..] {
            assert!(!Arc::ptr_eq(a, b));
        }
    }
    let live = usize::from(registry.contains(&1));
    assert_eq!(calls.load(Ordering::SeqCst), destroyed.len() + live);
    assert!(created.iter().all(|i| *i.id() == 1 && *i.value() == 2));
}

#[test]
fn test_slow_factory_does_not_block_cached_reads() {
    let entered = Arc::new(Barrier::new(2));
    let gate = Arc::new(Barrier::new(2));
    let entered_clone = entered.clone();
    let gate_clone = gate.clone();
    let registry = Arc::new(InstanceRegistry::new(move |key: &&str, ()| {
        if *key == "slow" {
            // The registry-wide lock is held from here until the gate opens
            entered_clone.wait();
            gate_clone.wait();
        }
        key.len()
    }));

    registry.get("fast").unwrap();

    let slow = {
        let registry = registry.clone();
        thread::spawn(move || registry.get("slow").unwrap())
    };

    // The slow factory now holds the registry-wide lock; cached reads still succeed
    entered.wait();
    let fast = registry.get("fast").unwrap();
    assert_eq!(**fast, 4);
    assert!(registry.contains(&"fast"));
    gate.wait();

    assert_eq!(**slow.join().unwrap(), 4);
}

#[test]
fn test_failed_creation_can_be_retried_by_another_thread() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();
    let registry = Arc::new(InstanceRegistry::try_new(move |_: &u8, ()| {
        match attempts_clone.fetch_add(1, Ordering::SeqCst) {
            0 => Err(RegistryError::factory("first attempt fails")),
            n => Ok(n),
        }
    }));

    assert!(registry.get(1).is_err());

    let handle = {
        let registry = registry.clone();
        thread::spawn(move || registry.get(1).map(|i| **i))
    };
    assert_eq!(handle.join().unwrap().unwrap(), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}
