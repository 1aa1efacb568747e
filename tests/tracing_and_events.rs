//! Integration tests for tracing and event monitoring.
//!
//! This test demonstrates how to use the tracing callback system to monitor
//! registry operations, which is useful for debugging and logging.

use multiton_registry::{InstanceRegistry, RegistryError, RegistryEvent};
use std::sync::{Arc, Mutex};

fn collect(registry: &InstanceRegistry<u32, u32>) -> Arc<Mutex<Vec<String>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();
    registry.set_trace_callback(move |event| {
        events_clone.lock().unwrap().push(format!("{}", event));
    });
    events
}

fn doubling(name: &'static str) -> InstanceRegistry<u32, u32> {
    InstanceRegistry::new(|key: &u32, ()| key * 2).with_name(name)
}

#[test]
fn test_basic_tracing() {
    let traced = doubling("traced1");
    let events = collect(&traced);

    traced.get(1).unwrap();
    traced.contains(&1);
    traced.destroy(&1).unwrap();

    let captured = events.lock().unwrap();
    assert_eq!(captured.len(), 3);
    assert!(captured[0].contains("create"));
    assert!(captured[1].contains("contains"));
    assert!(captured[2].contains("destroy"));
}

#[test]
fn test_trace_create_hit_and_miss() {
    let traced = doubling("traced2");
    let events = collect(&traced);

    traced.get(7).unwrap();
    traced.get(7).unwrap();

    let captured = events.lock().unwrap();
    assert_eq!(
        *captured,
        vec![
            "create { registry: traced2, key: 7, created: true }",
            "create { registry: traced2, key: 7, created: false }",
        ]
    );
}

#[test]
fn test_failed_create_emits_no_event() {
    let traced = InstanceRegistry::try_new(|_: &u32, ()| -> Result<u32, RegistryError> {
        Err(RegistryError::factory("offline"))
    });
    let events = collect(&traced);

    assert!(traced.get(1).is_err());
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn test_trace_snapshot_event() {
    let traced = doubling("traced3");
    for key in 0..4 {
        traced.get(key).unwrap();
    }
    let events = collect(&traced);

    traced.to_vec().unwrap();
    traced.for_each(|_, _| {}).unwrap();

    let captured = events.lock().unwrap();
    assert_eq!(
        *captured,
        vec![
            "snapshot { registry: traced3, len: 4 }",
            "snapshot { registry: traced3, len: 4 }",
        ]
    );
}

#[test]
fn test_clear_trace_callback() {
    let traced = doubling("traced4");
    let events = collect(&traced);

    traced.get(1).unwrap();
    traced.clear_trace_callback();
    traced.get(2).unwrap();
    traced.destroy(&2).unwrap();

    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn test_trace_callback_with_custom_logic() {
    let traced = doubling("traced5");

    // Example: count created instances and cache hits separately
    let created = Arc::new(Mutex::new(0));
    let hits = Arc::new(Mutex::new(0));
    let created_clone = created.clone();
    let hits_clone = hits.clone();

    traced.set_trace_callback(move |event| {
        if let RegistryEvent::Create { created, .. } = event {
            if *created {
                *created_clone.lock().unwrap() += 1;
            } else {
                *hits_clone.lock().unwrap() += 1;
            }
        }
    });

    traced.get(1).unwrap();
    traced.get(2).unwrap();
    traced.get(1).unwrap();
    traced.get(1).unwrap();
    traced.contains(&2);

    assert_eq!(*created.lock().unwrap(), 2);
    assert_eq!(*hits.lock().unwrap(), 2);
}

#[test]
fn test_trace_callback_replacement() {
    let traced = doubling("traced6");
    let first = collect(&traced);
    traced.get(1).unwrap();

    let second = collect(&traced);
    traced.get(2).unwrap();

    assert_eq!(first.lock().unwrap().len(), 1);
    assert_eq!(second.lock().unwrap().len(), 1);
}

#[test]
fn test_callback_can_use_registries() {
    let main_registry = Arc::new(doubling("main"));
    let log_registry = Arc::new(InstanceRegistry::new(|line: &String, ()| line.len()));

    // Callbacks run outside the registry lock, so they may call back in
    let main_clone = Arc::downgrade(&main_registry);
    let log_clone = log_registry.clone();
    main_registry.set_trace_callback(move |event| {
        log_clone.get(format!("{}", event)).unwrap();
        if matches!(event, RegistryEvent::Create { .. }) {
            if let Some(main) = main_clone.upgrade() {
                main.contains(&100);
            }
        }
    });

    main_registry.get(1).unwrap();

    assert_eq!(
        log_registry.keys().unwrap(),
        vec![
            "create { registry: main, key: 1, created: true }".to_string(),
            "contains { registry: main, key: 100, found: false }".to_string(),
        ]
    );
}
