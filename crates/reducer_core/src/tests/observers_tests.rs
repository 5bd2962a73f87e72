use super::*;
use std::sync::{Arc, Mutex};

use shared::{domain::Message, protocol::demo_script};

use crate::{CounterReducer, ReducerExt};

#[test]
fn observers_are_notified_in_subscription_order() {
    let registry = ObserverRegistry::<i64>::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let first_seen = Arc::clone(&seen);
    let first = registry.subscribe(move |value| first_seen.lock().expect("lock").push(("first", *value)));
    let second_seen = Arc::clone(&seen);
    let second =
        registry.subscribe(move |value| second_seen.lock().expect("lock").push(("second", *value)));

    assert_eq!(registry.notify(&7), 2);
    assert_eq!(
        *seen.lock().expect("lock"),
        vec![("first", 7), ("second", 7)]
    );
    assert!(first.id() < second.id());
}

#[test]
fn cancelled_and_dropped_subscriptions_stop_receiving() {
    let registry = ObserverRegistry::<i64>::new();
    let hits = Arc::new(Mutex::new(0));

    let counter = Arc::clone(&hits);
    let kept = registry.subscribe(move |_| *counter.lock().expect("lock") += 1);
    let cancelled = registry.subscribe(|_| panic!("cancelled observer must not run"));
    cancelled.cancel();
    {
        let _scoped = registry.subscribe(|_| panic!("dropped observer must not run"));
    }

    assert_eq!(registry.len(), 1);
    assert_eq!(registry.notify(&1), 1);
    assert_eq!(*hits.lock().expect("lock"), 1);
    drop(kept);
    assert!(registry.is_empty());
}

#[test]
fn detached_subscription_outlives_its_handle() {
    let registry = ObserverRegistry::<i64>::new();
    registry.subscribe(|_| {}).detach();
    assert_eq!(registry.len(), 1);
}

#[test]
fn subscription_does_not_keep_registry_alive() {
    let registry = ObserverRegistry::<i64>::new();
    let subscription = registry.subscribe(|_| {});
    drop(registry);
    // Releasing after the registry is gone is a no-op.
    subscription.cancel();
}

#[test]
fn observed_reducer_reports_every_output() {
    let mut observed = ObservedReducer::new(CounterReducer::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let _subscription = observed
        .observers()
        .subscribe(move |value| sink.lock().expect("lock").push(*value));

    let outputs = observed.replay(demo_script());
    assert_eq!(*seen.lock().expect("lock"), outputs);

    assert_eq!(observed.handle(Message::Set(0)), None);
    assert_eq!(seen.lock().expect("lock").len(), 5);
}

// No lifetime bound on `T`: inspecting a registry works for any payload type.
fn describe<T>(registry: &ObserverRegistry<T>) -> String {
    format!("{registry:?} empty={}", registry.is_empty())
}

#[test]
fn debug_output_reports_live_observer_count() {
    let registry = ObserverRegistry::<i64>::new();
    assert_eq!(describe(&registry), "ObserverRegistry { observers: 0 } empty=true");

    let first = registry.subscribe(|_| {});
    let _second = registry.subscribe(|_| {});
    assert_eq!(describe(&registry), "ObserverRegistry { observers: 2 } empty=false");

    first.cancel();
    assert_eq!(format!("{registry:?}"), "ObserverRegistry { observers: 1 }");
}
