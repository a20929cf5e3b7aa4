use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use eventbus_core::{EventBus, ListenerBuilder};

struct Ping(u32);

#[test]
fn primary_handler_receives_posted_event() {
    let bus = EventBus::new();
    let received = Arc::new(AtomicUsize::new(0));
    let received_clone = received.clone();

    let listener = ListenerBuilder::new()
        .on::<Ping>()
        .primary(move |event| {
            received_clone.fetch_add(event.0 as usize, Ordering::SeqCst);
            Ok(())
        })
        .register()
        .unwrap()
        .build();

    bus.register(listener).unwrap();
    bus.post(Ping(7));

    assert_eq!(received.load(Ordering::SeqCst), 7);
}

#[test]
fn unregister_stops_further_delivery() {
    let bus = EventBus::new();
    let count = Arc::new(AtomicUsize::new(0));
    let count_clone = count.clone();

    let listener = ListenerBuilder::new()
        .on::<Ping>()
        .primary(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .register()
        .unwrap()
        .build();

    let id = bus.register(listener).unwrap();
    bus.post(Ping(1));
    bus.unregister(&id).unwrap();
    bus.post(Ping(1));

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn unregister_unknown_listener_errors() {
    let bus = EventBus::new();
    let listener = ListenerBuilder::new()
        .on::<Ping>()
        .primary(|_| Ok(()))
        .register()
        .unwrap()
        .build();
    let id = listener.id().clone();
    // Never registered.
    assert!(bus.unregister(&id).is_err());
}

#[test]
fn register_unregister_register_round_trip_restores_delivery() {
    let bus = EventBus::new();
    let count = Arc::new(AtomicUsize::new(0));

    let make_listener = || {
        let count = count.clone();
        ListenerBuilder::new()
            .on::<Ping>()
            .primary(move |_| {
                count.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .register()
            .unwrap()
            .build()
    };

    let id = bus.register(make_listener()).unwrap();
    bus.post(Ping(0));
    bus.unregister(&id).unwrap();
    bus.post(Ping(0));
    bus.register(make_listener()).unwrap();
    bus.post(Ping(0));

    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[test]
fn missing_primary_handler_is_rejected_at_build_time() {
    let result = ListenerBuilder::new().on::<Ping>().idempotent(|_| Ok(false)).register();
    assert!(result.is_err());
}

#[test]
fn duplicate_group_for_same_event_type_is_rejected() {
    let first = ListenerBuilder::new()
        .on::<Ping>()
        .primary(|_| Ok(()))
        .register()
        .unwrap();
    let result = first.on::<Ping>().primary(|_| Ok(())).register();
    assert!(result.is_err());
}
