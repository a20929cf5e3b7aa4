use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::Duration;

use eventbus_core::{AsyncEventBus, Configuration, ListenerBuilder};

struct Seq(u32);

#[test]
fn async_dispatch_preserves_per_subscriber_order() {
    let bus = AsyncEventBus::new();
    let (tx, rx) = channel::<u32>();

    let listener = ListenerBuilder::new()
        .on::<Seq>()
        .primary(move |event: &Seq| {
            if event.0 == 0 {
                std::thread::sleep(Duration::from_millis(30));
            }
            tx.send(event.0).unwrap();
            Ok(())
        })
        .register()
        .unwrap()
        .build();
    bus.register(listener).unwrap();

    for i in 0..5 {
        bus.post(Seq(i));
    }
    bus.shutdown(Duration::from_secs(2));

    let received: Vec<u32> = rx.try_iter().collect();
    assert_eq!(received, vec![0, 1, 2, 3, 4]);
}

#[test]
fn concurrent_opt_in_lets_one_subscriber_run_in_parallel() {
    let bus = AsyncEventBus::with_config(Configuration {
        async_workers: 4,
        ..Configuration::default()
    });
    let active = Arc::new(AtomicUsize::new(0));
    let max_active = Arc::new(AtomicUsize::new(0));
    let active_clone = active.clone();
    let max_active_clone = max_active.clone();

    let listener = ListenerBuilder::new()
        .on::<Seq>()
        .primary(move |_| {
            let current = active_clone.fetch_add(1, Ordering::SeqCst) + 1;
            max_active_clone.fetch_max(current, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(60));
            active_clone.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .concurrent(true)
        .register()
        .unwrap()
        .build();
    bus.register(listener).unwrap();

    for i in 0..4 {
        bus.post(Seq(i));
    }
    bus.shutdown(Duration::from_secs(2));

    assert!(max_active.load(Ordering::SeqCst) > 1);
}

#[test]
fn async_bus_is_cheaply_cloneable_and_shares_state() {
    let bus = AsyncEventBus::new();
    let received = Arc::new(AtomicUsize::new(0));
    let received_clone = received.clone();

    let listener = ListenerBuilder::new()
        .on::<Seq>()
        .primary(move |_| {
            received_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .register()
        .unwrap()
        .build();
    bus.register(listener).unwrap();

    let bus_clone = bus.clone();
    bus_clone.post(Seq(0));
    bus.shutdown(Duration::from_secs(1));

    assert_eq!(received.load(Ordering::SeqCst), 1);
}
