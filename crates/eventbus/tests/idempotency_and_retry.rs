use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use eventbus_core::{EventBus, FailureClassification, HandlerError, ListenerBuilder, RetryPolicy};

struct Job(u32);

#[test]
fn idempotent_check_skips_primary_handler() {
    let bus = EventBus::new();
    let primary_calls = Arc::new(AtomicUsize::new(0));
    let primary_calls_clone = primary_calls.clone();

    let listener = ListenerBuilder::new()
        .on::<Job>()
        .idempotent(|event| Ok(event.0 == 1))
        .primary(move |_| {
            primary_calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .register()
        .unwrap()
        .build();

    bus.register(listener).unwrap();
    bus.post(Job(1));
    bus.post(Job(2));

    assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn primary_handler_retries_before_giving_up() {
    let bus = EventBus::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_clone = attempts.clone();
    let failed = Arc::new(AtomicUsize::new(0));
    let failed_clone = failed.clone();

    let listener = ListenerBuilder::new()
        .on::<Job>()
        .primary(move |_| {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
            Err(HandlerError::new("transient failure"))
        })
        .retry(RetryPolicy::new(2, Duration::from_millis(1)))
        .on_failure_with_context(move |_, ctx| {
            failed_clone.fetch_add(1, Ordering::SeqCst);
            assert_eq!(ctx.classification(), FailureClassification::RetryExhausted);
            assert_eq!(ctx.total_retries(), 2);
            Ok(())
        })
        .register()
        .unwrap()
        .build();

    bus.register(listener).unwrap();
    bus.post(Job(1));

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(failed.load(Ordering::SeqCst), 1);
}

#[test]
fn primary_handler_without_retry_fails_straight_to_failure_handler() {
    let bus = EventBus::new();
    let failed = Arc::new(AtomicUsize::new(0));
    let failed_clone = failed.clone();

    let listener = ListenerBuilder::new()
        .on::<Job>()
        .primary(|_| Err(HandlerError::new("boom")))
        .on_failure_with_context(move |_, ctx| {
            failed_clone.fetch_add(1, Ordering::SeqCst);
            assert_eq!(ctx.classification(), FailureClassification::ProcessingException);
            assert_eq!(ctx.total_retries(), 0);
            Ok(())
        })
        .register()
        .unwrap()
        .build();

    bus.register(listener).unwrap();
    bus.post(Job(1));

    assert_eq!(failed.load(Ordering::SeqCst), 1);
}

#[test]
fn idempotent_error_routes_to_failure_handler_as_system_exception() {
    let bus = EventBus::new();
    let failed = Arc::new(AtomicUsize::new(0));
    let failed_clone = failed.clone();

    let listener = ListenerBuilder::new()
        .on::<Job>()
        .idempotent(|_| Err(HandlerError::new("idempotency store unavailable")))
        .primary(|_| Ok(()))
        .on_failure_with_context(move |_, ctx| {
            failed_clone.fetch_add(1, Ordering::SeqCst);
            assert_eq!(ctx.classification(), FailureClassification::SystemException);
            Ok(())
        })
        .register()
        .unwrap()
        .build();

    bus.register(listener).unwrap();
    bus.post(Job(1));

    assert_eq!(failed.load(Ordering::SeqCst), 1);
}
