use std::sync::{Arc, Mutex};

use eventbus_core::{
    EventBus, ExceptionContext, ExceptionPhase, HandlerError, ListenerBuilder, RetryPolicy,
    SubscriberExceptionHandler,
};

struct Job;

struct RecordingExceptionHandler {
    calls: Arc<Mutex<Vec<(ExceptionPhase, String)>>>,
}

impl SubscriberExceptionHandler for RecordingExceptionHandler {
    fn handle_exception(&self, error: &HandlerError, context: &ExceptionContext) {
        self.calls
            .lock()
            .unwrap()
            .push((context.phase, error.message().to_string()));
    }
}

#[test]
fn original_primary_exception_is_surfaced_even_when_failure_handler_succeeds() {
    let calls = Arc::new(Mutex::new(Vec::new()));

    let bus = EventBus::builder()
        .exception_handler(RecordingExceptionHandler { calls: calls.clone() })
        .build();

    let listener = ListenerBuilder::new()
        .on::<Job>()
        .primary(|_| Err(HandlerError::new("primary blew up")))
        .on_failure(|_| Ok(()))
        .register()
        .unwrap()
        .build();
    bus.register(listener).unwrap();

    bus.post(Job);

    let recorded = calls.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec![(ExceptionPhase::Primary, "primary blew up".to_string())]
    );
}

#[test]
fn original_idempotent_exception_is_surfaced_as_idempotent_phase() {
    let calls = Arc::new(Mutex::new(Vec::new()));

    let bus = EventBus::builder()
        .exception_handler(RecordingExceptionHandler { calls: calls.clone() })
        .build();

    let listener = ListenerBuilder::new()
        .on::<Job>()
        .idempotent(|_| Err(HandlerError::new("store unreachable")))
        .primary(|_| Ok(()))
        .on_failure(|_| Ok(()))
        .register()
        .unwrap()
        .build();
    bus.register(listener).unwrap();

    bus.post(Job);

    let recorded = calls.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec![(ExceptionPhase::Idempotent, "store unreachable".to_string())]
    );
}

#[test]
fn failure_handler_error_is_also_surfaced_alongside_the_original_exception() {
    let calls = Arc::new(Mutex::new(Vec::new()));

    let bus = EventBus::builder()
        .exception_handler(RecordingExceptionHandler { calls: calls.clone() })
        .build();

    let listener = ListenerBuilder::new()
        .on::<Job>()
        .primary(|_| Err(HandlerError::new("primary blew up")))
        .retry(RetryPolicy::new(0, std::time::Duration::from_millis(1)))
        .on_failure(|_| Err(HandlerError::new("failure handler blew up too")))
        .register()
        .unwrap()
        .build();
    bus.register(listener).unwrap();

    bus.post(Job);

    let recorded = calls.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec![
            (ExceptionPhase::Primary, "primary blew up".to_string()),
            (ExceptionPhase::Failure, "failure handler blew up too".to_string()),
        ]
    );
}
