use std::sync::Arc;

use eventbus_core::{EventBus, Interceptor, InterceptorContext, ListenerBuilder};

struct Marker(&'static str);

struct RecordingInterceptor {
    name: &'static str,
    log: Arc<std::sync::Mutex<Vec<String>>>,
}

impl Interceptor for RecordingInterceptor {
    fn name(&self) -> &str {
        self.name
    }

    fn before_processing(&self, _ctx: &mut InterceptorContext) {
        self.log.lock().unwrap().push(format!("before:{}", self.name));
    }

    fn after_processing_success(&self, _ctx: &mut InterceptorContext) {
        self.log.lock().unwrap().push(format!("after:{}", self.name));
    }
}

#[test]
fn interceptors_run_before_ascending_and_after_descending() {
    let log = Arc::new(std::sync::Mutex::new(Vec::new()));

    let bus = EventBus::builder()
        .interceptor(RecordingInterceptor { name: "outer", log: log.clone() })
        .interceptor(RecordingInterceptor { name: "inner", log: log.clone() })
        .build();

    let listener = ListenerBuilder::new()
        .on::<Marker>()
        .primary(|_| Ok(()))
        .register()
        .unwrap()
        .build();
    bus.register(listener).unwrap();

    bus.post(Marker("x"));

    let entries = log.lock().unwrap().clone();
    assert_eq!(
        entries,
        vec!["before:outer", "before:inner", "after:inner", "after:outer"]
    );
}

struct FailureOnlyInterceptor {
    log: Arc<std::sync::Mutex<Vec<String>>>,
}

impl Interceptor for FailureOnlyInterceptor {
    fn after_processing_success(&self, _ctx: &mut InterceptorContext) {
        self.log.lock().unwrap().push("success".to_string());
    }

    fn after_processing_failure(&self, ctx: &mut InterceptorContext) {
        self.log
            .lock()
            .unwrap()
            .push(format!("failure:retries={}", ctx.retry_count()));
    }
}

#[test]
fn after_processing_failure_runs_once_retries_are_exhausted_and_success_never_fires() {
    use eventbus_core::RetryPolicy;
    use std::time::Duration;

    let log = Arc::new(std::sync::Mutex::new(Vec::new()));

    let bus = EventBus::builder()
        .interceptor(FailureOnlyInterceptor { log: log.clone() })
        .build();

    let listener = ListenerBuilder::new()
        .on::<Marker>()
        .primary(|_| Err(eventbus_core::HandlerError::new("boom")))
        .on_failure(|_| Ok(()))
        .retry(RetryPolicy::new(2, Duration::from_millis(1)))
        .register()
        .unwrap()
        .build();
    bus.register(listener).unwrap();

    bus.post(Marker("x"));

    let entries = log.lock().unwrap().clone();
    assert_eq!(entries, vec!["failure:retries=3"]);
}

struct PanickingInterceptor;

impl Interceptor for PanickingInterceptor {
    fn before_processing(&self, _ctx: &mut InterceptorContext) {
        panic!("interceptor exploded");
    }
}

#[test]
fn a_panicking_interceptor_does_not_stop_delivery() {
    let bus = EventBus::builder().interceptor(PanickingInterceptor).build();
    let delivered = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let delivered_clone = delivered.clone();

    let listener = ListenerBuilder::new()
        .on::<Marker>()
        .primary(move |_| {
            delivered_clone.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        })
        .register()
        .unwrap()
        .build();
    bus.register(listener).unwrap();

    bus.post(Marker("x"));

    assert!(delivered.load(std::sync::atomic::Ordering::SeqCst));
}
