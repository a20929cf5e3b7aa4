//! Minimal end-to-end demo: register a listener with a retrying primary
//! handler and a failure handler, then post a couple of events.

use std::time::Duration;

use eventbus_core::{EventBus, FailureContext, HandlerError, ListenerBuilder, RetryPolicy};

struct OrderPlaced {
    order_id: u64,
}

fn main() {
    env_logger::init();

    let bus = EventBus::builder().identifier("orders").build();

    let listener = ListenerBuilder::new()
        .on::<OrderPlaced>()
        .idempotent(|event| {
            // Pretend order 1 was already processed once before.
            Ok(event.order_id == 1)
        })
        .primary(|event| {
            if event.order_id == 2 {
                return Err(HandlerError::new("inventory service unreachable"));
            }
            println!("shipping order {}", event.order_id);
            Ok(())
        })
        .retry(RetryPolicy::new(2, Duration::from_millis(50)))
        .on_failure_with_context(|event: &OrderPlaced, ctx: &FailureContext| {
            eprintln!(
                "order {} could not be shipped after {} retries: {}",
                event.order_id,
                ctx.total_retries(),
                ctx.cause()
            );
            Ok(())
        })
        .register()
        .expect("handler group for OrderPlaced")
        .build();

    bus.register(listener).expect("register listener");

    bus.post(OrderPlaced { order_id: 1 }); // skipped by the idempotent check
    bus.post(OrderPlaced { order_id: 2 }); // fails, retries, then hits the failure handler
    bus.post(OrderPlaced { order_id: 3 }); // succeeds
}
