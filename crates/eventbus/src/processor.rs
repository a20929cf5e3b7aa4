//! The three-phase processor: idempotency check, primary handler with
//! optional retry, and terminal failure handler, wrapped in the global
//! interceptor chain's hooks. One subscriber's invocation for one event
//! runs entirely inside [`process`]; callers (the sync and async
//! dispatchers) only decide *when* and on *which thread* to call it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, error, warn};

use crate::event::Event;
use crate::exception::{ExceptionContext, ExceptionPhase, SubscriberExceptionHandler};
use crate::failure::{FailureClassification, FailureContext};
use crate::handler::ErasedHandlerGroup;
use crate::interceptor::{InterceptorChain, InterceptorContext};
use crate::registry::Subscriber;

/// How long each cancellation check waits between polls while sleeping out
/// a retry interval. Short enough that shutdown's grace window still has
/// time to observe the thread exit.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs the full three-phase model for one subscriber against one event.
///
/// `cancelled` is checked between retry attempts and during the backoff
/// sleep so a bus shutdown can interrupt a subscriber that is mid-retry
/// instead of waiting out the full interval.
pub(crate) fn process(
    subscriber: &Subscriber,
    event: &Arc<dyn Event>,
    bus_identifier: &str,
    cancelled: &AtomicBool,
    interceptors: &InterceptorChain,
    exception_handler: &dyn SubscriberExceptionHandler,
) {
    let group = subscriber.group.as_ref();
    let event_type = group.event_type_name();
    let first_attempt_at = Utc::now();
    let start = Instant::now();

    let mut ctx = InterceptorContext::new(event.clone(), bus_identifier.to_string());
    interceptors.run_before(&mut ctx);

    if let Some(result) = group.call_idempotent(event.as_ref()) {
        match result {
            Ok(true) => {
                debug!(
                    "[{}] `{}` already handled, skipping primary handler",
                    bus_identifier, event_type
                );
                // Step 2 of the processing model finalizes and returns here
                // without reaching the after-hooks that wrap the
                // primary/failure outcome.
                ctx.set_skipped(true);
                ctx.finalize();
                return;
            }
            Ok(false) => {}
            Err(err) => {
                let failure_ctx = FailureContext::new(
                    event.clone(),
                    err,
                    0,
                    FailureClassification::SystemException,
                    first_attempt_at,
                    start.elapsed(),
                );
                invoke_failure(group, event, &failure_ctx, bus_identifier, exception_handler);
                ctx.finalize();
                interceptors.run_after_failure(&mut ctx);
                return;
            }
        }
    }

    let retry = group.retry_policy();
    let max_retries = retry.map(|policy| policy.retries).unwrap_or(0);
    let interval = retry.map(|policy| policy.interval).unwrap_or_default();
    let mut attempts = 0u32;

    loop {
        match group.call_primary(event.as_ref()) {
            Ok(()) => {
                ctx.finalize();
                interceptors.run_after_success(&mut ctx);
                return;
            }
            Err(err) => {
                attempts += 1;
                ctx.set_retry_count(attempts);
                if attempts > max_retries {
                    let classification = if max_retries > 0 {
                        FailureClassification::RetryExhausted
                    } else {
                        FailureClassification::ProcessingException
                    };
                    let failure_ctx = FailureContext::new(
                        event.clone(),
                        err,
                        attempts - 1,
                        classification,
                        first_attempt_at,
                        start.elapsed(),
                    );
                    invoke_failure(group, event, &failure_ctx, bus_identifier, exception_handler);
                    ctx.finalize();
                    interceptors.run_after_failure(&mut ctx);
                    return;
                }
                if !sleep_cancelable(interval, cancelled) {
                    let failure_ctx = FailureContext::new(
                        event.clone(),
                        err,
                        attempts,
                        FailureClassification::ProcessingException,
                        first_attempt_at,
                        start.elapsed(),
                    );
                    invoke_failure(group, event, &failure_ctx, bus_identifier, exception_handler);
                    ctx.finalize();
                    interceptors.run_after_failure(&mut ctx);
                    return;
                }
            }
        }
    }
}

/// Sleeps `duration` in short chunks, returning `false` as soon as
/// `cancelled` is observed so a retry backoff never outlives shutdown.
fn sleep_cancelable(duration: Duration, cancelled: &AtomicBool) -> bool {
    let mut remaining = duration;
    while remaining > Duration::ZERO {
        if cancelled.load(Ordering::SeqCst) {
            return false;
        }
        let step = remaining.min(CANCEL_POLL_INTERVAL);
        thread::sleep(step);
        remaining -= step;
    }
    !cancelled.load(Ordering::SeqCst)
}

fn invoke_failure(
    group: &dyn ErasedHandlerGroup,
    event: &Arc<dyn Event>,
    ctx: &FailureContext,
    bus_identifier: &str,
    exception_handler: &dyn SubscriberExceptionHandler,
) {
    let event_type = group.event_type_name();

    // Surface the exception that actually drove this event into the
    // failure phase, before we even invoke the failure handler itself.
    let original_phase = match ctx.classification() {
        FailureClassification::SystemException => ExceptionPhase::Idempotent,
        FailureClassification::ProcessingException | FailureClassification::RetryExhausted => {
            ExceptionPhase::Primary
        }
    };
    exception_handler.handle_exception(
        ctx.cause(),
        &ExceptionContext {
            event_type,
            phase: original_phase,
            bus_identifier: bus_identifier.to_string(),
        },
    );

    // The failure handler is the terminal backstop; a panic here must not
    // take the dispatch thread down with it.
    let outcome = catch_unwind(AssertUnwindSafe(|| group.call_failure(event.as_ref(), Some(ctx))));

    match outcome {
        Ok(Some(Ok(()))) => {}
        Ok(Some(Err(err))) => {
            exception_handler.handle_exception(
                &err,
                &ExceptionContext {
                    event_type,
                    phase: ExceptionPhase::Failure,
                    bus_identifier: bus_identifier.to_string(),
                },
            );
        }
        Ok(None) => {
            warn!(
                "[{}] no failure handler registered for `{}`; terminal failure: {}",
                bus_identifier,
                event_type,
                ctx.cause()
            );
        }
        Err(panic) => {
            error!(
                "[{}] failure handler for `{}` panicked: {}",
                bus_identifier,
                event_type,
                panic_message(&panic)
            );
        }
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}
