//! The global interceptor chain: wraps every subscriber's three-phase
//! processing of a posted event, not just the primary-handler call.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log::error;

use crate::interceptor::context::InterceptorContext;

/// Hooks a subscriber's processing is wrapped in: `before_processing` at
/// the very start (ahead of the idempotency check), then exactly one of
/// `after_processing_success` / `after_processing_failure` once the
/// primary or failure phase has finished.
///
/// None of these return a `Result`: per the processing model, interceptor
/// failures are swallowed and logged rather than aborting processing, so a
/// misbehaving interceptor can never block delivery to the rest of the
/// chain or to the subscriber.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &str {
        "interceptor"
    }

    fn before_processing(&self, ctx: &mut InterceptorContext) {
        let _ = ctx;
    }

    fn after_processing_success(&self, ctx: &mut InterceptorContext) {
        let _ = ctx;
    }

    fn after_processing_failure(&self, ctx: &mut InterceptorContext) {
        let _ = ctx;
    }
}

enum Hook {
    Before,
    AfterSuccess,
    AfterFailure,
}

/// Ordered, immutable set of interceptors computed once at bus
/// construction. Cheap to clone: cloning duplicates the `Arc` pointers,
/// not the interceptors themselves, which is what lets the async
/// dispatcher hand one to every worker closure.
#[derive(Clone)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self { interceptors }
    }

    pub(crate) fn run_before(&self, ctx: &mut InterceptorContext) {
        for interceptor in &self.interceptors {
            self.guard(interceptor.as_ref(), ctx, Hook::Before);
        }
    }

    pub(crate) fn run_after_success(&self, ctx: &mut InterceptorContext) {
        for interceptor in self.interceptors.iter().rev() {
            self.guard(interceptor.as_ref(), ctx, Hook::AfterSuccess);
        }
    }

    pub(crate) fn run_after_failure(&self, ctx: &mut InterceptorContext) {
        for interceptor in self.interceptors.iter().rev() {
            self.guard(interceptor.as_ref(), ctx, Hook::AfterFailure);
        }
    }

    fn guard(&self, interceptor: &dyn Interceptor, ctx: &mut InterceptorContext, hook: Hook) {
        let result = catch_unwind(AssertUnwindSafe(|| match hook {
            Hook::Before => interceptor.before_processing(ctx),
            Hook::AfterSuccess => interceptor.after_processing_success(ctx),
            Hook::AfterFailure => interceptor.after_processing_failure(ctx),
        }));
        if let Err(panic) = result {
            let hook_name = match hook {
                Hook::Before => "before_processing",
                Hook::AfterSuccess => "after_processing_success",
                Hook::AfterFailure => "after_processing_failure",
            };
            error!(
                "interceptor `{}` panicked during {} hook: {}",
                interceptor.name(),
                hook_name,
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
