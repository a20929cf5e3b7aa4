//! An in-process publish/subscribe event bus with an explicit three-phase
//! processing model per subscriber: an idempotency check, a primary
//! handler with optional retry, and a terminal failure handler that runs
//! once retries (or the single attempt, if none were configured) are
//! exhausted.
//!
//! Subscribers are assembled with [`ListenerBuilder`] rather than
//! discovered by scanning annotated methods — there is no reflection to
//! scan in Rust, and the builder produces the identical handler-group
//! model a reflective scan would. Registering a [`Listener`] returns a
//! [`ListenerId`] that later calls to `unregister` use to find it again.
//!
//! Two bus flavors share this model:
//!
//! - [`EventBus`] dispatches synchronously, inline on the posting thread.
//! - [`AsyncEventBus`] hands each matching subscriber's invocation to a
//!   worker pool, and additionally supports [`AsyncEventBus::post_delayed`].
//!
//! A global [`Interceptor`] chain wraps every publish on either bus, and
//! posting a value with no matching subscriber republishes it wrapped in
//! [`DeadEvent`].

mod async_bus;
mod bus;
pub mod config;
mod dispatcher;
mod error;
mod event;
mod exception;
mod failure;
mod handler;
mod interceptor;
mod processor;
mod registry;
mod scheduler;

pub use async_bus::{AsyncEventBus, AsyncEventBusBuilder};
pub use bus::{EventBus, EventBusBuilder};
pub use config::Configuration;
pub use error::{HandlerError, RegistrationError};
pub use event::{DeadEvent, Event};
pub use exception::{ExceptionContext, ExceptionPhase, LoggingExceptionHandler, SubscriberExceptionHandler};
pub use failure::{FailureClassification, FailureContext};
pub use handler::{
    AnyHandlerGroupBuilder, HandlerGroupBuilder, Listener, ListenerBuilder, ListenerId, RetryPolicy,
};
pub use interceptor::{AttributeValue, Interceptor, InterceptorChain, InterceptorContext};
pub use scheduler::TaskHandle;
