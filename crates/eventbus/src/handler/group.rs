//! `HandlerGroup`: the per-(listener, event-type) tuple of primary,
//! idempotent and failure closures, plus the type-erased view the registry
//! and processor operate on.
//!
//! Targets with runtime reflection discover these by scanning annotated
//! methods; Rust has none, so the group is built explicitly through
//! [`super::builder::HandlerGroupBuilder`] instead. The data model and
//! processor behavior this produces match the reflective original.

use std::any::TypeId;

use crate::error::HandlerError;
use crate::event::Event;
use crate::failure::FailureContext;
use crate::handler::retry::RetryPolicy;

type PrimaryFn<E> = Box<dyn Fn(&E) -> Result<(), HandlerError> + Send + Sync>;
type IdempotentFn<E> = Box<dyn Fn(&E) -> Result<bool, HandlerError> + Send + Sync>;

/// The two `FailSubscribe` overloads: event-only, or event-plus-context.
pub enum FailureHandler<E: Event> {
    EventOnly(Box<dyn Fn(&E) -> Result<(), HandlerError> + Send + Sync>),
    WithContext(Box<dyn Fn(&E, &FailureContext) -> Result<(), HandlerError> + Send + Sync>),
}

/// A fully built handler group for one concrete event type `E`.
pub struct HandlerGroup<E: Event> {
    pub(crate) primary: PrimaryFn<E>,
    pub(crate) idempotent: Option<IdempotentFn<E>>,
    pub(crate) failure: Option<FailureHandler<E>>,
    pub(crate) retry: Option<RetryPolicy>,
    pub(crate) concurrent_safe: bool,
}

/// Type-erased view of a handler group, used by the registry index and the
/// three-phase processor so neither needs to be generic over the event
/// type. `event_type_id() == None` marks the "any event" bucket standing in
/// for `Object` (see `registry.rs`).
pub(crate) trait ErasedHandlerGroup: Send + Sync {
    fn event_type_id(&self) -> Option<TypeId>;
    fn event_type_name(&self) -> &'static str;
    fn is_concurrent_safe(&self) -> bool;
    fn retry_policy(&self) -> Option<RetryPolicy>;
    fn call_idempotent(&self, event: &dyn Event) -> Option<Result<bool, HandlerError>>;
    fn call_primary(&self, event: &dyn Event) -> Result<(), HandlerError>;
    fn call_failure(
        &self,
        event: &dyn Event,
        ctx: Option<&FailureContext>,
    ) -> Option<Result<(), HandlerError>>;
}

fn downcast<E: Event>(event: &dyn Event) -> &E {
    event
        .as_any()
        .downcast_ref::<E>()
        .expect("registry dispatched an event to a handler group of a different type")
}

pub(crate) struct TypedHandlerGroup<E: Event> {
    inner: HandlerGroup<E>,
}

impl<E: Event> TypedHandlerGroup<E> {
    pub(crate) fn new(inner: HandlerGroup<E>) -> Self {
        Self { inner }
    }
}

impl<E: Event> ErasedHandlerGroup for TypedHandlerGroup<E> {
    fn event_type_id(&self) -> Option<TypeId> {
        Some(TypeId::of::<E>())
    }

    fn event_type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }

    fn is_concurrent_safe(&self) -> bool {
        self.inner.concurrent_safe
    }

    fn retry_policy(&self) -> Option<RetryPolicy> {
        self.inner.retry
    }

    fn call_idempotent(&self, event: &dyn Event) -> Option<Result<bool, HandlerError>> {
        let typed = downcast::<E>(event);
        self.inner.idempotent.as_ref().map(|f| f(typed))
    }

    fn call_primary(&self, event: &dyn Event) -> Result<(), HandlerError> {
        (self.inner.primary)(downcast::<E>(event))
    }

    fn call_failure(
        &self,
        event: &dyn Event,
        ctx: Option<&FailureContext>,
    ) -> Option<Result<(), HandlerError>> {
        let typed = downcast::<E>(event);
        match self.inner.failure.as_ref()? {
            FailureHandler::EventOnly(f) => Some(f(typed)),
            FailureHandler::WithContext(f) => {
                Some(f(typed, ctx.expect("failure context present during failure phase")))
            }
        }
    }
}

/// The "any event" equivalent of [`HandlerGroup`]: closures operate directly
/// on `&dyn Event` rather than a downcast concrete type, the way a Java
/// `Object`-typed `@Subscribe` method would receive anything.
pub struct AnyHandlerGroup {
    pub(crate) primary: Box<dyn Fn(&dyn Event) -> Result<(), HandlerError> + Send + Sync>,
    pub(crate) idempotent:
        Option<Box<dyn Fn(&dyn Event) -> Result<bool, HandlerError> + Send + Sync>>,
    pub(crate) failure: Option<AnyFailureHandler>,
    pub(crate) retry: Option<RetryPolicy>,
    pub(crate) concurrent_safe: bool,
}

pub enum AnyFailureHandler {
    EventOnly(Box<dyn Fn(&dyn Event) -> Result<(), HandlerError> + Send + Sync>),
    WithContext(
        Box<dyn Fn(&dyn Event, &FailureContext) -> Result<(), HandlerError> + Send + Sync>,
    ),
}

impl ErasedHandlerGroup for AnyHandlerGroup {
    fn event_type_id(&self) -> Option<TypeId> {
        None
    }

    fn event_type_name(&self) -> &'static str {
        "<any event>"
    }

    fn is_concurrent_safe(&self) -> bool {
        self.concurrent_safe
    }

    fn retry_policy(&self) -> Option<RetryPolicy> {
        self.retry
    }

    fn call_idempotent(&self, event: &dyn Event) -> Option<Result<bool, HandlerError>> {
        self.idempotent.as_ref().map(|f| f(event))
    }

    fn call_primary(&self, event: &dyn Event) -> Result<(), HandlerError> {
        (self.primary)(event)
    }

    fn call_failure(
        &self,
        event: &dyn Event,
        ctx: Option<&FailureContext>,
    ) -> Option<Result<(), HandlerError>> {
        match self.failure.as_ref()? {
            AnyFailureHandler::EventOnly(f) => Some(f(event)),
            AnyFailureHandler::WithContext(f) => {
                Some(f(event, ctx.expect("failure context present during failure phase")))
            }
        }
    }
}
