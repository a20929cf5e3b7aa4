//! Builder API that replaces annotation-based subscriber discovery.
//!
//! A listener is built by chaining `.on::<Event>()...register()` (or
//! `.on_any()...register()`) calls and finishing with `.build()`. The
//! resulting [`Listener`] carries a synthesized identity token
//! ([`ListenerId`]) standing in for object identity, since arbitrary Rust
//! values have none to borrow.

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{HandlerError, RegistrationError};
use crate::event::Event;
use crate::failure::FailureContext;
use crate::handler::group::{
    AnyFailureHandler, AnyHandlerGroup, ErasedHandlerGroup, FailureHandler, HandlerGroup,
    TypedHandlerGroup,
};
use crate::handler::retry::RetryPolicy;

/// Zero-sized allocation whose address is the listener's identity.
struct ListenerToken;

/// Synthesized identity token for a registered listener. Two `ListenerId`s
/// compare equal only if they were cloned from the same registration, the
/// same way two references to one Java object would.
#[derive(Clone)]
pub struct ListenerId(Arc<ListenerToken>);

impl ListenerId {
    fn new() -> Self {
        Self(Arc::new(ListenerToken))
    }
}

impl PartialEq for ListenerId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ListenerId {}

impl std::hash::Hash for ListenerId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl std::fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ListenerId({:p})", Arc::as_ptr(&self.0))
    }
}

/// A built listener, ready to hand to [`crate::bus::EventBus::register`].
pub struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) groups: Vec<Box<dyn ErasedHandlerGroup>>,
}

impl Listener {
    pub fn id(&self) -> &ListenerId {
        &self.id
    }
}

/// Accumulates handler groups for one listener before it is registered.
pub struct ListenerBuilder {
    groups: Vec<Box<dyn ErasedHandlerGroup>>,
    seen: HashSet<Option<TypeId>>,
}

impl ListenerBuilder {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Begin a handler group for a concrete event type.
    pub fn on<E: Event>(self) -> HandlerGroupBuilder<E> {
        HandlerGroupBuilder {
            listener: self,
            primary: None,
            idempotent: None,
            failure: None,
            retry: None,
            concurrent_safe: false,
        }
    }

    /// Begin a handler group in the "any event" bucket, the stand-in for a
    /// Java `@Subscribe` method declared on `Object`.
    pub fn on_any(self) -> AnyHandlerGroupBuilder {
        AnyHandlerGroupBuilder {
            listener: self,
            primary: None,
            idempotent: None,
            failure: None,
            retry: None,
            concurrent_safe: false,
        }
    }

    pub(crate) fn push_group(
        &mut self,
        group: Box<dyn ErasedHandlerGroup>,
        key: Option<TypeId>,
        event_type: &'static str,
    ) -> Result<(), RegistrationError> {
        if !self.seen.insert(key) {
            return Err(RegistrationError::DuplicateGroup { event_type });
        }
        self.groups.push(group);
        Ok(())
    }

    pub fn build(self) -> Listener {
        Listener {
            id: ListenerId::new(),
            groups: self.groups,
        }
    }
}

impl Default for ListenerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds one [`HandlerGroup`] for event type `E` before handing control
/// back to the enclosing [`ListenerBuilder`].
pub struct HandlerGroupBuilder<E: Event> {
    listener: ListenerBuilder,
    primary: Option<Box<dyn Fn(&E) -> Result<(), HandlerError> + Send + Sync>>,
    idempotent: Option<Box<dyn Fn(&E) -> Result<bool, HandlerError> + Send + Sync>>,
    failure: Option<FailureHandler<E>>,
    retry: Option<RetryPolicy>,
    concurrent_safe: bool,
}

impl<E: Event> HandlerGroupBuilder<E> {
    /// The `@Subscribe` equivalent: mandatory primary handler.
    pub fn primary(
        mut self,
        f: impl Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> Self {
        self.primary = Some(Box::new(f));
        self
    }

    /// The `@Idempotent` equivalent: skip-check run before the primary handler.
    pub fn idempotent(
        mut self,
        f: impl Fn(&E) -> Result<bool, HandlerError> + Send + Sync + 'static,
    ) -> Self {
        self.idempotent = Some(Box::new(f));
        self
    }

    /// `@FailSubscribe` overload that receives only the event.
    pub fn on_failure(
        mut self,
        f: impl Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> Self {
        self.failure = Some(FailureHandler::EventOnly(Box::new(f)));
        self
    }

    /// `@FailSubscribe` overload that also receives the [`FailureContext`].
    pub fn on_failure_with_context(
        mut self,
        f: impl Fn(&E, &FailureContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> Self {
        self.failure = Some(FailureHandler::WithContext(Box::new(f)));
        self
    }

    /// `@FailRetry`: turns on the retry phase for this group's primary handler.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// `@AllowConcurrentEvents`: lets the async dispatcher run this group's
    /// invocations for different events concurrently instead of serializing
    /// them on a per-subscriber lane.
    pub fn concurrent(mut self, allow: bool) -> Self {
        self.concurrent_safe = allow;
        self
    }

    /// Finish this group and return to the listener builder.
    pub fn register(mut self) -> Result<ListenerBuilder, RegistrationError> {
        let event_type = std::any::type_name::<E>();
        let primary = self
            .primary
            .take()
            .ok_or(RegistrationError::MissingPrimary { event_type })?;
        let group = HandlerGroup {
            primary,
            idempotent: self.idempotent.take(),
            failure: self.failure.take(),
            retry: self.retry,
            concurrent_safe: self.concurrent_safe,
        };
        let mut listener = self.listener;
        listener.push_group(
            Box::new(TypedHandlerGroup::new(group)),
            Some(TypeId::of::<E>()),
            event_type,
        )?;
        Ok(listener)
    }
}

/// The "any event" counterpart of [`HandlerGroupBuilder`].
pub struct AnyHandlerGroupBuilder {
    listener: ListenerBuilder,
    primary: Option<Box<dyn Fn(&dyn Event) -> Result<(), HandlerError> + Send + Sync>>,
    idempotent: Option<Box<dyn Fn(&dyn Event) -> Result<bool, HandlerError> + Send + Sync>>,
    failure: Option<AnyFailureHandler>,
    retry: Option<RetryPolicy>,
    concurrent_safe: bool,
}

impl AnyHandlerGroupBuilder {
    pub fn primary(
        mut self,
        f: impl Fn(&dyn Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> Self {
        self.primary = Some(Box::new(f));
        self
    }

    pub fn idempotent(
        mut self,
        f: impl Fn(&dyn Event) -> Result<bool, HandlerError> + Send + Sync + 'static,
    ) -> Self {
        self.idempotent = Some(Box::new(f));
        self
    }

    pub fn on_failure(
        mut self,
        f: impl Fn(&dyn Event) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> Self {
        self.failure = Some(AnyFailureHandler::EventOnly(Box::new(f)));
        self
    }

    pub fn on_failure_with_context(
        mut self,
        f: impl Fn(&dyn Event, &FailureContext) -> Result<(), HandlerError> + Send + Sync + 'static,
    ) -> Self {
        self.failure = Some(AnyFailureHandler::WithContext(Box::new(f)));
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn concurrent(mut self, allow: bool) -> Self {
        self.concurrent_safe = allow;
        self
    }

    pub fn register(mut self) -> Result<ListenerBuilder, RegistrationError> {
        let event_type = "<any event>";
        let primary = self
            .primary
            .take()
            .ok_or(RegistrationError::MissingPrimary { event_type })?;
        let group = AnyHandlerGroup {
            primary,
            idempotent: self.idempotent.take(),
            failure: self.failure.take(),
            retry: self.retry,
            concurrent_safe: self.concurrent_safe,
        };
        let mut listener = self.listener;
        listener.push_group(Box::new(group), None, event_type)?;
        Ok(listener)
    }
}
