//! The synchronous event bus: dispatch happens inline on the posting
//! thread, reentrantly queued per [`crate::dispatcher::sync_dispatcher`].

use std::any::TypeId;
use std::sync::Arc;

use log::debug;

use crate::config::Configuration;
use crate::dispatcher::sync_dispatcher;
use crate::error::RegistrationError;
use crate::event::{DeadEvent, Event};
use crate::exception::{LoggingExceptionHandler, SubscriberExceptionHandler};
use crate::handler::{Listener, ListenerId};
use crate::interceptor::{Interceptor, InterceptorChain};
use crate::registry::Registry;

/// Builds an [`EventBus`], the way application wiring composes config,
/// interceptors and an exception handler before the bus starts serving
/// `post` calls.
pub struct EventBusBuilder {
    config: Configuration,
    interceptors: Vec<Arc<dyn Interceptor>>,
    exception_handler: Option<Arc<dyn SubscriberExceptionHandler>>,
}

impl EventBusBuilder {
    pub fn new() -> Self {
        Self {
            config: Configuration::default(),
            interceptors: Vec::new(),
            exception_handler: None,
        }
    }

    pub fn config(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    pub fn identifier(mut self, identifier: impl Into<String>) -> Self {
        self.config.identifier = identifier.into();
        self
    }

    pub fn interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn exception_handler(mut self, handler: impl SubscriberExceptionHandler + 'static) -> Self {
        self.exception_handler = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> EventBus {
        EventBus {
            identifier: Arc::from(self.config.identifier.as_str()),
            registry: Arc::new(Registry::new(self.config.max_subscribers_per_event)),
            interceptors: InterceptorChain::new(self.interceptors),
            exception_handler: self
                .exception_handler
                .unwrap_or_else(|| Arc::new(LoggingExceptionHandler)),
        }
    }
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-process, synchronous publish/subscribe bus.
///
/// Registration is explicit (see [`crate::handler::ListenerBuilder`])
/// rather than discovered via reflection; everything else — the
/// idempotency/primary/failure processing model, dead-event fallback, and
/// the global interceptor chain — behaves the way the reflective original
/// does.
pub struct EventBus {
    identifier: Arc<str>,
    registry: Arc<Registry>,
    interceptors: InterceptorChain,
    exception_handler: Arc<dyn SubscriberExceptionHandler>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: Configuration) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn register(&self, listener: Listener) -> Result<ListenerId, RegistrationError> {
        self.registry.register(listener)
    }

    pub fn unregister(&self, listener_id: &ListenerId) -> Result<(), RegistrationError> {
        self.registry.unregister(listener_id)
    }

    /// Publishes `event` to every subscriber of its concrete type plus
    /// every "any event" subscriber. If none match, wraps it in a
    /// [`DeadEvent`] and posts that instead.
    pub fn post<E: Event>(&self, event: E) {
        self.post_dyn(Arc::new(event), TypeId::of::<E>());
    }

    pub(crate) fn post_dyn(&self, event: Arc<dyn Event>, type_id: TypeId) {
        let subscribers = self.registry.subscribers_for(type_id);
        if subscribers.is_empty() {
            self.post_dead_event(event);
            return;
        }

        sync_dispatcher::dispatch(
            subscribers,
            event,
            &self.identifier,
            &self.interceptors,
            self.exception_handler.as_ref(),
        );
    }

    fn post_dead_event(&self, event: Arc<dyn Event>) {
        if event.as_any().is::<DeadEvent>() {
            debug!(
                "[{}] dropping dead event with no subscriber: `{}`",
                self.identifier,
                event.type_name()
            );
            return;
        }
        debug!(
            "[{}] no subscriber for `{}`, posting as dead event",
            self.identifier,
            event.type_name()
        );
        let dead: Arc<dyn Event> = Arc::new(DeadEvent::new(self.identifier.to_string(), event));
        self.post_dyn(dead, TypeId::of::<DeadEvent>());
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
