//! The asynchronous event bus: dispatch hands off to a worker pool instead
//! of running inline, and adds delayed publish on top of that pool via a
//! lazily-started [`DelayedScheduler`].

use std::any::TypeId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use log::debug;

use crate::config::{Configuration, DelayedConfig};
use crate::dispatcher::{AsyncDispatcher, WorkerPool};
use crate::error::RegistrationError;
use crate::event::{DeadEvent, Event};
use crate::exception::{LoggingExceptionHandler, SubscriberExceptionHandler};
use crate::handler::{Listener, ListenerId};
use crate::interceptor::{Interceptor, InterceptorChain};
use crate::registry::Registry;
use crate::scheduler::{DelayedScheduler, TaskHandle};

struct Inner {
    identifier: Arc<str>,
    registry: Arc<Registry>,
    interceptors: InterceptorChain,
    exception_handler: Arc<dyn SubscriberExceptionHandler>,
    dispatcher: AsyncDispatcher,
    pool: Arc<WorkerPool>,
    cancelled: Arc<AtomicBool>,
    delayed: OnceLock<Arc<DelayedScheduler>>,
    delayed_config: DelayedConfig,
}

pub struct AsyncEventBusBuilder {
    config: Configuration,
    interceptors: Vec<Arc<dyn Interceptor>>,
    exception_handler: Option<Arc<dyn SubscriberExceptionHandler>>,
}

impl AsyncEventBusBuilder {
    pub fn new() -> Self {
        Self {
            config: Configuration {
                async_enabled: true,
                ..Configuration::default()
            },
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

    pub fn build(self) -> AsyncEventBus {
        let identifier: Arc<str> = Arc::from(self.config.identifier.as_str());
        let pool = Arc::new(WorkerPool::new(
            self.config.async_workers.max(1),
            &format!("{}-async-", identifier),
        ));
        AsyncEventBus {
            inner: Arc::new(Inner {
                identifier: identifier.clone(),
                registry: Arc::new(Registry::new(self.config.max_subscribers_per_event)),
                interceptors: InterceptorChain::new(self.interceptors),
                exception_handler: self
                    .exception_handler
                    .unwrap_or_else(|| Arc::new(LoggingExceptionHandler)),
                dispatcher: AsyncDispatcher::new(pool.clone()),
                pool,
                cancelled: Arc::new(AtomicBool::new(false)),
                delayed: OnceLock::new(),
                delayed_config: self.config.delayed,
            }),
        }
    }
}

impl Default for AsyncEventBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An async counterpart to [`crate::bus::EventBus`]: `post` hands each
/// matching subscriber's invocation to a worker pool instead of running it
/// on the caller's thread, and `post_delayed` schedules a future publish.
///
/// Cheaply cloneable; every clone shares the same registry, pool and
/// delayed scheduler.
#[derive(Clone)]
pub struct AsyncEventBus {
    inner: Arc<Inner>,
}

impl AsyncEventBus {
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: Configuration) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> AsyncEventBusBuilder {
        AsyncEventBusBuilder::new()
    }

    pub fn identifier(&self) -> &str {
        &self.inner.identifier
    }

    pub fn register(&self, listener: Listener) -> Result<ListenerId, RegistrationError> {
        self.inner.registry.register(listener)
    }

    pub fn unregister(&self, listener_id: &ListenerId) -> Result<(), RegistrationError> {
        self.inner.registry.unregister(listener_id)
    }

    /// Publishes `event` immediately; matching subscribers run on the
    /// worker pool rather than on this call's thread, so the interceptor
    /// chain's hooks for a given subscriber fire on whichever worker ends
    /// up running it, not on the thread that called `post`.
    pub fn post<E: Event>(&self, event: E) {
        self.post_dyn(Arc::new(event), TypeId::of::<E>());
    }

    /// Schedules `event` to be published after `delay`. Returns a handle
    /// that can cancel the publish before it fires.
    ///
    /// A zero delay calls `post` directly instead of round-tripping through
    /// the scheduler; the returned handle is already-fired and cancelling
    /// it has no effect.
    pub fn post_delayed<E: Event>(&self, event: E, delay: Duration) -> TaskHandle {
        if delay == Duration::ZERO {
            self.post(event);
            return TaskHandle::already_fired();
        }
        let bus = self.clone();
        let event: Arc<dyn Event> = Arc::new(event);
        let type_id = TypeId::of::<E>();
        let scheduler = self.delayed_scheduler();
        scheduler.schedule(delay, move || {
            bus.post_dyn(event, type_id);
        })
    }

    fn delayed_scheduler(&self) -> Arc<DelayedScheduler> {
        self.inner
            .delayed
            .get_or_init(|| {
                Arc::new(DelayedScheduler::new(
                    self.inner.delayed_config.core_workers,
                    &self.inner.delayed_config.thread_name_prefix,
                ))
            })
            .clone()
    }

    pub(crate) fn post_dyn(&self, event: Arc<dyn Event>, type_id: TypeId) {
        let subscribers = self.inner.registry.subscribers_for(type_id);
        if subscribers.is_empty() {
            self.post_dead_event(event);
            return;
        }

        self.inner.dispatcher.dispatch(
            subscribers,
            event,
            self.inner.identifier.clone(),
            self.inner.cancelled.clone(),
            self.inner.interceptors.clone(),
            self.inner.exception_handler.clone(),
        );
    }

    fn post_dead_event(&self, event: Arc<dyn Event>) {
        if event.as_any().is::<DeadEvent>() {
            debug!(
                "[{}] dropping dead event with no subscriber: `{}`",
                self.inner.identifier,
                event.type_name()
            );
            return;
        }
        debug!(
            "[{}] no subscriber for `{}`, posting as dead event",
            self.inner.identifier,
            event.type_name()
        );
        let dead: Arc<dyn Event> =
            Arc::new(DeadEvent::new(self.inner.identifier.to_string(), event));
        self.post_dyn(dead, TypeId::of::<DeadEvent>());
    }

    /// Stops accepting new dispatch, signals any in-flight retry backoff to
    /// stop waiting, and waits up to `grace` for the worker pool and (if it
    /// was ever started) the delayed scheduler to finish.
    pub fn shutdown(&self, grace: Duration) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        if let Some(scheduler) = self.inner.delayed.get() {
            scheduler.shutdown(grace);
        }
        self.inner.pool.shutdown(grace);
    }
}

impl Default for AsyncEventBus {
    fn default() -> Self {
        Self::new()
    }
}
