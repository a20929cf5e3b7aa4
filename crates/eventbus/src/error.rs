//! Error types raised synchronously by registration, and the error shape
//! returned by handler closures.

use std::error::Error as StdError;
use thiserror::Error;

/// Error returned by a primary, idempotent, or failure-terminal handler
/// closure. Stands in for the "checked exception" a reflection-based target
/// would let a handler method throw.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl HandlerError {
    /// Build a handler error from a plain message, with no further cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an existing error as the cause of a handler failure.
    pub fn wrap(message: impl Into<String>, source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors raised synchronously by [`crate::EventBus::register`] and
/// [`crate::EventBus::unregister`]. Per the registry invariants, no partial
/// state is committed when one of these is returned.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// A handler group was built without a primary handler.
    #[error("handler group for event type `{event_type}` has no primary handler")]
    MissingPrimary { event_type: &'static str },

    /// The same listener already defines a handler group for this event type;
    /// in a reflection-based target this is the "two primaries for one event
    /// type on one listener" construction error.
    #[error("listener already defines a handler group for event type `{event_type}`")]
    DuplicateGroup { event_type: &'static str },

    /// `unregister` was called for a listener that is not currently registered.
    #[error("listener is not currently registered")]
    NotRegistered,

    /// Registering this listener would push an event type's subscriber count
    /// past the configured limit.
    #[error(
        "event type `{event_type}` would exceed the configured limit of {limit} subscribers"
    )]
    TooManySubscribers {
        event_type: &'static str,
        limit: usize,
    },
}
