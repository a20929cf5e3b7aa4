//! The immutable terminal-failure record produced by the three-phase processor.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::HandlerError;
use crate::event::Event;

/// How a terminal failure is classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClassification {
    /// Primary handler failed and either had no retry policy, or the retry
    /// loop was aborted by cancellation rather than exhausted.
    ProcessingException,
    /// Primary handler exhausted every configured retry attempt.
    RetryExhausted,
    /// The idempotent predicate itself raised, or the handler could not be
    /// invoked at all (the closest Rust analog to a reflective access error).
    SystemException,
}

/// Immutable description of a terminal failure, handed to the failure
/// handler and to the `SubscriberExceptionHandler` hook.
pub struct FailureContext {
    event: Arc<dyn Event>,
    cause: HandlerError,
    total_retries: u32,
    first_attempt_at: DateTime<Utc>,
    last_attempt_at: DateTime<Utc>,
    elapsed: Duration,
    classification: FailureClassification,
}

impl FailureContext {
    pub(crate) fn new(
        event: Arc<dyn Event>,
        cause: HandlerError,
        total_retries: u32,
        classification: FailureClassification,
        first_attempt_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        Self {
            event,
            cause,
            total_retries,
            first_attempt_at,
            last_attempt_at: Utc::now(),
            elapsed,
            classification,
        }
    }

    pub fn event(&self) -> &dyn Event {
        self.event.as_ref()
    }

    pub fn cause(&self) -> &HandlerError {
        &self.cause
    }

    pub fn total_retries(&self) -> u32 {
        self.total_retries
    }

    pub fn classification(&self) -> FailureClassification {
        self.classification
    }

    pub fn first_attempt_at(&self) -> DateTime<Utc> {
        self.first_attempt_at
    }

    pub fn last_attempt_at(&self) -> DateTime<Utc> {
        self.last_attempt_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

impl std::fmt::Debug for FailureContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureContext")
            .field("event_type", &self.event.type_name())
            .field("cause", &self.cause)
            .field("total_retries", &self.total_retries)
            .field("classification", &self.classification)
            .field("first_attempt_at", &self.first_attempt_at)
            .field("last_attempt_at", &self.last_attempt_at)
            .field("elapsed", &self.elapsed)
            .finish()
    }
}
