//! The last line of defense: invoked whenever a handler, idempotent check,
//! or failure handler itself raises and there is nowhere further in the
//! three-phase model left to route the error.

use log::error;

use crate::error::HandlerError;

/// Which phase of the three-phase model the exception surfaced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionPhase {
    Idempotent,
    Primary,
    Failure,
}

impl std::fmt::Display for ExceptionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExceptionPhase::Idempotent => "idempotent",
            ExceptionPhase::Primary => "primary",
            ExceptionPhase::Failure => "failure",
        };
        f.write_str(label)
    }
}

/// Everything the handler knows about where an unrouted error came from.
/// Rust closures have no reflective "declaring method" the way an annotated
/// Java method does, so this carries the event type and phase rather than a
/// method name.
pub struct ExceptionContext {
    pub event_type: &'static str,
    pub phase: ExceptionPhase,
    pub bus_identifier: String,
}

/// Hook for handing unrouted errors to application code instead of letting
/// the default logging behavior swallow them silently.
pub trait SubscriberExceptionHandler: Send + Sync {
    fn handle_exception(&self, error: &HandlerError, context: &ExceptionContext);
}

/// Default handler: logs at `error` level and nothing else, matching the
/// spec's baseline "log and continue" behavior.
pub struct LoggingExceptionHandler;

impl SubscriberExceptionHandler for LoggingExceptionHandler {
    fn handle_exception(&self, error: &HandlerError, context: &ExceptionContext) {
        error!(
            "[{}] unrouted {} error while handling `{}`: {}",
            context.bus_identifier, context.phase, context.event_type, error
        );
    }
}
