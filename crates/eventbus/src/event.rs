//! Event payloads and the dead-event wrapper.

use std::any::Any;
use std::sync::Arc;

/// Marker implemented by every type that can be posted through the bus.
///
/// The core places no constraint on the payload shape; anything
/// `Any + Send + Sync` qualifies, so any plain value type can be posted.
/// There is no nominal supertype chain to flatten in Rust, so dispatch is
/// keyed on the concrete type plus an explicit "any event" bucket that
/// stands in for `Object` (see `registry.rs`).
pub trait Event: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// Simple type name used in log messages and `FailureContext` so a
    /// swallowed error can be traced back to the event that caused it.
    fn type_name(&self) -> &'static str;
}

impl<T> Event for T
where
    T: Any + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Synthetic event posted when a publish finds no matching subscriber for
/// either the concrete event type or the "any event" bucket.
pub struct DeadEvent {
    pub bus_identifier: String,
    pub event: Arc<dyn Event>,
}

impl DeadEvent {
    pub fn new(bus_identifier: impl Into<String>, event: Arc<dyn Event>) -> Self {
        Self {
            bus_identifier: bus_identifier.into(),
            event,
        }
    }
}
