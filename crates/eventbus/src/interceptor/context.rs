//! Mutable context threaded through the global interceptor chain.
//!
//! One `InterceptorContext` is created per `(subscriber, event)` pair by
//! the three-phase processor, not once per `post` — every subscriber gets
//! its own timing and retry bookkeeping.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::event::Event;

/// A small closed set of attribute value shapes, standing in for a
/// `Map<String, Object>` attribute bag. Closed over four variants keeps
/// interceptors from needing `Any` downcasting for the common cases.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Bool(value)
    }
}

/// Carried through the interceptor hooks wrapping one subscriber's
/// three-phase processing of one event. Interceptors read the event, the
/// running retry/skip bookkeeping the processor maintains, and freely
/// read/write the attribute map to pass data along the chain.
pub struct InterceptorContext {
    event: Arc<dyn Event>,
    bus_identifier: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    retry_count: u32,
    skipped: bool,
    attributes: HashMap<String, AttributeValue>,
}

impl InterceptorContext {
    pub(crate) fn new(event: Arc<dyn Event>, bus_identifier: impl Into<String>) -> Self {
        Self {
            event,
            bus_identifier: bus_identifier.into(),
            start_time: Utc::now(),
            end_time: None,
            retry_count: 0,
            skipped: false,
            attributes: HashMap::new(),
        }
    }

    pub fn event(&self) -> &dyn Event {
        self.event.as_ref()
    }

    pub fn bus_identifier(&self) -> &str {
        &self.bus_identifier
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub(crate) fn finalize(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub(crate) fn set_retry_count(&mut self, count: u32) {
        self.retry_count = count;
    }

    pub fn skipped(&self) -> bool {
        self.skipped
    }

    pub(crate) fn set_skipped(&mut self, skipped: bool) {
        self.skipped = skipped;
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        self.attributes.remove(key)
    }
}
