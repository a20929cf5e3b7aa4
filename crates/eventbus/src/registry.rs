//! The subscriber index: a copy-on-write map from event type (or the "any
//! event" bucket) to the subscribers listening on it.
//!
//! Reads (one per publish) take a shared lock and clone a handful of `Arc`s;
//! writes (register/unregister, rare by comparison) rebuild the affected
//! bucket under an exclusive lock. This trades a little allocation on the
//! write path for a read path that never blocks on another reader.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::RegistrationError;
use crate::handler::{ErasedHandlerGroup, Listener, ListenerId};

#[derive(Clone)]
pub(crate) struct Subscriber {
    pub(crate) listener_id: ListenerId,
    pub(crate) group: Arc<dyn ErasedHandlerGroup>,
}

pub(crate) struct Registry {
    index: RwLock<HashMap<Option<TypeId>, Arc<Vec<Subscriber>>>>,
    listeners: RwLock<HashMap<ListenerId, Vec<Option<TypeId>>>>,
    max_subscribers_per_event: usize,
}

impl Registry {
    pub(crate) fn new(max_subscribers_per_event: usize) -> Self {
        Self {
            index: RwLock::new(HashMap::new()),
            listeners: RwLock::new(HashMap::new()),
            max_subscribers_per_event,
        }
    }

    /// Enforces the configured subscriber cap at registration time, then
    /// fans the listener's groups out into their buckets.
    pub(crate) fn register(&self, listener: Listener) -> Result<ListenerId, RegistrationError> {
        let Listener { id, groups } = listener;

        {
            let index = self.index.read();
            for group in &groups {
                let key = group.event_type_id();
                let current = index.get(&key).map(|bucket| bucket.len()).unwrap_or(0);
                if current >= self.max_subscribers_per_event {
                    return Err(RegistrationError::TooManySubscribers {
                        event_type: group.event_type_name(),
                        limit: self.max_subscribers_per_event,
                    });
                }
            }
        }

        let mut keys = Vec::with_capacity(groups.len());
        {
            let mut index = self.index.write();
            for group in groups {
                let key = group.event_type_id();
                let subscriber = Subscriber {
                    listener_id: id.clone(),
                    group: Arc::from(group),
                };
                let mut updated = index
                    .get(&key)
                    .map(|bucket| bucket.as_ref().clone())
                    .unwrap_or_default();
                updated.push(subscriber);
                index.insert(key, Arc::new(updated));
                keys.push(key);
            }
        }

        self.listeners.write().insert(id.clone(), keys);
        Ok(id)
    }

    pub(crate) fn unregister(&self, listener_id: &ListenerId) -> Result<(), RegistrationError> {
        let keys = self
            .listeners
            .write()
            .remove(listener_id)
            .ok_or(RegistrationError::NotRegistered)?;

        let mut index = self.index.write();
        for key in keys {
            if let Some(bucket) = index.get(&key) {
                let filtered: Vec<Subscriber> = bucket
                    .iter()
                    .filter(|subscriber| subscriber.listener_id != *listener_id)
                    .cloned()
                    .collect();
                index.insert(key, Arc::new(filtered));
            }
        }
        Ok(())
    }

    /// Subscribers for a concrete event type plus everyone in the "any
    /// event" bucket, the union that a post of that type must reach.
    pub(crate) fn subscribers_for(&self, type_id: TypeId) -> Vec<Subscriber> {
        let index = self.index.read();
        let mut result = Vec::new();
        if let Some(bucket) = index.get(&Some(type_id)) {
            result.extend(bucket.iter().cloned());
        }
        if let Some(bucket) = index.get(&None) {
            result.extend(bucket.iter().cloned());
        }
        result
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}
