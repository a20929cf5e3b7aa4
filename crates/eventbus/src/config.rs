//! Configuration value objects. Loading these from YAML/properties/env is an
//! external collaborator's job; this crate only defines the shape and its
//! defaults.

use serde::{Deserialize, Serialize};

/// Top-level bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub identifier: String,
    pub async_enabled: bool,
    pub async_workers: usize,
    pub delayed: DelayedConfig,
    /// Enforced cap on subscribers per event type; registering past it is
    /// rejected rather than silently accepted.
    pub max_subscribers_per_event: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            identifier: "event-bus".to_string(),
            async_enabled: false,
            async_workers: 10,
            delayed: DelayedConfig::default(),
            max_subscribers_per_event: 1000,
        }
    }
}

/// Settings for the lazily-created delayed-publish scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayedConfig {
    pub enabled: bool,
    pub core_workers: usize,
    pub thread_name_prefix: String,
}

impl Default for DelayedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            core_workers: 2,
            thread_name_prefix: "event-bus-delayed-".to_string(),
        }
    }
}
