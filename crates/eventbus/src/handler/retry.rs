//! Retry policy attached to a primary handler.

use std::time::Duration;

/// Equivalent of `FailRetry(retries, interval, timeUnit)`: activates retry
/// for the primary handler of one handler group.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, interval: Duration) -> Self {
        Self { retries, interval }
    }
}
