use std::time::Duration;

use serde::Deserialize;

use crate::constants::DEFAULT_BASE_DELAY_MS;
use crate::constants::DEFAULT_MAX_DELAY_MS;
use crate::constants::DEFAULT_SYNC_MAX_RETRIES;

/// Bounded-retry template for failed reconciliation passes.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BackoffPolicy {
    /// Retry budget per cache key before the key is dropped
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl BackoffPolicy {
    /// Exponential delay before re-queueing a key that has already been
    /// requeued `requeues` times, capped at `max_delay_ms`.
    pub fn delay_for(&self, requeues: u32) -> Duration {
        let shift = requeues.min(16);
        let delay = self
            .base_delay_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

fn default_max_retries() -> usize {
    DEFAULT_SYNC_MAX_RETRIES
}
fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}
fn default_max_delay_ms() -> u64 {
    DEFAULT_MAX_DELAY_MS
}
