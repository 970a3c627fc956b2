use std::time::Duration;

use serde::Deserialize;

use super::BackoffPolicy;
use crate::constants::DEFAULT_RESUBSCRIBE_DELAY_MS;
use crate::constants::DEFAULT_SYNC_CONCURRENCY;
use crate::constants::DEFAULT_SYNC_TIMEOUT_MS;
use crate::Error;
use crate::Result;

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Worker loops per watch controller.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Startup deadline for the initial full listing (cache-sync barrier).
    #[serde(default = "default_sync_timeout_ms")]
    pub sync_timeout_ms: u64,

    /// Pause before re-subscribing after the watch stream ends or errors.
    #[serde(default = "default_resubscribe_delay_ms")]
    pub resubscribe_delay_ms: u64,

    /// Retry policy for failed reconciliation passes.
    #[serde(default)]
    pub retry: BackoffPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            sync_timeout_ms: default_sync_timeout_ms(),
            resubscribe_delay_ms: default_resubscribe_delay_ms(),
            retry: BackoffPolicy::default(),
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::InvalidConfig(
                "sync concurrency must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }

    pub fn resubscribe_delay(&self) -> Duration {
        Duration::from_millis(self.resubscribe_delay_ms)
    }
}

fn default_concurrency() -> usize {
    DEFAULT_SYNC_CONCURRENCY
}
fn default_sync_timeout_ms() -> u64 {
    DEFAULT_SYNC_TIMEOUT_MS
}
fn default_resubscribe_delay_ms() -> u64 {
    DEFAULT_RESUBSCRIBE_DELAY_MS
}
