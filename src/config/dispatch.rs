use serde::Deserialize;

use crate::constants::DEFAULT_BACKOFF_LIMIT;

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchConfig {
    /// Internal retry budget of a dispatched execution unit. A failed unit is
    /// never restarted beyond this.
    #[serde(default = "default_backoff_limit")]
    pub backoff_limit: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            backoff_limit: default_backoff_limit(),
        }
    }
}

fn default_backoff_limit() -> u32 {
    DEFAULT_BACKOFF_LIMIT
}
