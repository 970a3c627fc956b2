use serde::Deserialize;

use crate::constants::DEFAULT_SUBSCRIBER_BUFFER;
use crate::Error;
use crate::Result;

#[derive(Debug, Deserialize, Clone)]
pub struct HubConfig {
    /// Bounded channel capacity per subscriber. A full subscriber has the
    /// notification dropped for that subscriber only.
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: default_subscriber_buffer(),
        }
    }
}

impl HubConfig {
    pub fn validate(&self) -> Result<()> {
        if self.subscriber_buffer == 0 {
            return Err(Error::InvalidConfig(
                "hub subscriber_buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_subscriber_buffer() -> usize {
    DEFAULT_SUBSCRIBER_BUFFER
}
