use std::time::Duration;

use serde::Deserialize;

use crate::constants::DEFAULT_CONNECT_TIMEOUT_MS;
use crate::constants::DEFAULT_STORE_ENDPOINT;
use crate::Error;
use crate::Result;

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Base URL of the resource store REST endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Optional bearer token for reaching the store.
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.endpoint).map_err(|e| {
            Error::InvalidConfig(format!("store endpoint {}: {}", self.endpoint, e))
        })?;
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn default_endpoint() -> String {
    DEFAULT_STORE_ENDPOINT.to_string()
}
fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}
