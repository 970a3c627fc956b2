//! Configuration for the fleet console.
//!
//! Settings are loaded with increasing priority:
//! 1. Default values (hardcoded)
//! 2. Config file (explicit path, or `config/fleet` when present)
//! 3. Environment variables with the `FLEET` prefix (highest priority)

mod dispatch;
mod gateway;
mod hub;
mod retry;
mod store;
mod sync;

pub use dispatch::*;
pub use gateway::*;
pub use hub::*;
pub use retry::*;
pub use store::*;
pub use sync::*;


use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    /// HTTP/WebSocket gateway surface
    pub gateway: GatewayConfig,
    /// Resource store endpoint and credentials
    pub store: StoreConfig,
    /// Watch controller and work queue parameters
    pub sync: SyncConfig,
    /// Notification hub parameters
    pub hub: HubConfig,
    /// Command dispatch parameters
    pub dispatch: DispatchConfig,
}

impl Settings {
    /// Load configuration from file and environment.
    ///
    /// # Arguments
    /// * `path` - Optional explicit config file path; without it,
    ///   `config/fleet.toml` is read when present.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(path) => builder = builder.add_source(File::with_name(path).required(true)),
            None => builder = builder.add_source(File::with_name("config/fleet").required(false)),
        }

        builder = builder.add_source(
            Environment::with_prefix("FLEET")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates every section.
    /// # Errors
    /// Returns `Error::InvalidConfig` if any configuration rules are violated
    pub fn validate(&self) -> Result<()> {
        self.gateway.validate()?;
        self.store.validate()?;
        self.sync.validate()?;
        self.hub.validate()?;
        Ok(())
    }
}
