use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_address: SocketAddr,

    /// When set, unmatched paths are served from this directory.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_addr(),
            static_dir: None,
        }
    }
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.listen_address.port() == 0 {
            return Err(Error::InvalidConfig(
                "gateway listen port cannot be 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen_addr() -> SocketAddr {
    ([0, 0, 0, 0], 8812).into()
}
