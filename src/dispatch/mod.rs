//! Command dispatch.
//!
//! Turns a validated imperative command into exactly one uniquely named,
//! namespace-scoped execution unit on the substrate, or rejects it
//! synchronously. Dispatch is fire-and-forget: acceptance is the success
//! signal, completion is only observable through the watch path on the
//! target resource's status.


use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use lazy_static::lazy_static;
use nanoid::nanoid;
use serde::Serialize;
use tracing::info;

#[cfg(test)]
use mockall::automock;

use crate::constants::UNIT_NAME_ALPHABET;
use crate::constants::UNIT_NAME_LEN;
use crate::constants::UNIT_NAME_PREFIX;
use crate::resource::base64_bytes;
use crate::DispatchConfig;
use crate::DispatchError;

lazy_static! {
    static ref ALLOWED_COMMANDS: HashSet<&'static str> = [
        "app_start",
        "app_stop",
        "app_spot",
        "app_goto_target",
        "app_pause",
        "app_charge",
    ]
    .into_iter()
    .collect();
}

/// One-shot background task bound to a target device. Created, never
/// updated; the substrate garbage-collects it once terminal.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionUnit {
    pub name: String,
    pub namespace: String,
    /// Device the unit is pinned to.
    pub device: String,
    pub command: String,
    /// Opaque argument blob, forwarded verbatim.
    #[serde(with = "base64_bytes")]
    pub args: Bytes,
    /// Internal retry budget; no restart beyond it.
    pub backoff_limit: u32,
}

/// The job execution substrate, treated as a black box that accepts a
/// unit-of-work descriptor and runs it to completion or failure.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ExecutionSubstrate: Send + Sync + 'static {
    async fn submit(&self, unit: ExecutionUnit) -> std::result::Result<(), DispatchError>;
}

/// Stateless command dispatcher. Holds no cross-command state, so any number
/// of commands may be dispatched concurrently.
pub struct Dispatcher {
    substrate: Arc<dyn ExecutionSubstrate>,
    backoff_limit: u32,
}

impl Dispatcher {
    pub fn new(substrate: Arc<dyn ExecutionSubstrate>, config: &DispatchConfig) -> Self {
        Self {
            substrate,
            backoff_limit: config.backoff_limit,
        }
    }

    /// Validate and submit one command. Returns the unique unit name once
    /// the substrate has accepted the unit, not once it completes.
    pub async fn dispatch(
        &self,
        command: &str,
        namespace: &str,
        device: &str,
        args: Bytes,
    ) -> std::result::Result<String, DispatchError> {
        if !ALLOWED_COMMANDS.contains(command) {
            return Err(DispatchError::UnknownCommand(command.to_string()));
        }

        let name = unit_name();
        let unit = ExecutionUnit {
            name: name.clone(),
            namespace: namespace.to_string(),
            device: device.to_string(),
            command: command.to_string(),
            args,
            backoff_limit: self.backoff_limit,
        };
        self.substrate.submit(unit).await?;

        info!(command, device, unit = %name, "command dispatched");
        Ok(name)
    }
}

/// Randomized suffix over a 36-symbol alphabet; at 8 symbols the collision
/// probability across concurrent dispatches is negligible.
fn unit_name() -> String {
    format!(
        "{}-{}",
        UNIT_NAME_PREFIX,
        nanoid!(UNIT_NAME_LEN, &UNIT_NAME_ALPHABET)
    )
}
