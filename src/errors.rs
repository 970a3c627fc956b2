//! Error hierarchy for the fleet console.
//!
//! Failures are layered by operational concern: store access, cache
//! synchronization, command dispatch and infrastructure. Failures local to
//! one cache key, one command or one subscriber stay in their own branch and
//! never terminate the process; only [`Error::Fatal`] and startup-time
//! variants do.

use std::net::SocketAddr;

use config::ConfigError;
use tokio::task::JoinError;

use crate::ObjectKey;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Infrastructure-level failures (sockets, background tasks, signals)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Configuration loading failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource store access failures
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Cache synchronization failures
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Command dispatch failures
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Unrecoverable failures requiring process termination
    #[error("fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Listen socket unavailable at startup
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    #[error("shutdown signal channel closed: {0}")]
    SignalSendFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Transport-level request failures
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the store
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Watch stream delivered a line that does not decode
    #[error("malformed watch event: {0}")]
    MalformedEvent(String),

    /// Watch stream failed mid-flight
    #[error("watch stream failed: {0}")]
    WatchStream(String),

    #[error("invalid store endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("invalid store credentials")]
    InvalidCredentials,

    #[error("unknown resource kind: {0}")]
    UnknownKind(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Initial listing did not complete within the startup deadline
    #[error("timed out waiting for cache to sync")]
    CacheSyncTimeout,

    /// Initial listing failed outright
    #[error("initial listing failed: {0}")]
    InitialList(#[source] StoreError),

    /// Synchronization callback failure for one cache key
    #[error("sync failed for {key}: {reason}")]
    Failed { key: ObjectKey, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Command name is not in the allow-list
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Execution substrate refused the unit
    #[error("execution substrate rejected {name}: {reason}")]
    Rejected { name: String, reason: String },

    /// Execution substrate unreachable
    #[error("execution substrate unreachable: {0}")]
    Substrate(#[source] StoreError),
}
