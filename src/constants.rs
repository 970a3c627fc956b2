// -
// Sync defaults

/// Retry budget for a single cache key before it is dropped from the queue.
pub(crate) const DEFAULT_SYNC_MAX_RETRIES: usize = 5;

pub(crate) const DEFAULT_SYNC_CONCURRENCY: usize = 2;
pub(crate) const DEFAULT_SYNC_TIMEOUT_MS: u64 = 30_000;
pub(crate) const DEFAULT_RESUBSCRIBE_DELAY_MS: u64 = 1_000;

pub(crate) const DEFAULT_BASE_DELAY_MS: u64 = 50;
pub(crate) const DEFAULT_MAX_DELAY_MS: u64 = 5_000;

// -
// Hub defaults

/// Bounded per-subscriber channel capacity. A full subscriber has the
/// notification dropped for that subscriber only.
pub(crate) const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

// -
// Dispatch defaults

/// Internal retry budget of a dispatched execution unit.
pub(crate) const DEFAULT_BACKOFF_LIMIT: u32 = 1;

pub(crate) const UNIT_NAME_PREFIX: &str = "fleet-cmd";
pub(crate) const UNIT_NAME_LEN: usize = 8;

/// 36-symbol alphabet for execution unit name suffixes.
pub(crate) const UNIT_NAME_ALPHABET: [char; 36] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's',
    't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9',
];

// -
// Store defaults

pub(crate) const DEFAULT_STORE_ENDPOINT: &str = "http://127.0.0.1:8001";
pub(crate) const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// REST prefix of the mirrored resource group on the store side.
pub(crate) const API_GROUP_PREFIX: &str = "apis/fleet/v1alpha1";

/// REST prefix of the execution substrate on the store side.
pub(crate) const SUBSTRATE_GROUP_PREFIX: &str = "apis/substrate/v1alpha1";
