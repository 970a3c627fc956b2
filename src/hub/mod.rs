//! Process-wide notification hub.
//!
//! Single point of fan-out from "something changed" producers to connected
//! subscribers. Publishing never blocks: each subscriber owns a bounded
//! channel and a full subscriber has the message dropped for that subscriber
//! only (at-most-once, best-effort delivery; FIFO per subscriber).


use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use tracing::trace;

use crate::HubConfig;

pub type SubscriberId = u64;

pub struct Hub {
    subscribers: DashMap<SubscriberId, mpsc::Sender<Bytes>>,
    next_id: AtomicU64,
    buffer: usize,
    dropped: AtomicU64,
}

impl Hub {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
            buffer: config.subscriber_buffer,
            dropped: AtomicU64::new(0),
        }
    }

    /// Create a subscriber channel and include it in fan-out.
    pub fn register(&self) -> (SubscriberId, mpsc::Receiver<Bytes>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.subscribers.insert(id, tx);
        debug!(subscriber = id, "subscriber registered");
        (id, rx)
    }

    /// Remove a subscriber from fan-out. Idempotent.
    pub fn unregister(&self, id: SubscriberId) {
        if self.subscribers.remove(&id).is_some() {
            debug!(subscriber = id, "subscriber unregistered");
        }
    }

    /// Fan a payload out to every current subscriber. Never blocks and never
    /// fails from the caller's perspective; slow or gone subscribers only
    /// lose their own copy.
    pub fn publish(&self, payload: Bytes) {
        let mut closed = Vec::new();
        for entry in self.subscribers.iter() {
            match entry.value().try_send(payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    trace!(subscriber = *entry.key(), "subscriber full, dropping notification");
                }
                Err(TrySendError::Closed(_)) => closed.push(*entry.key()),
            }
        }
        // removal deferred: dashmap entries must not be removed while iterating
        for id in closed {
            self.unregister(id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Notifications dropped because a subscriber's buffer was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
