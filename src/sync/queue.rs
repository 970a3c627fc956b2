use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::trace;

use crate::BackoffPolicy;
use crate::ObjectKey;

/// De-duplicating, rate-limited queue of cache keys.
///
/// Invariants:
/// - a key queued twice before being dequeued is handed out once;
/// - a key is never handed to two workers at the same time: while it is in
///   flight, re-adds park it in the dirty set and [`WorkQueue::done`]
///   re-queues it;
/// - [`WorkQueue::get`] returns `None` only after [`WorkQueue::shut_down`].
pub struct WorkQueue {
    state: Mutex<QueueState>,
    notify: Notify,
    backoff: BackoffPolicy,
}

#[derive(Default)]
struct QueueState {
    queue: VecDeque<ObjectKey>,
    /// Keys waiting to be processed, whether queued or parked behind an
    /// in-flight pass.
    dirty: HashSet<ObjectKey>,
    /// Keys currently handed to a worker.
    processing: HashSet<ObjectKey>,
    /// Rate-limited re-add history per key.
    requeues: HashMap<ObjectKey, u32>,
    shutting_down: bool,
}

impl WorkQueue {
    pub fn new(backoff: BackoffPolicy) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
            backoff,
        }
    }

    /// Enqueue a key. No-op when the key is already pending.
    pub fn add(&self, key: ObjectKey) {
        {
            let mut state = self.state.lock();
            if state.shutting_down {
                return;
            }
            if !state.dirty.insert(key.clone()) {
                return;
            }
            if state.processing.contains(&key) {
                // re-queued by done() once the in-flight pass finishes
                return;
            }
            state.queue.push_back(key);
        }
        self.notify.notify_one();
    }

    /// Dequeue the next key, waiting when the queue is empty. Marks the key
    /// in flight until [`WorkQueue::done`] is called for it.
    pub async fn get(&self) -> Option<ObjectKey> {
        loop {
            // Register for wakeups before checking state, so a notify that
            // lands in between is not lost.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut state = self.state.lock();
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Mark an in-flight key finished. A key that was re-added while in
    /// flight goes back on the queue.
    pub fn done(&self, key: &ObjectKey) {
        let requeue = {
            let mut state = self.state.lock();
            state.processing.remove(key);
            if state.dirty.contains(key) && !state.shutting_down {
                state.queue.push_back(key.clone());
                true
            } else {
                false
            }
        };
        if requeue {
            self.notify.notify_one();
        }
    }

    /// Re-add a key after a per-key exponential backoff, incrementing its
    /// requeue counter.
    pub fn add_rate_limited(self: &Arc<Self>, key: ObjectKey) {
        let delay = {
            let mut state = self.state.lock();
            if state.shutting_down {
                return;
            }
            let requeues = state.requeues.entry(key.clone()).or_insert(0);
            let delay = self.backoff.delay_for(*requeues);
            *requeues += 1;
            delay
        };
        trace!(key = %key, delay_ms = delay.as_millis() as u64, "rate-limited re-add");

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    /// Rate-limited re-add history of a key.
    pub fn num_requeues(&self, key: &ObjectKey) -> u32 {
        self.state.lock().requeues.get(key).copied().unwrap_or(0)
    }

    /// Clear the re-add history of a key, so a future failure starts from a
    /// fresh backoff.
    pub fn forget(&self, key: &ObjectKey) {
        self.state.lock().requeues.remove(key);
    }

    /// Stop accepting work and unpark every waiter. Keys already queued are
    /// still handed out; `get` returns `None` once the queue is drained.
    pub fn shut_down(&self) {
        self.state.lock().shutting_down = true;
        self.notify.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().queue.is_empty()
    }
}
