use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::Cache;
use super::WorkQueue;
use crate::Hub;
use crate::ListWatch;
use crate::ObjectKey;
use crate::ResourceKind;
use crate::Result;
use crate::SyncConfig;
use crate::SyncError;
use crate::WatchEvent;
use crate::WatchedResource;

/// Resource-specific synchronization callback, invoked once per dequeued
/// key. May block, may fail; failures are retried by the worker with the
/// queue's backoff.
#[async_trait]
pub trait Syncer: Send + Sync + 'static {
    async fn sync(&self, key: &ObjectKey) -> std::result::Result<(), SyncError>;
}

/// Production syncer: publishes `"<kind>/<namespace>/<name>"` to the hub so
/// clients re-fetch the object.
pub struct NotifySyncer {
    kind: ResourceKind,
    hub: Arc<Hub>,
}

impl NotifySyncer {
    pub fn new(kind: ResourceKind, hub: Arc<Hub>) -> Self {
        Self { kind, hub }
    }
}

#[async_trait]
impl Syncer for NotifySyncer {
    async fn sync(&self, key: &ObjectKey) -> std::result::Result<(), SyncError> {
        let notify_key = format!("{}/{}", self.kind, key);
        debug!(notify_key = %notify_key, "received update");
        self.hub.publish(Bytes::from(notify_key));
        Ok(())
    }
}

/// Out-of-band sink for keys dropped after the retry budget is exhausted.
/// Never fatal to the process.
pub trait ErrorSink: Send + Sync + 'static {
    fn dropped(&self, kind: ResourceKind, key: &ObjectKey, error: &SyncError);
}

pub struct LogErrorSink;

impl ErrorSink for LogErrorSink {
    fn dropped(&self, kind: ResourceKind, key: &ObjectKey, error: &SyncError) {
        error!(kind = %kind, key = %key, %error, "dropping key out of the queue");
    }
}

/// Drives one resource kind's watch stream into the local cache and converts
/// every observed mutation into queued reconciliation work.
pub struct Controller<R: WatchedResource> {
    cache: Arc<Cache<R>>,
    queue: Arc<WorkQueue>,
    list_watch: Arc<dyn ListWatch<R>>,
    syncer: Arc<dyn Syncer>,
    error_sink: Arc<dyn ErrorSink>,
    config: SyncConfig,
}

impl<R: WatchedResource> Controller<R> {
    pub fn new(
        cache: Arc<Cache<R>>,
        queue: Arc<WorkQueue>,
        list_watch: Arc<dyn ListWatch<R>>,
        syncer: Arc<dyn Syncer>,
        error_sink: Arc<dyn ErrorSink>,
        config: SyncConfig,
    ) -> Self {
        Self {
            cache,
            queue,
            list_watch,
            syncer,
            error_sink,
            config,
        }
    }

    pub fn cache(&self) -> Arc<Cache<R>> {
        self.cache.clone()
    }

    /// Run the controller until shutdown.
    ///
    /// Blocks on the cache-sync barrier first: the initial full listing must
    /// be applied within the startup deadline, otherwise this returns a
    /// fatal error and `ready` is dropped unsent. After the barrier, `ready`
    /// fires and the watch consumer plus `concurrency` worker loops run
    /// until the shutdown signal.
    pub async fn run(
        self: Arc<Self>,
        ready: oneshot::Sender<()>,
        mut shutdown: watch::Receiver<()>,
    ) -> Result<()> {
        info!(kind = %R::KIND, "starting controller");
        self.wait_for_cache_sync(&mut shutdown).await?;
        let _ = ready.send(());

        let mut handles = Vec::new();
        {
            let controller = self.clone();
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                controller.consume_watch(shutdown).await;
            }));
        }
        for worker_id in 0..self.config.concurrency {
            let controller = self.clone();
            handles.push(tokio::spawn(async move {
                controller.worker(worker_id).await;
            }));
        }

        let _ = shutdown.changed().await;
        info!(kind = %R::KIND, "stopping controller");
        // Shut the queue down only after shutdown has been signaled, so
        // workers parked on an empty queue observe the sentinel.
        self.queue.shut_down();
        for handle in handles {
            if let Err(e) = handle.await {
                error!(kind = %R::KIND, error = %e, "controller task failed");
            }
        }
        Ok(())
    }

    /// Cache-sync barrier: apply the initial full listing before trusting
    /// incremental events. Every listed key is enqueued once so subscribers
    /// connected at startup see the current state.
    async fn wait_for_cache_sync(&self, shutdown: &mut watch::Receiver<()>) -> Result<()> {
        let listing = tokio::select! {
            _ = shutdown.changed() => return Err(SyncError::CacheSyncTimeout.into()),
            listing = tokio::time::timeout(self.config.sync_timeout(), self.list_watch.list()) => listing,
        };
        let objects = listing
            .map_err(|_| SyncError::CacheSyncTimeout)?
            .map_err(SyncError::InitialList)?;

        info!(kind = %R::KIND, objects = objects.len(), "cache synced");
        for object in objects {
            let key = object.key();
            self.cache.insert(object);
            self.queue.add(key);
        }
        Ok(())
    }

    /// Watch stream consumer. Fast path only: applies the event to the cache
    /// and enqueues the key, never blocking on downstream processing. Ended
    /// or failed streams are re-established after a pause.
    async fn consume_watch(self: Arc<Self>, mut shutdown: watch::Receiver<()>) {
        loop {
            let mut stream = tokio::select! {
                _ = shutdown.changed() => return,
                result = self.list_watch.watch() => match result {
                    Ok(stream) => stream,
                    Err(e) => {
                        warn!(kind = %R::KIND, error = %e, "watch failed, re-subscribing");
                        tokio::select! {
                            _ = shutdown.changed() => return,
                            _ = tokio::time::sleep(self.config.resubscribe_delay()) => continue,
                        }
                    }
                },
            };

            loop {
                tokio::select! {
                    _ = shutdown.changed() => return,
                    event = stream.next() => match event {
                        Some(Ok(event)) => self.apply_event(event),
                        Some(Err(e)) => {
                            warn!(kind = %R::KIND, error = %e, "watch stream error");
                            break;
                        }
                        None => {
                            debug!(kind = %R::KIND, "watch stream ended");
                            break;
                        }
                    },
                }
            }
        }
    }

    fn apply_event(&self, event: WatchEvent<R>) {
        match event {
            WatchEvent::Added(object) | WatchEvent::Modified(object) => {
                let key = object.key();
                self.cache.insert(object);
                self.queue.add(key);
            }
            WatchEvent::Deleted(object) => {
                // key derivation works on torn-down objects, metadata only
                let key = object.key();
                self.cache.remove(&key);
                self.queue.add(key);
            }
        }
    }

    /// Worker loop: exits when the queue hands out the shutdown sentinel.
    async fn worker(self: Arc<Self>, worker_id: usize) {
        debug!(kind = %R::KIND, worker_id, "worker started");
        while let Some(key) = self.queue.get().await {
            let result = self.syncer.sync(&key).await;
            self.finish(&key, result);
        }
        debug!(kind = %R::KIND, worker_id, "worker stopped");
    }

    /// Retry bookkeeping for one finished reconciliation pass.
    fn finish(&self, key: &ObjectKey, result: std::result::Result<(), SyncError>) {
        match result {
            Ok(()) => self.queue.forget(key),
            Err(error) => {
                if (self.queue.num_requeues(key) as usize) < self.config.retry.max_retries {
                    info!(kind = %R::KIND, key = %key, %error, "error syncing, will retry");
                    self.queue.add_rate_limited(key.clone());
                } else {
                    self.queue.forget(key);
                    self.error_sink.dropped(R::KIND, key, &error);
                }
            }
        }
        self.queue.done(key);
    }
}
