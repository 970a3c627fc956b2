use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::*;
use crate::BackoffPolicy;
use crate::EventStream;
use crate::Hub;
use crate::ListWatch;
use crate::HubConfig;
use crate::ObjectKey;
use crate::ObjectMeta;
use crate::StoreError;
use crate::SyncConfig;
use crate::SyncError;
use crate::Vacuum;
use crate::VacuumStatus;
use crate::WatchEvent;

fn vacuum(name: &str, battery: u32) -> Vacuum {
    Vacuum {
        metadata: ObjectMeta {
            namespace: "default".to_string(),
            name: name.to_string(),
            resource_version: None,
        },
        status: VacuumStatus {
            battery,
            ..Default::default()
        },
    }
}

/// Channel-driven stand-in for the store: a fixed initial listing plus a
/// hand-fed watch stream.
struct ChannelListWatch {
    initial: Vec<Vacuum>,
    events: Mutex<Option<mpsc::UnboundedReceiver<Result<WatchEvent<Vacuum>, StoreError>>>>,
}

impl ChannelListWatch {
    fn new(
        initial: Vec<Vacuum>,
    ) -> (
        Arc<Self>,
        mpsc::UnboundedSender<Result<WatchEvent<Vacuum>, StoreError>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                initial,
                events: Mutex::new(Some(rx)),
            }),
            tx,
        )
    }
}

#[async_trait]
impl ListWatch<Vacuum> for ChannelListWatch {
    async fn list(&self) -> Result<Vec<Vacuum>, StoreError> {
        Ok(self.initial.clone())
    }

    async fn watch(&self) -> Result<EventStream<Vacuum>, StoreError> {
        let rx = self.events.lock().take();
        match rx {
            Some(rx) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            // a second subscription hangs instead of spinning
            None => futures::future::pending().await,
        }
    }
}

/// Hands out a fixed sequence of watch streams, one per subscription.
struct SequencedListWatch {
    streams: Mutex<Vec<mpsc::UnboundedReceiver<Result<WatchEvent<Vacuum>, StoreError>>>>,
}

#[async_trait]
impl ListWatch<Vacuum> for SequencedListWatch {
    async fn list(&self) -> Result<Vec<Vacuum>, StoreError> {
        Ok(vec![])
    }

    async fn watch(&self) -> Result<EventStream<Vacuum>, StoreError> {
        let next = {
            let mut streams = self.streams.lock();
            if streams.is_empty() {
                None
            } else {
                Some(streams.remove(0))
            }
        };
        match next {
            Some(rx) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            None => futures::future::pending().await,
        }
    }
}

/// Never lists: for exercising the cache-sync deadline.
struct StuckListWatch;

#[async_trait]
impl ListWatch<Vacuum> for StuckListWatch {
    async fn list(&self) -> Result<Vec<Vacuum>, StoreError> {
        futures::future::pending().await
    }

    async fn watch(&self) -> Result<EventStream<Vacuum>, StoreError> {
        futures::future::pending().await
    }
}

/// Records every sync invocation; fails the first `failures` of them and
/// asserts per-key exclusivity while a pass is in flight.
struct RecordingSyncer {
    calls: AtomicU32,
    failures: u32,
    in_flight: AtomicU32,
    hold: Duration,
    seen: mpsc::UnboundedSender<ObjectKey>,
}

impl RecordingSyncer {
    fn new(failures: u32, hold: Duration) -> (Arc<Self>, mpsc::UnboundedReceiver<ObjectKey>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                calls: AtomicU32::new(0),
                failures,
                in_flight: AtomicU32::new(0),
                hold,
                seen: tx,
            }),
            rx,
        )
    }
}

#[async_trait]
impl Syncer for RecordingSyncer {
    async fn sync(&self, key: &ObjectKey) -> Result<(), SyncError> {
        assert_eq!(
            self.in_flight.fetch_add(1, Ordering::SeqCst),
            0,
            "two reconciliation passes ran concurrently for {}",
            key
        );
        if !self.hold.is_zero() {
            tokio::time::sleep(self.hold).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let _ = self.seen.send(key.clone());
        if call < self.failures {
            return Err(SyncError::Failed {
                key: key.clone(),
                reason: "injected".to_string(),
            });
        }
        Ok(())
    }
}

/// Captures terminally dropped keys.
struct RecordingSink {
    dropped: mpsc::UnboundedSender<ObjectKey>,
}

impl RecordingSink {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ObjectKey>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { dropped: tx }), rx)
    }
}

impl ErrorSink for RecordingSink {
    fn dropped(&self, _kind: crate::ResourceKind, key: &ObjectKey, _error: &SyncError) {
        let _ = self.dropped.send(key.clone());
    }
}

fn sync_config(concurrency: usize) -> SyncConfig {
    SyncConfig {
        concurrency,
        sync_timeout_ms: 1_000,
        resubscribe_delay_ms: 10,
        retry: BackoffPolicy {
            max_retries: 5,
            base_delay_ms: 5,
            max_delay_ms: 50,
        },
    }
}

struct Harness {
    controller: Arc<Controller<Vacuum>>,
    cache: Arc<Cache<Vacuum>>,
    queue: Arc<WorkQueue>,
    shutdown_tx: watch::Sender<()>,
}

fn harness(
    list_watch: Arc<dyn ListWatch<Vacuum>>,
    syncer: Arc<dyn Syncer>,
    sink: Arc<dyn ErrorSink>,
    concurrency: usize,
) -> Harness {
    let cache = Arc::new(Cache::new());
    let queue = Arc::new(WorkQueue::new(sync_config(concurrency).retry));
    let controller = Arc::new(Controller::new(
        cache.clone(),
        queue.clone(),
        list_watch,
        syncer,
        sink,
        sync_config(concurrency),
    ));
    let (shutdown_tx, _) = watch::channel(());
    Harness {
        controller,
        cache,
        queue,
        shutdown_tx,
    }
}

async fn recv_key(
    rx: &mut mpsc::UnboundedReceiver<ObjectKey>,
    what: &str,
) -> ObjectKey {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", what))
        .unwrap_or_else(|| panic!("channel closed waiting for {}", what))
}

#[tokio::test]
async fn initial_listing_is_applied_before_ready_fires() {
    let (list_watch, _events) = ChannelListWatch::new(vec![vacuum("robot-1", 50)]);
    let (syncer, mut seen) = RecordingSyncer::new(0, Duration::ZERO);
    let (sink, _) = RecordingSink::new();
    let h = harness(list_watch, syncer, sink, 1);

    let (ready_tx, ready_rx) = oneshot::channel();
    let task = tokio::spawn(
        h.controller
            .clone()
            .run(ready_tx, h.shutdown_tx.subscribe()),
    );

    ready_rx.await.unwrap();
    assert_eq!(h.cache.len(), 1);
    // the listed key is reconciled once
    assert_eq!(recv_key(&mut seen, "initial sync").await.as_str(), "default/robot-1");

    h.shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn cache_sync_deadline_is_a_fatal_startup_error() {
    let (syncer, _) = RecordingSyncer::new(0, Duration::ZERO);
    let (sink, _) = RecordingSink::new();
    let mut config = sync_config(1);
    config.sync_timeout_ms = 20;

    let cache = Arc::new(Cache::new());
    let queue = Arc::new(WorkQueue::new(config.retry));
    let controller = Arc::new(Controller::new(
        cache,
        queue,
        Arc::new(StuckListWatch),
        syncer,
        sink,
        config,
    ));
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let (ready_tx, ready_rx) = oneshot::channel();

    let result = controller.run(ready_tx, shutdown_rx).await;
    assert!(result.is_err());
    // ready never fired
    assert!(ready_rx.await.is_err());
    drop(shutdown_tx);
}

#[tokio::test]
async fn rapid_updates_collapse_to_the_latest_state() {
    let (list_watch, events) = ChannelListWatch::new(vec![]);
    let (syncer, mut seen) = RecordingSyncer::new(0, Duration::from_millis(5));
    let (sink, _) = RecordingSink::new();
    let h = harness(list_watch, syncer, sink, 1);

    let (ready_tx, ready_rx) = oneshot::channel();
    let task = tokio::spawn(
        h.controller
            .clone()
            .run(ready_tx, h.shutdown_tx.subscribe()),
    );
    ready_rx.await.unwrap();

    for battery in 0..50 {
        events
            .send(Ok(WatchEvent::Modified(vacuum("robot-1", battery))))
            .unwrap();
    }

    // quiescence: at least one pass saw the key; the cache then holds only
    // the final event's value
    recv_key(&mut seen, "first pass").await;
    let key = ObjectKey::new("default", "robot-1");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if h.cache.get(&key).map(|v| v.status.battery) == Some(49) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "cache never converged");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    h.shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn delete_events_remove_the_object_and_still_notify() {
    let (list_watch, events) = ChannelListWatch::new(vec![vacuum("robot-1", 50)]);
    let (syncer, mut seen) = RecordingSyncer::new(0, Duration::ZERO);
    let (sink, _) = RecordingSink::new();
    let h = harness(list_watch, syncer, sink, 1);

    let (ready_tx, ready_rx) = oneshot::channel();
    let task = tokio::spawn(
        h.controller
            .clone()
            .run(ready_tx, h.shutdown_tx.subscribe()),
    );
    ready_rx.await.unwrap();
    recv_key(&mut seen, "initial sync").await;

    events
        .send(Ok(WatchEvent::Deleted(vacuum("robot-1", 0))))
        .unwrap();

    assert_eq!(recv_key(&mut seen, "delete sync").await.as_str(), "default/robot-1");
    assert!(h.cache.get(&ObjectKey::new("default", "robot-1")).is_none());

    h.shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn failing_sync_is_retried_budget_times_then_dropped() {
    let (list_watch, _events) = ChannelListWatch::new(vec![vacuum("robot-1", 50)]);
    // fails more often than the budget allows
    let (syncer, mut seen) = RecordingSyncer::new(u32::MAX, Duration::ZERO);
    let (sink, mut dropped) = RecordingSink::new();
    let h = harness(list_watch, syncer.clone(), sink, 1);

    let (ready_tx, _ready_rx) = oneshot::channel();
    let task = tokio::spawn(
        h.controller
            .clone()
            .run(ready_tx, h.shutdown_tx.subscribe()),
    );

    let key = recv_key(&mut dropped, "terminal drop").await;
    assert_eq!(key.as_str(), "default/robot-1");
    // first attempt plus the five-retry budget
    assert_eq!(syncer.calls.load(Ordering::SeqCst), 6);

    // no further attempts after the drop
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(syncer.calls.load(Ordering::SeqCst), 6);
    drop(seen);

    h.shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn retry_counter_resets_after_an_interleaved_success() {
    let (list_watch, _events) = ChannelListWatch::new(vec![vacuum("robot-1", 50)]);
    // two failures, then success: stays within the budget
    let (syncer, mut seen) = RecordingSyncer::new(2, Duration::ZERO);
    let (sink, mut dropped) = RecordingSink::new();
    let h = harness(list_watch, syncer.clone(), sink, 1);

    let (ready_tx, _ready_rx) = oneshot::channel();
    let task = tokio::spawn(
        h.controller
            .clone()
            .run(ready_tx, h.shutdown_tx.subscribe()),
    );

    for _ in 0..3 {
        recv_key(&mut seen, "sync attempt").await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(syncer.calls.load(Ordering::SeqCst), 3);
    assert!(dropped.try_recv().is_err(), "nothing should be dropped");
    // the success forgot the rate-limit history for the key
    assert_eq!(h.queue.num_requeues(&ObjectKey::new("default", "robot-1")), 0);

    h.shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn same_key_never_syncs_concurrently_under_multiple_workers() {
    let (list_watch, events) = ChannelListWatch::new(vec![]);
    // RecordingSyncer asserts exclusivity internally
    let (syncer, mut seen) = RecordingSyncer::new(0, Duration::from_millis(3));
    let (sink, _) = RecordingSink::new();
    let h = harness(list_watch, syncer, sink, 4);

    let (ready_tx, ready_rx) = oneshot::channel();
    let task = tokio::spawn(
        h.controller
            .clone()
            .run(ready_tx, h.shutdown_tx.subscribe()),
    );
    ready_rx.await.unwrap();

    for battery in 0..30 {
        events
            .send(Ok(WatchEvent::Modified(vacuum("robot-1", battery))))
            .unwrap();
        if battery % 5 == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    recv_key(&mut seen, "first pass").await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    h.shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn watch_consumer_resubscribes_after_the_stream_ends() {
    let (first_tx, first_rx) = mpsc::unbounded_channel();
    let (second_tx, second_rx) = mpsc::unbounded_channel();
    let list_watch = Arc::new(SequencedListWatch {
        streams: Mutex::new(vec![first_rx, second_rx]),
    });
    let (syncer, mut seen) = RecordingSyncer::new(0, Duration::ZERO);
    let (sink, _) = RecordingSink::new();
    let h = harness(list_watch, syncer, sink, 1);

    let (ready_tx, ready_rx) = oneshot::channel();
    let task = tokio::spawn(
        h.controller
            .clone()
            .run(ready_tx, h.shutdown_tx.subscribe()),
    );
    ready_rx.await.unwrap();

    first_tx
        .send(Ok(WatchEvent::Modified(vacuum("robot-1", 10))))
        .unwrap();
    recv_key(&mut seen, "event on the first stream").await;
    drop(first_tx); // store hiccup: the stream ends

    // events on the replacement stream still flow through
    second_tx
        .send(Ok(WatchEvent::Modified(vacuum("robot-2", 20))))
        .unwrap();
    assert_eq!(
        recv_key(&mut seen, "event on the second stream").await.as_str(),
        "default/robot-2"
    );
    assert_eq!(h.cache.len(), 2);

    h.shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn notify_syncer_publishes_kind_namespace_name() {
    let hub = Arc::new(Hub::new(&HubConfig::default()));
    let (_id, mut rx) = hub.register();
    let syncer = NotifySyncer::new(crate::ResourceKind::Vacuums, hub);

    syncer
        .sync(&ObjectKey::new("default", "robot-1"))
        .await
        .unwrap();

    assert_eq!(rx.recv().await.unwrap(), Bytes::from_static(b"vacuums/default/robot-1"));
}
