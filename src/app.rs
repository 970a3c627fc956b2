//! Composition root.
//!
//! Owns every long-lived component — caches, work queues, controllers, the
//! hub and the dispatcher — and wires them together explicitly; there is no
//! ambient global state. The gateway only starts serving once both caches
//! have passed their sync barrier.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::error;
use tracing::info;

use crate::Cache;
use crate::Cleaning;
use crate::Controller;
use crate::Dispatcher;
use crate::Error;
use crate::Gateway;
use crate::GatewayContext;
use crate::Hub;
use crate::LogErrorSink;
use crate::NotifySyncer;
use crate::ResourceKind;
use crate::RestListWatch;
use crate::RestSubstrate;
use crate::Result;
use crate::Settings;
use crate::SystemError;
use crate::Vacuum;
use crate::WorkQueue;

pub struct App {
    gateway: Gateway,
    vacuum_controller: Arc<Controller<Vacuum>>,
    cleaning_controller: Arc<Controller<Cleaning>>,
    sync_timeout: Duration,
    shutdown: watch::Receiver<()>,
}

impl App {
    /// Construct every component from validated settings.
    pub fn build(settings: Settings, shutdown: watch::Receiver<()>) -> Result<Self> {
        settings.validate()?;

        let hub = Arc::new(Hub::new(&settings.hub));
        let vacuums = Arc::new(Cache::<Vacuum>::new());
        let cleanings = Arc::new(Cache::<Cleaning>::new());

        let vacuum_controller = Arc::new(Controller::new(
            vacuums.clone(),
            Arc::new(WorkQueue::new(settings.sync.retry)),
            Arc::new(RestListWatch::<Vacuum>::new(&settings.store)?),
            Arc::new(NotifySyncer::new(ResourceKind::Vacuums, hub.clone())),
            Arc::new(LogErrorSink),
            settings.sync.clone(),
        ));
        let cleaning_controller = Arc::new(Controller::new(
            cleanings.clone(),
            Arc::new(WorkQueue::new(settings.sync.retry)),
            Arc::new(RestListWatch::<Cleaning>::new(&settings.store)?),
            Arc::new(NotifySyncer::new(ResourceKind::Cleanings, hub.clone())),
            Arc::new(LogErrorSink),
            settings.sync.clone(),
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(RestSubstrate::new(&settings.store)?),
            &settings.dispatch,
        ));

        let context = Arc::new(GatewayContext {
            vacuums,
            cleanings,
            hub,
            dispatcher,
        });
        let gateway = Gateway::new(context, settings.gateway.clone());

        Ok(Self {
            gateway,
            vacuum_controller,
            cleaning_controller,
            sync_timeout: settings.sync.sync_timeout(),
            shutdown,
        })
    }

    /// Run until the shutdown signal. Serves HTTP only after both
    /// controllers report their caches synced; a controller that fails
    /// before its sync barrier aborts startup.
    pub async fn run(self) -> Result<()> {
        let (vacuum_ready, vacuum_ready_rx) = oneshot::channel();
        let (cleaning_ready, cleaning_ready_rx) = oneshot::channel();

        let vacuum_task = tokio::spawn(
            self.vacuum_controller
                .clone()
                .run(vacuum_ready, self.shutdown.clone()),
        );
        let cleaning_task = tokio::spawn(
            self.cleaning_controller
                .clone()
                .run(cleaning_ready, self.shutdown.clone()),
        );

        if vacuum_ready_rx.await.is_err() {
            return Err(startup_failure(vacuum_task, ResourceKind::Vacuums).await);
        }
        if cleaning_ready_rx.await.is_err() {
            return Err(startup_failure(cleaning_task, ResourceKind::Cleanings).await);
        }
        info!("caches synced, serving");

        self.gateway.serve(self.shutdown.clone()).await?;

        // bounded shutdown window for the controller loops
        for (kind, task) in [
            (ResourceKind::Vacuums, vacuum_task),
            (ResourceKind::Cleanings, cleaning_task),
        ] {
            match tokio::time::timeout(self.sync_timeout, task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(error))) => error!(kind = %kind, %error, "controller exited with error"),
                Ok(Err(join_error)) => error!(kind = %kind, error = %join_error, "controller task panicked"),
                Err(_) => error!(kind = %kind, "controller did not stop in time"),
            }
        }
        Ok(())
    }
}

/// Surface the underlying controller error when the cache-sync barrier was
/// never passed.
async fn startup_failure(task: JoinHandle<Result<()>>, kind: ResourceKind) -> Error {
    match task.await {
        Ok(Err(error)) => error,
        Ok(Ok(())) => Error::Fatal(format!("{} controller exited before cache sync", kind)),
        Err(join_error) => SystemError::TaskFailed(join_error).into(),
    }
}
