//! # HAL Daemon Runtime
//!
//! Wires the hotplug engine to the real sysfs tree and helper programs
//! and drives it for the lifetime of the daemon.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (file, then environment)
//! 2. Initialize logging
//! 3. Build the engine with the builtin handlers
//! 4. Coldplug: synthesize the startup batch and drain it
//! 5. Feed live events to the engine until shutdown
//!
//! A failed coldplug pass aborts startup. Nothing is enqueued in that case.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{LoggingConfig, RuntimeConfig, RuntimeConfigError};
pub use error::RuntimeError;
pub use logging::init_logging;

use hal_device_store::StoreEvent;
use hal_hotplug::{
    parse_uevent_with_device_root, ColdplugReport, ColdplugSynthesizer, HandlerRegistry,
    HotplugApi, HotplugEngine, HotplugEvent, ProcessHelperInvoker, SysfsReader,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// The daemon: one engine, one live event channel, one shutdown signal.
pub struct HaldRuntime {
    config: RuntimeConfig,
    engine: Arc<HotplugEngine>,
    /// Live event sender. Cloned out to notification sources.
    events_tx: mpsc::Sender<HotplugEvent>,
    /// Taken by the first call to `run`.
    events_rx: Mutex<Option<mpsc::Receiver<HotplugEvent>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl HaldRuntime {
    /// Runtime over the system sysfs tree and helper directory named in
    /// `config`.
    pub fn new(config: RuntimeConfig) -> Self {
        let hotplug = &config.hotplug;
        info!(
            sysfs_root = %hotplug.sysfs_root.display(),
            helper_dir = %hotplug.helper_dir.display(),
            "Creating HAL daemon runtime"
        );

        let engine = HotplugEngine::new(
            hotplug.clone(),
            HandlerRegistry::with_builtin_handlers(),
            Arc::new(SysfsReader::new()),
            Arc::new(ProcessHelperInvoker::new(hotplug.helper_dir.clone())),
        );
        Self::with_engine(config, engine)
    }

    /// Runtime around an already built engine.
    pub fn with_engine(config: RuntimeConfig, engine: HotplugEngine) -> Self {
        let capacity = config.hotplug.event_channel_capacity.max(1);
        let (events_tx, events_rx) = mpsc::channel(capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            config,
            engine: Arc::new(engine),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn engine(&self) -> Arc<HotplugEngine> {
        Arc::clone(&self.engine)
    }

    /// Run the coldplug pass and drain the resulting batch.
    pub async fn start(&self) -> Result<ColdplugReport, RuntimeError> {
        info!("Starting coldplug");

        // 1. Synthesize and enqueue; a failure leaves the queue untouched
        let report = ColdplugSynthesizer::for_engine(&self.engine).run(self.engine.as_ref())?;

        // 2. Dispatch the batch in order
        let dispatched = self.engine.process_queue().await;

        let stats = self.engine.stats();
        info!(
            synthesized = report.total(),
            dispatched,
            committed = stats.committed,
            discarded = stats.discarded,
            "Coldplug complete"
        );
        Ok(report)
    }

    /// Receive live events until shutdown. Returns the number of events
    /// dispatched by this loop.
    pub async fn run(&self) -> Result<usize, RuntimeError> {
        let events = self.events_rx.lock().take();
        let Some(mut events) = events else {
            return Err(RuntimeError::AlreadyRunning);
        };

        let mut shutdown = self.shutdown_rx.clone();
        if *shutdown.borrow_and_update() {
            return Ok(0);
        }

        info!("Event loop started");
        let mut dispatched = 0;
        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        break;
                    };

                    // Whatever arrived meanwhile joins the same drain
                    let mut batch = vec![event];
                    while let Ok(more) = events.try_recv() {
                        batch.push(more);
                    }
                    debug!(events = batch.len(), "Live events received");

                    self.engine.enqueue_batch(batch);
                    dispatched += self.engine.process_queue().await;
                }
                _ = shutdown.changed() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        info!(dispatched, "Event loop stopped");
        Ok(dispatched)
    }

    /// Hand a live event to the event loop.
    pub async fn submit(&self, event: HotplugEvent) -> Result<(), RuntimeError> {
        self.events_tx
            .send(event)
            .await
            .map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Parse a raw kernel uevent against the configured roots and submit it.
    pub async fn submit_uevent(&self, buf: &[u8]) -> Result<(), RuntimeError> {
        let hotplug = &self.config.hotplug;
        let event = match parse_uevent_with_device_root(buf, &hotplug.sysfs_root, &hotplug.device_root)
        {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Dropping malformed uevent");
                return Err(e.into());
            }
        };
        self.submit(event).await
    }

    pub fn event_sender(&self) -> mpsc::Sender<HotplugEvent> {
        self.events_tx.clone()
    }

    /// Log every commit and removal in the global store until shutdown.
    pub fn spawn_store_observer(&self) -> JoinHandle<()> {
        let mut store_events = self.engine.global_store().lock().subscribe();
        let mut shutdown = self.shutdown_rx.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = store_events.recv() => match event {
                        Ok(StoreEvent::Added { udi, sysfs_path, .. }) => {
                            debug!(udi = ?udi, sysfs_path = ?sysfs_path, "Device added");
                        }
                        Ok(StoreEvent::Removed { udi, sysfs_path, .. }) => {
                            debug!(udi = ?udi, sysfs_path = ?sysfs_path, "Device removed");
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Store observer lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = shutdown.changed() => break,
                }
            }
        })
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Signal the event loop and observers to stop.
    pub fn shutdown(&self) {
        info!("Initiating shutdown");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hal_hotplug::adapters::mock::{MemoryDeviceTree, ScriptedHelper};

    fn runtime(capacity: usize) -> HaldRuntime {
        let mut config = RuntimeConfig::default();
        config.hotplug.event_channel_capacity = capacity;
        let engine = HotplugEngine::new(
            config.hotplug.clone(),
            HandlerRegistry::with_builtin_handlers(),
            Arc::new(MemoryDeviceTree::new()),
            Arc::new(ScriptedHelper::new()),
        );
        HaldRuntime::with_engine(config, engine)
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let runtime = runtime(4);
        runtime.shutdown();

        assert_eq!(runtime.run().await.unwrap(), 0);
        assert!(matches!(runtime.run().await, Err(RuntimeError::AlreadyRunning)));
    }

    #[tokio::test]
    async fn test_submit_after_loop_exit_reports_closed_channel() {
        let runtime = runtime(4);
        runtime.shutdown();
        runtime.run().await.unwrap();

        let err = runtime
            .submit(HotplugEvent::add("input", "/sys/class/input/input0"))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::ChannelClosed));
    }

    #[tokio::test]
    async fn test_malformed_uevent_is_rejected() {
        let runtime = runtime(4);
        let err = runtime.submit_uevent(b"ACTION=add\0SUBSYSTEM=input\0").await.unwrap_err();
        assert!(matches!(err, RuntimeError::Uevent(_)));
    }

    #[test]
    fn test_shutdown_flag() {
        let runtime = runtime(1);
        assert!(!runtime.is_shutting_down());
        runtime.shutdown();
        assert!(runtime.is_shutting_down());
    }
}
