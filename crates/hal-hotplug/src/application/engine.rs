//! Hotplug Engine
//!
//! Main service implementing `HotplugApi`.
//!
//! Owns the event queue, the handler registry and the pending store, and
//! shares the global store with whoever observes committed devices. One
//! event is in flight at a time: `process_queue` takes the head, drives
//! it to a `DispatchOutcome`, ends it and takes the next. A concurrent
//! `process_queue` call that finds an event in flight returns at once and
//! leaves the draining to the caller already in the loop.
//!
//! The in-flight event is held by a `DispatchGuard`. Dropping the guard
//! ends the event, so a drain cancelled at the probe await (timeout,
//! task abort, a losing `select!` branch) or unwound by a panicking
//! handler still frees the queue and evicts the provisional record.

use crate::application::parent::resolve_parent;
use crate::config::HotplugConfig;
use crate::domain::event::{HotplugAction, HotplugEvent};
use crate::domain::outcome::{DiscardReason, DispatchOutcome, IgnoreReason};
use crate::domain::queue::{EventQueue, InFlightEvent};
use crate::ports::inbound::HotplugApi;
use crate::ports::outbound::{DeviceTreeReader, HelperInvoker, NoPropertyMerge, PropertyMerger};
use crate::registry::{AddRequest, DeviceHandler, HandlerRegistry};
use async_trait::async_trait;
use hal_device_store::{keys, Device, DeviceId, DeviceStore};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the store holding provisional records.
pub const PENDING_STORE: &str = "pending";
/// Name of the store holding committed records.
pub const GLOBAL_STORE: &str = "global";

/// Running totals of dispatch outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub committed: u64,
    pub removed: u64,
    pub ignored: u64,
    pub discarded: u64,
}

impl DispatchStats {
    fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Committed { .. } => self.committed += 1,
            DispatchOutcome::Removed { .. } => self.removed += 1,
            DispatchOutcome::Ignored(_) => self.ignored += 1,
            DispatchOutcome::Discarded(_) => self.discarded += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.committed + self.removed + self.ignored + self.discarded
    }
}

pub struct HotplugEngine {
    config: HotplugConfig,
    registry: HandlerRegistry,
    queue: Mutex<EventQueue>,
    pending: Mutex<DeviceStore>,
    /// Provisional record of the in-flight event, if it has one.
    provisional: Mutex<Option<DeviceId>>,
    global: Arc<Mutex<DeviceStore>>,
    tree: Arc<dyn DeviceTreeReader>,
    helpers: Arc<dyn HelperInvoker>,
    merger: Arc<dyn PropertyMerger>,
    stats: Mutex<DispatchStats>,
}

impl HotplugEngine {
    pub fn new(
        config: HotplugConfig,
        registry: HandlerRegistry,
        tree: Arc<dyn DeviceTreeReader>,
        helpers: Arc<dyn HelperInvoker>,
    ) -> Self {
        Self {
            config,
            registry,
            queue: Mutex::new(EventQueue::new()),
            pending: Mutex::new(DeviceStore::new(PENDING_STORE)),
            provisional: Mutex::new(None),
            global: Arc::new(Mutex::new(DeviceStore::new(GLOBAL_STORE))),
            tree,
            helpers,
            merger: Arc::new(NoPropertyMerge),
            stats: Mutex::new(DispatchStats::default()),
        }
    }

    pub fn with_property_merger(mut self, merger: Arc<dyn PropertyMerger>) -> Self {
        self.merger = merger;
        self
    }

    pub fn config(&self) -> &HotplugConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn tree(&self) -> Arc<dyn DeviceTreeReader> {
        Arc::clone(&self.tree)
    }

    /// Shared handle on the committed device store.
    pub fn global_store(&self) -> Arc<Mutex<DeviceStore>> {
        Arc::clone(&self.global)
    }

    /// Provisional records currently held. Zero whenever no event is in
    /// flight.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn stats(&self) -> DispatchStats {
        *self.stats.lock()
    }

    async fn dispatch(&self, event: &HotplugEvent) -> DispatchOutcome {
        if event.sysfs_path().as_os_str().is_empty() {
            return DispatchOutcome::Ignored(IgnoreReason::EmptyPath);
        }
        match event.action() {
            HotplugAction::Add => self.dispatch_add(event).await,
            HotplugAction::Remove => self.dispatch_remove(event),
        }
    }

    async fn dispatch_add(&self, event: &HotplugEvent) -> DispatchOutcome {
        // 1. Find the handler
        let Some(handler) = self.registry.lookup(event.subsystem()) else {
            return DispatchOutcome::Ignored(IgnoreReason::NoHandler);
        };

        // 2. Build the provisional record
        let Some(device) = self.build(handler, event) else {
            return DispatchOutcome::Ignored(IgnoreReason::NoDevice);
        };
        let id = device.id();
        let snapshot = device.clone();
        let added = self.pending.lock().add(device);
        if let Err(e) = added {
            warn!(
                error = %e,
                sysfs_path = %event.sysfs_path().display(),
                "Pending store refused record"
            );
            return DispatchOutcome::Discarded(DiscardReason::CommitRejected);
        }
        *self.provisional.lock() = Some(id);

        // 3. Probe, then let the handler vet the result
        if let Some(prober) = handler.prober() {
            if let Err(reason) = self.probe(handler, prober, id, &snapshot).await {
                return self.discard(id, reason);
            }
        }

        // 4. Merge static properties, compute identity and commit
        self.finalize(handler, id)
    }

    fn build(&self, handler: &dyn DeviceHandler, event: &HotplugEvent) -> Option<Device> {
        let global = self.global.lock();
        let resolution = resolve_parent(
            &self.config.sysfs_root,
            event.sysfs_path(),
            self.tree.as_ref(),
            &global,
        );
        let request = AddRequest {
            subsystem: event.subsystem(),
            sysfs_path: event.sysfs_path(),
            device_file: event.device_file(),
            parent: resolution.parent.and_then(|id| global.get(id)),
            origin: resolution.origin,
            tree: self.tree.as_ref(),
        };

        let mut device = handler.add(&request)?;
        if !device.has_property(keys::SYSFS_PATH_DEVICE) {
            device.set_string(keys::SYSFS_PATH_DEVICE, request.sysfs_path_string());
        }
        if !device.has_property(keys::SUBSYSTEM) {
            device.set_string(keys::SUBSYSTEM, event.subsystem());
        }
        Some(device)
    }

    async fn probe(
        &self,
        handler: &dyn DeviceHandler,
        prober: &str,
        id: DeviceId,
        snapshot: &Device,
    ) -> Result<(), DiscardReason> {
        let outcome = match self
            .helpers
            .invoke(prober, snapshot, self.config.helper_timeout())
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Probe helper could not run");
                return Err(DiscardReason::HelperSpawn);
            }
        };

        if outcome.timed_out {
            return Err(DiscardReason::HelperTimeout);
        }
        if outcome.exit_code != 0 {
            return Err(DiscardReason::HelperFailed {
                exit_code: outcome.exit_code,
            });
        }

        let mut pending = self.pending.lock();
        let Some(device) = pending.get_mut(id) else {
            return Err(DiscardReason::PostProbeRejected);
        };
        for (key, value) in outcome.properties {
            if keys::is_reserved(&key) {
                warn!(helper = prober, key = %key, "Ignoring helper update of reserved property");
                continue;
            }
            device.set_string(key, value);
        }
        if handler.post_probing(device) {
            Ok(())
        } else {
            Err(DiscardReason::PostProbeRejected)
        }
    }

    fn finalize(&self, handler: &dyn DeviceHandler, id: DeviceId) -> DispatchOutcome {
        let removed = self.take_provisional(id);
        let Some(mut device) = removed else {
            return DispatchOutcome::Discarded(DiscardReason::CommitRejected);
        };
        self.merger.merge(&mut device);

        let mut global = self.global.lock();
        if !handler.compute_udi(&mut device, &global) {
            return DispatchOutcome::Discarded(DiscardReason::NoIdentity);
        }
        let Some(udi) = device.udi().map(str::to_string) else {
            return DispatchOutcome::Discarded(DiscardReason::NoIdentity);
        };

        match global.add(device) {
            Ok(()) => DispatchOutcome::Committed { udi },
            Err(e) => {
                warn!(error = %e, "Global store refused record");
                DispatchOutcome::Discarded(DiscardReason::CommitRejected)
            }
        }
    }

    fn discard(&self, id: DeviceId, reason: DiscardReason) -> DispatchOutcome {
        self.take_provisional(id);
        DispatchOutcome::Discarded(reason)
    }

    /// Move the provisional record out of the pending store.
    fn take_provisional(&self, id: DeviceId) -> Option<Device> {
        let mut provisional = self.provisional.lock();
        if *provisional == Some(id) {
            *provisional = None;
        }
        self.pending.lock().remove(id)
    }

    fn dispatch_remove(&self, event: &HotplugEvent) -> DispatchOutcome {
        let path = event.sysfs_path().to_string_lossy();
        let mut global = self.global.lock();

        let Some(device) = global.match_key_value_string(keys::SYSFS_PATH_DEVICE, &path) else {
            warn!(sysfs_path = %path, "Removal for device that is not present");
            return DispatchOutcome::Ignored(IgnoreReason::NotFound);
        };
        let id = device.id();
        let udi = device.udi().map(str::to_string);

        let Some(handler) = self.registry.lookup(event.subsystem()) else {
            return DispatchOutcome::Ignored(IgnoreReason::NoHandler);
        };
        if !handler.remove(id, &mut global) {
            debug!(
                subsystem = event.subsystem(),
                sysfs_path = %path,
                "Handler reported removal failure"
            );
        }
        DispatchOutcome::Removed { udi }
    }

    fn log_outcome(event: &HotplugEvent, outcome: &DispatchOutcome) {
        let sysfs_path = event.sysfs_path().display();
        match outcome {
            DispatchOutcome::Committed { udi } => info!(
                subsystem = event.subsystem(),
                sysfs_path = %sysfs_path,
                udi = %udi,
                "Device added"
            ),
            DispatchOutcome::Removed { udi } => info!(
                subsystem = event.subsystem(),
                sysfs_path = %sysfs_path,
                udi = udi.as_deref().unwrap_or("-"),
                "Device removed"
            ),
            DispatchOutcome::Ignored(_) => debug!(
                subsystem = event.subsystem(),
                sysfs_path = %sysfs_path,
                outcome = %outcome,
                "Event ignored"
            ),
            DispatchOutcome::Discarded(_) => warn!(
                subsystem = event.subsystem(),
                sysfs_path = %sysfs_path,
                outcome = %outcome,
                "Device discarded"
            ),
        }
    }
}

#[async_trait]
impl HotplugApi for HotplugEngine {
    fn enqueue(&self, event: HotplugEvent) {
        debug!(event = %event, "Event queued");
        self.queue.lock().enqueue(event);
    }

    fn enqueue_batch(&self, events: Vec<HotplugEvent>) {
        debug!(count = events.len(), "Event batch queued");
        self.queue.lock().enqueue_all(events);
    }

    async fn process_queue(&self) -> usize {
        let mut dispatched = 0;
        loop {
            let ticket = self.queue.lock().begin_next();
            let Some(ticket) = ticket else {
                break;
            };
            let event = ticket.event().clone();
            let mut guard = DispatchGuard::new(self, ticket);

            let outcome = self.dispatch(&event).await;
            Self::log_outcome(&event, &outcome);
            self.stats.lock().record(&outcome);

            guard.settle();
            drop(guard);
            dispatched += 1;
        }
        dispatched
    }

    fn queued(&self) -> usize {
        self.queue.lock().len()
    }

    fn in_flight(&self) -> usize {
        self.queue.lock().in_flight_count()
    }
}

/// Owns the ticket of the in-flight event and ends it on drop.
struct DispatchGuard<'a> {
    engine: &'a HotplugEngine,
    ticket: Option<InFlightEvent>,
    settled: bool,
}

impl<'a> DispatchGuard<'a> {
    fn new(engine: &'a HotplugEngine, ticket: InFlightEvent) -> Self {
        Self {
            engine,
            ticket: Some(ticket),
            settled: false,
        }
    }

    /// Mark the dispatch as having reached an outcome.
    fn settle(&mut self) {
        self.settled = true;
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };

        if !self.settled {
            let provisional = self.engine.provisional.lock().take();
            if let Some(id) = provisional {
                self.engine.pending.lock().remove(id);
            }
            warn!(
                seq = ticket.seq(),
                event = %ticket.event(),
                "Dispatch abandoned before completion"
            );
        }

        self.engine.queue.lock().end(ticket);
    }
}
