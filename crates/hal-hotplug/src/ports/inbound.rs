//! Inbound (Driving) ports.
//!
//! What event producers (coldplug, the live notification adapter) and the
//! daemon's main loop see of the hotplug engine.

use crate::domain::event::HotplugEvent;
use async_trait::async_trait;

#[async_trait]
pub trait HotplugApi: Send + Sync {
    /// Append an event to the tail of the queue. Never blocks.
    fn enqueue(&self, event: HotplugEvent);

    /// Append a batch, keeping its order contiguous in the queue.
    fn enqueue_batch(&self, events: Vec<HotplugEvent>);

    /// Drain the queue one event at a time.
    ///
    /// Returns immediately if another caller already has an event in
    /// flight; that caller picks up whatever is queued behind it. Returns
    /// the number of events this call dispatched.
    async fn process_queue(&self) -> usize;

    /// Events waiting to be dispatched.
    fn queued(&self) -> usize;

    /// Events currently being dispatched (0 or 1).
    fn in_flight(&self) -> usize;
}
