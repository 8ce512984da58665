//! # Device Store
//!
//! Ordered, indexed collection of device records.
//!
//! Lookups are linear scans in insertion order; the first match wins.
//! Device counts on a single machine are small, and insertion order is
//! what makes "first match" deterministic when two records share a value.

use crate::device::{Device, DeviceId};
use crate::errors::StoreError;
use crate::DEFAULT_EVENT_CAPACITY;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Mutation notification emitted by a store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    Added {
        id: DeviceId,
        udi: Option<String>,
        sysfs_path: Option<String>,
    },
    Removed {
        id: DeviceId,
        udi: Option<String>,
        sysfs_path: Option<String>,
    },
}

impl StoreEvent {
    fn added(device: &Device) -> Self {
        StoreEvent::Added {
            id: device.id(),
            udi: device.udi().map(str::to_string),
            sysfs_path: device.sysfs_path().map(str::to_string),
        }
    }

    fn removed(device: &Device) -> Self {
        StoreEvent::Removed {
            id: device.id(),
            udi: device.udi().map(str::to_string),
            sysfs_path: device.sysfs_path().map(str::to_string),
        }
    }
}

/// An indexed collection of device records.
#[derive(Debug)]
pub struct DeviceStore {
    /// Name used in logs and errors ("pending", "global").
    name: &'static str,
    devices: Vec<Device>,
    events: broadcast::Sender<StoreEvent>,
}

impl DeviceStore {
    /// Create an empty store.
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, DEFAULT_EVENT_CAPACITY)
    }

    /// Create an empty store whose observers buffer `capacity` events.
    pub fn with_capacity(name: &'static str, capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            name,
            devices: Vec::new(),
            events,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Insert a record.
    ///
    /// Fails if the same record is already held, or if the record carries a
    /// UDI that another record in this store already uses.
    pub fn add(&mut self, device: Device) -> Result<(), StoreError> {
        if self.contains(device.id()) {
            return Err(StoreError::AlreadyPresent {
                id: device.id(),
                store: self.name,
            });
        }
        if let Some(udi) = device.udi() {
            if self.contains_udi(udi) {
                return Err(StoreError::UdiInUse {
                    udi: udi.to_string(),
                });
            }
        }

        debug!(
            store = self.name,
            id = %device.id(),
            udi = device.udi().unwrap_or("-"),
            "Device added"
        );
        // No observers is not an error.
        let _ = self.events.send(StoreEvent::added(&device));
        self.devices.push(device);
        Ok(())
    }

    /// Remove a record, returning it if it was present.
    pub fn remove(&mut self, id: DeviceId) -> Option<Device> {
        let index = self.devices.iter().position(|d| d.id() == id)?;
        let device = self.devices.remove(index);

        debug!(
            store = self.name,
            id = %device.id(),
            udi = device.udi().unwrap_or("-"),
            "Device removed"
        );
        let _ = self.events.send(StoreEvent::removed(&device));
        Some(device)
    }

    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id() == id)
    }

    pub fn get_mut(&mut self, id: DeviceId) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.id() == id)
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.iter().any(|d| d.id() == id)
    }

    pub fn find_by_udi(&self, udi: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.udi() == Some(udi))
    }

    pub fn contains_udi(&self, udi: &str) -> bool {
        self.find_by_udi(udi).is_some()
    }

    /// First record whose string property `key` equals `value`.
    pub fn match_key_value_string(&self, key: &str, value: &str) -> Option<&Device> {
        let found = self
            .devices
            .iter()
            .find(|d| d.get_string(key) == Some(value));
        trace!(store = self.name, key, value, found = found.is_some(), "Store lookup");
        found
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    /// Observe mutations of this store.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
