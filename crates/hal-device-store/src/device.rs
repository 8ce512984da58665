//! # Device Record
//!
//! A device is a bag of typed properties plus two identities:
//!
//! - `DeviceId`: process-unique handle assigned at construction, used by
//!   the stores to find the record while it has no UDI yet.
//! - UDI: the stable identifier assigned by the subsystem handler's
//!   identity computation, only present once the record is ready to be
//!   committed to the global store.

use crate::property::PropertyValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Well-known property keys used by the hotplug pipeline.
pub mod keys {
    /// Originating device path; the join key for removal and parent lookup.
    pub const SYSFS_PATH_DEVICE: &str = "linux.sysfs_path_device";
    /// Subsystem tag of the event that created the record.
    pub const SUBSYSTEM: &str = "linux.subsystem";
    /// UDI of the parent device.
    pub const INFO_PARENT: &str = "info.parent";
    pub const INFO_UDI: &str = "info.udi";
    pub const INFO_CATEGORY: &str = "info.category";
    pub const INFO_CAPABILITIES: &str = "info.capabilities";

    /// Keys maintained by the daemon itself. Probe helpers may not set them.
    pub const RESERVED: &[&str] = &[
        SYSFS_PATH_DEVICE,
        SUBSYSTEM,
        INFO_PARENT,
        INFO_UDI,
        INFO_CAPABILITIES,
    ];

    pub fn is_reserved(key: &str) -> bool {
        RESERVED.contains(&key)
    }
}

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle of a device record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceId(u64);

impl DeviceId {
    fn next() -> Self {
        DeviceId(NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dev#{}", self.0)
    }
}

/// A device record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Device {
    id: DeviceId,
    udi: Option<String>,
    properties: BTreeMap<String, PropertyValue>,
}

impl Device {
    /// Create an empty record with a fresh handle and no UDI.
    pub fn new() -> Self {
        Self {
            id: DeviceId::next(),
            udi: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// The stable identifier, once identity computation has run.
    pub fn udi(&self) -> Option<&str> {
        self.udi.as_deref()
    }

    /// Assign the UDI and mirror it into `info.udi`.
    pub fn set_udi(&mut self, udi: impl Into<String>) {
        let udi = udi.into();
        self.properties
            .insert(keys::INFO_UDI.to_string(), PropertyValue::String(udi.clone()));
        self.udi = Some(udi);
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        self.properties.remove(key)
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.properties
            .insert(key.into(), PropertyValue::String(value.into()));
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_str)
    }

    pub fn set_int(&mut self, key: impl Into<String>, value: i32) {
        self.properties.insert(key.into(), PropertyValue::Int(value));
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.properties.get(key) {
            Some(PropertyValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.properties.insert(key.into(), PropertyValue::Bool(value));
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.properties.get(key) {
            Some(PropertyValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn set_strlist(&mut self, key: impl Into<String>, items: Vec<String>) {
        self.properties
            .insert(key.into(), PropertyValue::StrList(items));
    }

    /// Append `capability` to `info.capabilities` unless already present.
    ///
    /// A non-list value under the key is replaced.
    pub fn add_capability(&mut self, capability: &str) {
        let entry = self
            .properties
            .entry(keys::INFO_CAPABILITIES.to_string())
            .or_insert_with(|| PropertyValue::StrList(Vec::new()));

        match entry {
            PropertyValue::StrList(items) => {
                if !items.iter().any(|c| c == capability) {
                    items.push(capability.to_string());
                }
            }
            other => *other = PropertyValue::StrList(vec![capability.to_string()]),
        }
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        matches!(
            self.properties.get(keys::INFO_CAPABILITIES),
            Some(PropertyValue::StrList(items)) if items.iter().any(|c| c == capability)
        )
    }

    /// Originating device path, if stamped.
    pub fn sysfs_path(&self) -> Option<&str> {
        self.get_string(keys::SYSFS_PATH_DEVICE)
    }

    pub fn subsystem(&self) -> Option<&str> {
        self.get_string(keys::SUBSYSTEM)
    }

    /// UDI of the parent device, if linked.
    pub fn parent_udi(&self) -> Option<&str> {
        self.get_string(keys::INFO_PARENT)
    }

    /// Iterate properties in key order.
    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::new()
    }
}
