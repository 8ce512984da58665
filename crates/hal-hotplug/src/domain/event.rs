//! Hotplug events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Whether an event announces a device or its departure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HotplugAction {
    Add,
    Remove,
}

impl fmt::Display for HotplugAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HotplugAction::Add => write!(f, "add"),
            HotplugAction::Remove => write!(f, "remove"),
        }
    }
}

/// A unit of work for the serializer.
///
/// Immutable once built: the builders consume and return `self`, and the
/// queue only ever hands out shared references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotplugEvent {
    /// Subsystem tag, e.g. "input", "block", "pci".
    subsystem: String,
    /// Absolute device path; the identity key of the device.
    sysfs_path: PathBuf,
    action: HotplugAction,
    /// Special file hint, e.g. `/dev/input/event0`.
    device_file: Option<PathBuf>,
    /// Path of a device that must be committed first. Ordering metadata
    /// only; the serial queue does not consult it.
    wait_for_sysfs_path: Option<PathBuf>,
    net_ifindex: Option<i32>,
}

impl HotplugEvent {
    pub fn new(
        action: HotplugAction,
        subsystem: impl Into<String>,
        sysfs_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            subsystem: subsystem.into(),
            sysfs_path: sysfs_path.into(),
            action,
            device_file: None,
            wait_for_sysfs_path: None,
            net_ifindex: None,
        }
    }

    pub fn add(subsystem: impl Into<String>, sysfs_path: impl Into<PathBuf>) -> Self {
        Self::new(HotplugAction::Add, subsystem, sysfs_path)
    }

    pub fn remove(subsystem: impl Into<String>, sysfs_path: impl Into<PathBuf>) -> Self {
        Self::new(HotplugAction::Remove, subsystem, sysfs_path)
    }

    pub fn with_device_file(mut self, device_file: Option<PathBuf>) -> Self {
        self.device_file = device_file;
        self
    }

    pub fn waiting_for(mut self, path: Option<PathBuf>) -> Self {
        self.wait_for_sysfs_path = path;
        self
    }

    pub fn with_net_ifindex(mut self, ifindex: Option<i32>) -> Self {
        self.net_ifindex = ifindex;
        self
    }

    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    pub fn sysfs_path(&self) -> &Path {
        &self.sysfs_path
    }

    pub fn action(&self) -> HotplugAction {
        self.action
    }

    pub fn is_add(&self) -> bool {
        self.action == HotplugAction::Add
    }

    pub fn device_file(&self) -> Option<&Path> {
        self.device_file.as_deref()
    }

    pub fn wait_for_sysfs_path(&self) -> Option<&Path> {
        self.wait_for_sysfs_path.as_deref()
    }

    pub fn net_ifindex(&self) -> Option<i32> {
        self.net_ifindex
    }
}

impl fmt::Display for HotplugEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.action,
            self.subsystem,
            self.sysfs_path.display()
        )
    }
}
