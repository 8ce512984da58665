//! Configuration for the hotplug pipeline

use crate::domain::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Hotplug configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotplugConfig {
    /// Mount point of the device tree
    pub sysfs_root: PathBuf,
    /// Directory holding device special files
    pub device_root: PathBuf,
    /// Directory searched for probe helpers given by bare name
    pub helper_dir: PathBuf,
    /// Wall-clock limit for one probe helper run (milliseconds)
    pub helper_timeout_ms: u64,
    /// Capacity of the runtime's event submission channel
    pub event_channel_capacity: usize,
}

impl Default for HotplugConfig {
    fn default() -> Self {
        Self {
            sysfs_root: PathBuf::from("/sys"),
            device_root: PathBuf::from("/dev"),
            helper_dir: PathBuf::from("/usr/libexec"),
            helper_timeout_ms: 10_000,
            event_channel_capacity: 1000,
        }
    }
}

impl HotplugConfig {
    pub fn helper_timeout(&self) -> Duration {
        Duration::from_millis(self.helper_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sysfs_root.is_absolute() {
            return Err(ConfigError::RelativeSysfsRoot(self.sysfs_root.clone()));
        }
        if self.helper_timeout_ms == 0 {
            return Err(ConfigError::ZeroHelperTimeout);
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }
        Ok(())
    }
}
