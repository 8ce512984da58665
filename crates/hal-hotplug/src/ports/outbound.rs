//! Outbound (Driven) ports for the hotplug subsystem.
//!
//! Narrow contracts with the collaborators the pipeline consumes:
//!
//! | Port | Production | Testing |
//! |------|------------|---------|
//! | `DeviceTreeReader` | `SysfsReader` | `MemoryDeviceTree` |
//! | `HelperInvoker` | `ProcessHelperInvoker` | `ScriptedHelper` |
//! | `PropertyMerger` | `NoPropertyMerge` | `NoPropertyMerge` |

use crate::domain::errors::ProbeError;
use async_trait::async_trait;
use hal_device_store::Device;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Kind of a node in the device tree, as seen without following symlinks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Other,
}

/// One child of a device tree directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub kind: FileKind,
}

impl TreeEntry {
    pub fn new(name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Query surface over the sysfs-like device tree.
pub trait DeviceTreeReader: Send + Sync {
    /// Children of the directory at `path`, in a stable order.
    fn list_children(&self, path: &Path) -> io::Result<Vec<TreeEntry>>;

    /// Raw target of the symlink at `path`; `None` if it is not a symlink
    /// or cannot be read.
    fn read_link(&self, path: &Path) -> Option<PathBuf>;

    /// Contents of attribute `name` inside directory `dir`, trailing
    /// whitespace trimmed.
    fn read_attribute(&self, dir: &Path, name: &str) -> Option<String>;
}

/// How a probe helper run ended.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct HelperOutcome {
    pub timed_out: bool,
    pub exit_code: i32,
    /// `key=value` property updates reported by the helper.
    pub properties: Vec<(String, String)>,
}

impl HelperOutcome {
    pub fn success() -> Self {
        Self::default()
    }

    pub fn exited(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Self::default()
        }
    }

    pub fn timeout() -> Self {
        Self {
            timed_out: true,
            exit_code: -1,
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }

    /// A timeout counts as failure whatever the exit code says.
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Runs external probe helpers against a provisional record.
///
/// The returned future resolves exactly once, with the exit status or
/// the timeout flag, whichever comes first.
#[async_trait]
pub trait HelperInvoker: Send + Sync {
    async fn invoke(
        &self,
        helper: &str,
        device: &Device,
        timeout: Duration,
    ) -> Result<HelperOutcome, ProbeError>;
}

/// Merges externally supplied static properties into a record before
/// its identity is computed.
pub trait PropertyMerger: Send + Sync {
    fn merge(&self, device: &mut Device);
}

/// Merger for deployments without static property files.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPropertyMerge;

impl PropertyMerger for NoPropertyMerge {
    fn merge(&self, _device: &mut Device) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_outcome_success_rules() {
        assert!(HelperOutcome::success().succeeded());
        assert!(!HelperOutcome::exited(1).succeeded());

        let timed_out = HelperOutcome {
            timed_out: true,
            exit_code: 0,
            properties: Vec::new(),
        };
        assert!(!timed_out.succeeded());
        assert!(!HelperOutcome::timeout().succeeded());
    }

    #[test]
    fn test_no_property_merge_leaves_record_untouched() {
        let mut d = Device::new();
        d.set_string("info.category", "input");
        let before = d.clone();

        NoPropertyMerge.merge(&mut d);
        assert_eq!(d, before);
    }
}
