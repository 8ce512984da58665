//! Bus membership index.
//!
//! Every entry of `<root>/bus/<bus>/devices` is a symlink into the
//! physical device tree. Resolving them all gives a map from device
//! directory to the bus it is registered on.

use crate::domain::errors::ColdplugError;
use crate::domain::path::normalize_link;
use crate::ports::outbound::{DeviceTreeReader, TreeEntry};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BusMembershipIndex {
    buses: HashMap<PathBuf, String>,
}

impl BusMembershipIndex {
    /// Build the index from `<sysfs_root>/bus`.
    ///
    /// Any unreadable directory, or a `devices` entry that is not a
    /// symlink, fails the whole build.
    pub fn build(tree: &dyn DeviceTreeReader, sysfs_root: &Path) -> Result<Self, ColdplugError> {
        let bus_root = sysfs_root.join("bus");
        let mut buses = HashMap::new();

        for bus in list(tree, &bus_root)? {
            let bus_dir = bus_root.join(&bus.name);
            if !list(tree, &bus_dir)?.iter().any(|e| e.name == "devices") {
                continue;
            }

            let devices_dir = bus_dir.join("devices");
            for member in list(tree, &devices_dir)? {
                let link = devices_dir.join(&member.name);
                let target = tree
                    .read_link(&link)
                    .ok_or(ColdplugError::NotASymlink { path: link })?;
                buses.insert(normalize_link(&devices_dir, &target), bus.name.clone());
            }
        }

        debug!(entries = buses.len(), "Bus membership index built");
        Ok(Self { buses })
    }

    /// Bus the device directory at `path` is registered on.
    pub fn bus_for(&self, path: &Path) -> Option<&str> {
        self.buses.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.buses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }
}

fn list(tree: &dyn DeviceTreeReader, dir: &Path) -> Result<Vec<TreeEntry>, ColdplugError> {
    tree.list_children(dir).map_err(|e| ColdplugError::io(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MemoryDeviceTree;

    #[test]
    fn test_index_resolves_bus_links() {
        let tree = MemoryDeviceTree::new()
            .symlink(
                "/sys/bus/pci/devices/0000:00:1d.0",
                "../../../devices/pci0000:00/0000:00:1d.0",
            )
            .symlink(
                "/sys/bus/usb/devices/usb1",
                "../../../devices/pci0000:00/0000:00:1d.0/usb1",
            )
            .file("/sys/bus/usb/drivers_autoprobe", "1")
            .dir("/sys/bus/cpu");

        let index = BusMembershipIndex::build(&tree, Path::new("/sys")).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            index.bus_for(Path::new("/sys/devices/pci0000:00/0000:00:1d.0")),
            Some("pci")
        );
        assert_eq!(
            index.bus_for(Path::new("/sys/devices/pci0000:00/0000:00:1d.0/usb1")),
            Some("usb")
        );
        assert_eq!(index.bus_for(Path::new("/sys/devices/pci0000:00")), None);
    }

    #[test]
    fn test_non_symlink_member_fails() {
        let tree = MemoryDeviceTree::new().dir("/sys/bus/pci/devices/0000:00:1d.0");
        let err = BusMembershipIndex::build(&tree, Path::new("/sys")).unwrap_err();
        assert!(matches!(err, ColdplugError::NotASymlink { .. }));
    }

    #[test]
    fn test_missing_bus_root_fails() {
        let tree = MemoryDeviceTree::new().dir("/sys/devices");
        let err = BusMembershipIndex::build(&tree, Path::new("/sys")).unwrap_err();
        assert!(matches!(err, ColdplugError::Io { ref path, .. } if path == Path::new("/sys/bus")));
    }
}
