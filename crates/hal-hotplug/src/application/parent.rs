//! Parent resolution for add events.
//!
//! Where a device path sits under the sysfs root decides both its
//! `DeviceOrigin` and how its committed parent is found.

use crate::domain::path::normalize_link;
use crate::ports::outbound::DeviceTreeReader;
use crate::registry::DeviceOrigin;
use hal_device_store::{keys, DeviceId, DeviceStore};
use std::path::{Component, Path};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParentResolution {
    pub origin: DeviceOrigin,
    /// Committed parent record in the global store.
    pub parent: Option<DeviceId>,
}

impl ParentResolution {
    fn orphan(origin: DeviceOrigin) -> Self {
        Self {
            origin,
            parent: None,
        }
    }
}

pub fn resolve_parent(
    sysfs_root: &Path,
    sysfs_path: &Path,
    tree: &dyn DeviceTreeReader,
    global: &DeviceStore,
) -> ParentResolution {
    let Ok(relative) = sysfs_path.strip_prefix(sysfs_root) else {
        return ParentResolution::orphan(DeviceOrigin::Other);
    };
    let depth = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();

    match relative.components().next() {
        Some(Component::Normal(top)) if top == "devices" => ParentResolution {
            origin: DeviceOrigin::Physical,
            parent: closest_committed_ancestor(&sysfs_root.join("devices"), sysfs_path, global),
        },
        Some(Component::Normal(top)) if top == "class" => ParentResolution {
            origin: DeviceOrigin::Class,
            parent: if depth >= 3 {
                device_link_target(sysfs_path, tree, global)
            } else {
                None
            },
        },
        Some(Component::Normal(top)) if top == "block" => match depth {
            2 => ParentResolution {
                origin: DeviceOrigin::Block { partition: false },
                parent: device_link_target(sysfs_path, tree, global),
            },
            3 => ParentResolution {
                origin: DeviceOrigin::Block { partition: true },
                parent: sysfs_path
                    .parent()
                    .and_then(|disk| committed_at(disk, global)),
            },
            _ => ParentResolution::orphan(DeviceOrigin::Other),
        },
        _ => ParentResolution::orphan(DeviceOrigin::Other),
    }
}

fn committed_at(path: &Path, global: &DeviceStore) -> Option<DeviceId> {
    global
        .match_key_value_string(keys::SYSFS_PATH_DEVICE, &path.to_string_lossy())
        .map(|d| d.id())
}

/// Walk up from the device's parent directory, stopping at `devices_root`.
fn closest_committed_ancestor(
    devices_root: &Path,
    sysfs_path: &Path,
    global: &DeviceStore,
) -> Option<DeviceId> {
    sysfs_path
        .ancestors()
        .skip(1)
        .take_while(|ancestor| *ancestor != devices_root && ancestor.starts_with(devices_root))
        .find_map(|ancestor| committed_at(ancestor, global))
}

/// Committed record at the normalised target of `<sysfs_path>/device`.
fn device_link_target(
    sysfs_path: &Path,
    tree: &dyn DeviceTreeReader,
    global: &DeviceStore,
) -> Option<DeviceId> {
    let target = tree.read_link(&sysfs_path.join("device"))?;
    committed_at(&normalize_link(sysfs_path, &target), global)
}
