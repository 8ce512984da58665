//! # Device Handler Contract
//!
//! One implementation per subsystem. The engine drives every add event
//! through the same protocol:
//!
//! ```text
//! add() ──→ [pending] ──prober?──→ post_probing() ──→ compute_udi() ──→ [global]
//! ```
//!
//! Removal only calls `remove()` on the handler registered for the
//! event's subsystem.

use crate::ports::outbound::DeviceTreeReader;
use hal_device_store::{unique_udi, Device, DeviceId, DeviceStore};
use std::path::Path;
use tracing::warn;

/// Where a device sits in the device tree, which decides how its parent
/// was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceOrigin {
    /// Under `<root>/devices`: a physical or bus device.
    Physical,
    /// Under `<root>/class/<class>`.
    Class,
    /// Under `<root>/block`.
    Block { partition: bool },
    Other,
}

/// Everything a handler's `add` may look at.
pub struct AddRequest<'a> {
    pub subsystem: &'a str,
    pub sysfs_path: &'a Path,
    pub device_file: Option<&'a Path>,
    /// Committed parent record, resolved before dispatch.
    pub parent: Option<&'a Device>,
    pub origin: DeviceOrigin,
    pub tree: &'a dyn DeviceTreeReader,
}

impl AddRequest<'_> {
    /// UDI of the resolved parent, if any.
    pub fn parent_udi(&self) -> Option<&str> {
        self.parent.and_then(Device::udi)
    }

    pub fn sysfs_path_string(&self) -> String {
        self.sysfs_path.to_string_lossy().into_owned()
    }
}

/// Capability interface implemented once per subsystem.
pub trait DeviceHandler: Send + Sync {
    /// Registry key. Must be unique within a registry.
    fn subsystem(&self) -> &str;

    /// Build a provisional record, or `None` if there is nothing to add.
    fn add(&self, request: &AddRequest<'_>) -> Option<Device>;

    /// Name of the external probe helper, if the subsystem needs one.
    fn prober(&self) -> Option<&str> {
        None
    }

    /// Runs only after a successful probe. `false` discards the record.
    fn post_probing(&self, _device: &mut Device) -> bool {
        true
    }

    /// Assign the record's UDI. `global` is the committed store, for
    /// uniqueness checks.
    fn compute_udi(&self, device: &mut Device, global: &DeviceStore) -> bool;

    /// Evict a committed record.
    fn remove(&self, id: DeviceId, global: &mut DeviceStore) -> bool {
        if global.remove(id).is_none() {
            warn!(subsystem = self.subsystem(), id = %id, "Error removing device");
        }
        true
    }
}

/// `<parent udi>_<suffix>`, made unique against `global`.
///
/// Fails when the record has no parent link.
pub(crate) fn assign_child_udi(device: &mut Device, global: &DeviceStore, suffix: &str) -> bool {
    let Some(parent) = device.parent_udi() else {
        return false;
    };
    let udi = unique_udi(global, &format!("{parent}_{suffix}"));
    device.set_udi(udi);
    true
}
