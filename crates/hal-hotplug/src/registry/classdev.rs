//! Class device handlers: input and bluetooth.

use super::handler::{assign_child_udi, AddRequest, DeviceHandler, DeviceOrigin};
use hal_device_store::{keys, Device, DeviceStore, ROOT_UDI};

/// Probe helper run against every new input device.
pub const INPUT_PROBER: &str = "hald-probe-input";

/// Input devices. Parented to their physical device, or to the computer
/// when the kernel gives them none.
#[derive(Debug, Default, Clone, Copy)]
pub struct InputHandler;

impl DeviceHandler for InputHandler {
    fn subsystem(&self) -> &str {
        "input"
    }

    fn add(&self, request: &AddRequest<'_>) -> Option<Device> {
        let mut d = Device::new();
        d.set_string(keys::SYSFS_PATH_DEVICE, request.sysfs_path_string());

        match request.parent_udi() {
            Some(parent) => {
                d.set_string("input.physical_device", parent);
                d.set_string(keys::INFO_PARENT, parent);
            }
            None => d.set_string(keys::INFO_PARENT, ROOT_UDI),
        }

        d.set_string(keys::INFO_CATEGORY, "input");
        d.add_capability("input");

        if let Some(device_file) = request.device_file {
            d.set_string("input.device", device_file.to_string_lossy());
        }

        Some(d)
    }

    fn prober(&self) -> Option<&str> {
        Some(INPUT_PROBER)
    }

    fn compute_udi(&self, device: &mut Device, global: &DeviceStore) -> bool {
        assign_child_udi(device, global, "logicaldev_input")
    }
}

/// Bluetooth host controllers. Only class devices with a physical parent
/// are added.
#[derive(Debug, Default, Clone, Copy)]
pub struct BluetoothHandler;

impl DeviceHandler for BluetoothHandler {
    fn subsystem(&self) -> &str {
        "bluetooth"
    }

    fn add(&self, request: &AddRequest<'_>) -> Option<Device> {
        if request.origin != DeviceOrigin::Class {
            return None;
        }
        let parent = request.parent_udi()?;

        let mut d = Device::new();
        d.set_string(keys::SYSFS_PATH_DEVICE, request.sysfs_path_string());
        d.set_string(keys::INFO_PARENT, parent);
        d.set_string(keys::INFO_CATEGORY, "bluetooth_hci");
        d.add_capability("bluetooth_hci");
        d.set_string("bluetooth_hci.physical_device", parent);

        if let Some(name) = request.tree.read_attribute(request.sysfs_path, "name") {
            d.set_string("bluetooth_hci.interface_name", name);
        }

        Some(d)
    }

    fn compute_udi(&self, device: &mut Device, global: &DeviceStore) -> bool {
        assign_child_udi(device, global, "bluetooth_hci")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::MemoryDeviceTree;
    use std::path::Path;

    fn physical_parent() -> Device {
        let mut p = Device::new();
        p.set_udi("/org/freedesktop/Hal/devices/usb_device_46d_c01d");
        p
    }

    fn request<'a>(
        subsystem: &'a str,
        path: &'a Path,
        parent: Option<&'a Device>,
        tree: &'a MemoryDeviceTree,
    ) -> AddRequest<'a> {
        AddRequest {
            subsystem,
            sysfs_path: path,
            device_file: None,
            parent,
            origin: DeviceOrigin::Class,
            tree,
        }
    }

    #[test]
    fn test_input_without_parent_hangs_off_computer() {
        let tree = MemoryDeviceTree::new();
        let path = Path::new("/sys/class/input/input0");
        let d = InputHandler
            .add(&request("input", path, None, &tree))
            .unwrap();

        assert_eq!(d.parent_udi(), Some(ROOT_UDI));
        assert_eq!(d.sysfs_path(), Some("/sys/class/input/input0"));
        assert!(d.has_capability("input"));
        assert!(!d.has_property("input.physical_device"));
    }

    #[test]
    fn test_input_with_parent_links_physical_device() {
        let tree = MemoryDeviceTree::new();
        let parent = physical_parent();
        let path = Path::new("/sys/class/input/input1");
        let mut req = request("input", path, Some(&parent), &tree);
        req.device_file = Some(Path::new("/dev/input/event1"));

        let d = InputHandler.add(&req).unwrap();

        assert_eq!(d.parent_udi(), parent.udi());
        assert_eq!(d.get_string("input.physical_device"), parent.udi());
        assert_eq!(d.get_string("input.device"), Some("/dev/input/event1"));
    }

    #[test]
    fn test_input_udi_is_unique_per_parent() {
        let tree = MemoryDeviceTree::new();
        let mut global = DeviceStore::new("global");

        for n in 0..2 {
            let path = format!("/sys/class/input/input{n}");
            let mut d = InputHandler
                .add(&request("input", Path::new(&path), None, &tree))
                .unwrap();
            assert!(InputHandler.compute_udi(&mut d, &global));
            global.add(d).unwrap();
        }

        assert!(global.contains_udi("/org/freedesktop/Hal/devices/computer_logicaldev_input"));
        assert!(global.contains_udi("/org/freedesktop/Hal/devices/computer_logicaldev_input_0"));
    }

    #[test]
    fn test_bluetooth_requires_parent() {
        let tree = MemoryDeviceTree::new();
        let path = Path::new("/sys/class/bluetooth/hci0");
        assert!(BluetoothHandler
            .add(&request("bluetooth", path, None, &tree))
            .is_none());
    }

    #[test]
    fn test_bluetooth_outside_class_tree_is_not_added() {
        let tree = MemoryDeviceTree::new();
        let parent = physical_parent();
        let path = Path::new("/sys/devices/pci0000:00/0000:00:1d.0/usb1/1-1/hci0");
        let mut req = request("bluetooth", path, Some(&parent), &tree);
        req.origin = DeviceOrigin::Physical;

        assert!(BluetoothHandler.add(&req).is_none());
    }

    #[test]
    fn test_bluetooth_reads_interface_name() {
        let tree = MemoryDeviceTree::new().file("/sys/class/bluetooth/hci0/name", "hci0\n");
        let parent = physical_parent();
        let path = Path::new("/sys/class/bluetooth/hci0");

        let mut d = BluetoothHandler
            .add(&request("bluetooth", path, Some(&parent), &tree))
            .unwrap();
        assert_eq!(d.get_string("bluetooth_hci.interface_name"), Some("hci0"));

        let global = DeviceStore::new("global");
        assert!(BluetoothHandler.compute_udi(&mut d, &global));
        assert_eq!(
            d.udi(),
            Some("/org/freedesktop/Hal/devices/usb_device_46d_c01d_bluetooth_hci")
        );
    }

    #[test]
    fn test_compute_udi_fails_without_parent_link() {
        let mut d = Device::new();
        let global = DeviceStore::new("global");
        assert!(!InputHandler.compute_udi(&mut d, &global));
        assert!(d.udi().is_none());
    }
}
