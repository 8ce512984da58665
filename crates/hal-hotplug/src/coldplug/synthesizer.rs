//! # Coldplug Synthesizer
//!
//! Turns the devices already present at startup into a batch of add
//! events, ordered so that every device's prerequisite comes first:
//!
//! 1. Bus devices, in walk order of `<root>/devices` (parents before
//!    children), each waiting for its parent directory.
//! 2. Class devices, one per entry of `<root>/class/<class>`, each
//!    waiting for the target of its `device` link.
//! 3. Block devices, each disk followed by its partitions. A disk waits
//!    for its `device` link target, a partition for its disk.
//!
//! The batch is assembled in memory and handed to the queue only once
//! the whole pass succeeded.

use super::bus_map::BusMembershipIndex;
use super::walk::DeviceTreeWalk;
use crate::application::HotplugEngine;
use crate::domain::errors::ColdplugError;
use crate::domain::event::HotplugEvent;
use crate::domain::path::normalize_link;
use crate::ports::inbound::HotplugApi;
use crate::ports::outbound::{DeviceTreeReader, TreeEntry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Subsystem tag of block device events.
pub const BLOCK_SUBSYSTEM: &str = "block";

/// Event counts of one coldplug pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColdplugReport {
    pub bus: usize,
    pub class: usize,
    pub block: usize,
    pub partitions: usize,
}

impl ColdplugReport {
    pub fn total(&self) -> usize {
        self.bus + self.class + self.block + self.partitions
    }
}

/// Events of one pass, in queue order.
#[derive(Clone, Debug, Default)]
pub struct ColdplugBatch {
    pub events: Vec<HotplugEvent>,
    pub report: ColdplugReport,
}

pub struct ColdplugSynthesizer {
    tree: Arc<dyn DeviceTreeReader>,
    sysfs_root: PathBuf,
    device_root: PathBuf,
}

impl ColdplugSynthesizer {
    pub fn new(
        tree: Arc<dyn DeviceTreeReader>,
        sysfs_root: impl Into<PathBuf>,
        device_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            tree,
            sysfs_root: sysfs_root.into(),
            device_root: device_root.into(),
        }
    }

    /// Synthesizer reading the same tree and roots as `engine`.
    pub fn for_engine(engine: &HotplugEngine) -> Self {
        Self::new(
            engine.tree(),
            engine.config().sysfs_root.clone(),
            engine.config().device_root.clone(),
        )
    }

    /// Build the batch without enqueueing it.
    pub fn synthesize(&self) -> Result<ColdplugBatch, ColdplugError> {
        let tree = self.tree.as_ref();
        let mut batch = ColdplugBatch::default();

        let index = BusMembershipIndex::build(tree, &self.sysfs_root)?;
        self.bus_devices(&index, &mut batch)?;
        drop(index);

        self.class_devices(&mut batch)?;
        self.block_devices(&mut batch)?;

        Ok(batch)
    }

    /// Synthesize and append the batch to `api`'s queue. Does not drain
    /// the queue.
    pub fn run(&self, api: &dyn HotplugApi) -> Result<ColdplugReport, ColdplugError> {
        let batch = match self.synthesize() {
            Ok(batch) => batch,
            Err(e) => {
                error!(error = %e, "Error building the ordered list of device paths");
                return Err(e);
            }
        };

        let report = batch.report;
        info!(
            bus = report.bus,
            class = report.class,
            block = report.block,
            partitions = report.partitions,
            "Coldplug events synthesized"
        );
        api.enqueue_batch(batch.events);
        Ok(report)
    }

    fn bus_devices(
        &self,
        index: &BusMembershipIndex,
        batch: &mut ColdplugBatch,
    ) -> Result<(), ColdplugError> {
        for entry in DeviceTreeWalk::new(self.tree.as_ref(), self.sysfs_root.join("devices")) {
            let entry = entry?;
            let Some(bus) = index.bus_for(&entry.path) else {
                continue;
            };
            let parent = entry.path.parent().map(Path::to_path_buf);
            batch
                .events
                .push(HotplugEvent::add(bus, entry.path.clone()).waiting_for(parent));
            batch.report.bus += 1;
        }
        Ok(())
    }

    fn class_devices(&self, batch: &mut ColdplugBatch) -> Result<(), ColdplugError> {
        let class_root = self.sysfs_root.join("class");
        for class in self.list(&class_root)? {
            let class_dir = class_root.join(&class.name);
            for device in self.list(&class_dir)? {
                let path = class_dir.join(&device.name);
                let event = HotplugEvent::add(class.name.as_str(), path.clone())
                    .with_device_file(self.device_file(&path))
                    .waiting_for(self.device_link_target(&path));
                batch.events.push(event);
                batch.report.class += 1;
            }
        }
        Ok(())
    }

    fn block_devices(&self, batch: &mut ColdplugBatch) -> Result<(), ColdplugError> {
        let block_root = self.sysfs_root.join("block");
        for disk in self.list(&block_root)? {
            let disk_path = block_root.join(&disk.name);
            let event = HotplugEvent::add(BLOCK_SUBSYSTEM, disk_path.clone())
                .with_device_file(self.device_file(&disk_path))
                .waiting_for(self.device_link_target(&disk_path));
            batch.events.push(event);
            batch.report.block += 1;

            // Partitions are named after their disk: sda -> sda1, sda2
            for part in self.list(&disk_path)? {
                if !part.name.starts_with(disk.name.as_str()) {
                    continue;
                }
                let part_path = disk_path.join(&part.name);
                let event = HotplugEvent::add(BLOCK_SUBSYSTEM, part_path.clone())
                    .with_device_file(self.device_file(&part_path))
                    .waiting_for(Some(disk_path.clone()));
                batch.events.push(event);
                batch.report.partitions += 1;
            }
        }
        Ok(())
    }

    fn list(&self, dir: &Path) -> Result<Vec<TreeEntry>, ColdplugError> {
        self.tree
            .list_children(dir)
            .map_err(|e| ColdplugError::io(dir, e))
    }

    /// Normalised target of `<path>/device`, relative to `path`.
    fn device_link_target(&self, path: &Path) -> Option<PathBuf> {
        self.tree
            .read_link(&path.join("device"))
            .map(|target| normalize_link(path, &target))
    }

    /// Special file named by the `DEVNAME=` line of `<path>/uevent`.
    fn device_file(&self, path: &Path) -> Option<PathBuf> {
        let uevent = self.tree.read_attribute(path, "uevent")?;
        let name = uevent
            .lines()
            .find_map(|line| line.strip_prefix("DEVNAME="))?
            .trim();
        if name.is_empty() {
            return None;
        }
        let name = Path::new(name);
        Some(if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.device_root.join(name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock::{MemoryDeviceTree, ScriptedHelper};
    use crate::config::HotplugConfig;
    use crate::registry::HandlerRegistry;

    fn empty_engine() -> HotplugEngine {
        HotplugEngine::new(
            HotplugConfig::default(),
            HandlerRegistry::new(),
            Arc::new(MemoryDeviceTree::new()),
            Arc::new(ScriptedHelper::new()),
        )
    }

    fn position(events: &[HotplugEvent], path: &str) -> usize {
        events
            .iter()
            .position(|e| e.sysfs_path() == Path::new(path))
            .unwrap_or_else(|| panic!("no event for {path}"))
    }

    fn sample_tree() -> MemoryDeviceTree {
        MemoryDeviceTree::new()
            // physical tree
            .dir("/sys/devices/pci0000:00/0000:00:1d.0/usb1/1-1/1-1:1.0")
            .dir("/sys/devices/pci0000:00/0000:00:1f.1/host0/target0:0:0/0:0:0:0")
            .dir("/sys/devices/platform/i8042/serio0")
            // bus registrations
            .symlink(
                "/sys/bus/pci/devices/0000:00:1d.0",
                "../../../devices/pci0000:00/0000:00:1d.0",
            )
            .symlink(
                "/sys/bus/pci/devices/0000:00:1f.1",
                "../../../devices/pci0000:00/0000:00:1f.1",
            )
            .symlink(
                "/sys/bus/usb/devices/usb1",
                "../../../devices/pci0000:00/0000:00:1d.0/usb1",
            )
            .symlink(
                "/sys/bus/usb/devices/1-1",
                "../../../devices/pci0000:00/0000:00:1d.0/usb1/1-1",
            )
            .symlink(
                "/sys/bus/usb/devices/1-1:1.0",
                "../../../devices/pci0000:00/0000:00:1d.0/usb1/1-1/1-1:1.0",
            )
            .symlink(
                "/sys/bus/scsi/devices/0:0:0:0",
                "../../../devices/pci0000:00/0000:00:1f.1/host0/target0:0:0/0:0:0:0",
            )
            // class devices
            .symlink(
                "/sys/class/input/input0/device",
                "../../../devices/platform/i8042/serio0",
            )
            .file("/sys/class/input/input0/uevent", "MAJOR=13\nMINOR=64\nDEVNAME=input/event0\n")
            .dir("/sys/class/input/mice")
            // block devices
            .symlink(
                "/sys/block/sda/device",
                "../../devices/pci0000:00/0000:00:1f.1/host0/target0:0:0/0:0:0:0",
            )
            .file("/sys/block/sda/uevent", "MAJOR=8\nMINOR=0\nDEVNAME=sda\n")
            .dir("/sys/block/sda/sda1")
            .dir("/sys/block/sda/sda2")
            .dir("/sys/block/sda/queue")
            .dir("/sys/block/fd0")
    }

    fn synthesizer(tree: MemoryDeviceTree) -> ColdplugSynthesizer {
        ColdplugSynthesizer::new(Arc::new(tree), "/sys", "/dev")
    }

    #[test]
    fn test_bus_events_follow_walk_order() {
        let batch = synthesizer(sample_tree()).synthesize().unwrap();
        let events = &batch.events;

        let pci = position(events, "/sys/devices/pci0000:00/0000:00:1d.0");
        let usb = position(events, "/sys/devices/pci0000:00/0000:00:1d.0/usb1");
        let hub = position(events, "/sys/devices/pci0000:00/0000:00:1d.0/usb1/1-1");
        let intf = position(events, "/sys/devices/pci0000:00/0000:00:1d.0/usb1/1-1/1-1:1.0");
        assert!(pci < usb && usb < hub && hub < intf);

        assert_eq!(events[usb].subsystem(), "usb");
        assert_eq!(
            events[usb].wait_for_sysfs_path(),
            Some(Path::new("/sys/devices/pci0000:00/0000:00:1d.0"))
        );
        assert_eq!(events[usb].device_file(), None);
        assert_eq!(batch.report.bus, 6);
    }

    #[test]
    fn test_class_devices_wait_for_link_target() {
        let batch = synthesizer(sample_tree()).synthesize().unwrap();
        let events = &batch.events;

        let input0 = &events[position(events, "/sys/class/input/input0")];
        assert_eq!(input0.subsystem(), "input");
        assert_eq!(
            input0.wait_for_sysfs_path(),
            Some(Path::new("/sys/devices/platform/i8042/serio0"))
        );
        assert_eq!(input0.device_file(), Some(Path::new("/dev/input/event0")));

        let mice = &events[position(events, "/sys/class/input/mice")];
        assert_eq!(mice.wait_for_sysfs_path(), None);
        assert_eq!(mice.device_file(), None);
        assert_eq!(batch.report.class, 2);
    }

    #[test]
    fn test_partitions_follow_their_disk() {
        let batch = synthesizer(sample_tree()).synthesize().unwrap();
        let events = &batch.events;

        let sda = position(events, "/sys/block/sda");
        let sda1 = position(events, "/sys/block/sda/sda1");
        let sda2 = position(events, "/sys/block/sda/sda2");
        assert!(sda < sda1 && sda1 < sda2);
        assert!(!events.iter().any(|e| e.sysfs_path() == Path::new("/sys/block/sda/queue")));

        assert_eq!(events[sda].device_file(), Some(Path::new("/dev/sda")));
        assert_eq!(
            events[sda].wait_for_sysfs_path(),
            Some(Path::new(
                "/sys/devices/pci0000:00/0000:00:1f.1/host0/target0:0:0/0:0:0:0"
            ))
        );
        assert_eq!(events[sda1].wait_for_sysfs_path(), Some(Path::new("/sys/block/sda")));
        assert!(events.iter().all(|e| e.is_add()));
        assert_eq!(batch.report.block, 2);
        assert_eq!(batch.report.partitions, 2);
    }

    #[test]
    fn test_every_wait_target_precedes_its_dependent() {
        let batch = synthesizer(sample_tree()).synthesize().unwrap();
        let events = &batch.events;

        for (i, event) in events.iter().enumerate() {
            let Some(wait) = event.wait_for_sysfs_path() else {
                continue;
            };
            if let Some(j) = events.iter().position(|e| e.sysfs_path() == wait) {
                assert!(j < i, "{} queued before {}", event.sysfs_path().display(), wait.display());
            }
        }
    }

    #[test]
    fn test_bus_section_precedes_class_and_block() {
        let batch = synthesizer(sample_tree()).synthesize().unwrap();
        let last_bus = batch.report.bus - 1;
        assert!(batch.events[..=last_bus]
            .iter()
            .all(|e| e.sysfs_path().starts_with("/sys/devices")));
        assert_eq!(batch.events.len(), batch.report.total());
    }

    #[test]
    fn test_failed_pass_enqueues_nothing() {
        let tree = sample_tree().unreadable("/sys/class/net");
        let api = empty_engine();

        let err = synthesizer(tree).run(&api).unwrap_err();
        assert!(matches!(err, ColdplugError::Io { ref path, .. } if path == Path::new("/sys/class/net")));
        assert_eq!(api.queued(), 0);
    }

    #[test]
    fn test_successful_run_enqueues_batch_in_order() {
        let api = empty_engine();

        let report = synthesizer(sample_tree()).run(&api).unwrap();
        assert_eq!(api.queued(), report.total());
        assert_eq!(report.total(), 12);
    }
}
