//! Ports layer for the hotplug subsystem.
//!
//! - Inbound (Driving) ports: API exposed to event producers
//! - Outbound (Driven) ports: device tree, probe helpers, property merge

pub mod inbound;
pub mod outbound;

pub use inbound::HotplugApi;
pub use outbound::{
    DeviceTreeReader, FileKind, HelperInvoker, HelperOutcome, NoPropertyMerge, PropertyMerger,
    TreeEntry,
};
