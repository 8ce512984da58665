//! # HAL Hotplug
//!
//! Serialized hotplug event pipeline and the coldplug synthesizer that
//! seeds it at startup.
//!
//! ## Architecture
//!
//! - **Domain**: `HotplugEvent`, the serializing `EventQueue`, dispatch
//!   outcomes and path normalisation
//! - **Ports**: Inbound (`HotplugApi`) and Outbound (`DeviceTreeReader`,
//!   `HelperInvoker`, `PropertyMerger`)
//! - **Registry**: one `DeviceHandler` per subsystem
//! - **Application**: `HotplugEngine`, which drives each event through
//!   build, probe, identity and commit
//! - **Coldplug**: bus index, device tree walk and batch synthesis
//! - **Adapters**: sysfs, helper processes, kernel uevents, test doubles
//!
//! ## Event Flow
//!
//! ```text
//! coldplug batch ─┐
//!                 ├─→ [EventQueue] ──one at a time──→ HotplugEngine ──→ DeviceStore
//! live uevents ───┘
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod application;
pub mod coldplug;
pub mod config;
pub mod domain;
pub mod ports;
pub mod registry;

pub use adapters::{parse_uevent, parse_uevent_with_device_root, ProcessHelperInvoker, SysfsReader};
pub use application::{DispatchStats, HotplugEngine};
pub use coldplug::{ColdplugReport, ColdplugSynthesizer};
pub use config::HotplugConfig;
pub use domain::*;
pub use ports::inbound::HotplugApi;
pub use ports::outbound::{DeviceTreeReader, HelperInvoker, HelperOutcome, PropertyMerger};
pub use registry::{DeviceHandler, HandlerRegistry};
