//! # Adapters Module
//!
//! Implementations of the outbound ports, plus the kernel uevent parser.
//!
//! ## Modules
//!
//! - `sysfs`: `DeviceTreeReader` over the mounted sysfs
//! - `helper`: probe helpers as child processes
//! - `uevent`: kernel uevent datagrams to `HotplugEvent`
//! - `mock`: in-memory tree and scripted helpers for tests

pub mod helper;
pub mod mock;
pub mod sysfs;
pub mod uevent;

pub use helper::{ProcessHelperInvoker, PROPERTY_ENV_PREFIX};
pub use mock::{HelperCall, MemoryDeviceTree, ScriptedHelper};
pub use sysfs::SysfsReader;
pub use uevent::{parse_uevent, parse_uevent_with_device_root, DEFAULT_DEVICE_ROOT};
