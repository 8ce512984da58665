//! Coldplug: synthesized add events for hardware present at startup.

pub mod bus_map;
pub mod synthesizer;
pub mod walk;

pub use bus_map::BusMembershipIndex;
pub use synthesizer::{ColdplugBatch, ColdplugReport, ColdplugSynthesizer, BLOCK_SUBSYSTEM};
pub use walk::{DeviceTreeWalk, WalkEntry};
