//! # HAL Device Store
//!
//! Device records and the two indexed collections the hotplug pipeline
//! mutates: the *pending* store for records still being built and the
//! *global* store for committed devices.
//!
//! ## Record Lifecycle
//!
//! ```text
//! handler.add() ──→ [pending store] ──probe/identity──→ [global store]
//!                          │                                 │
//!                          └── any failure: evicted          └── removal event: evicted
//! ```
//!
//! ## Design Principles
//!
//! - **Stores own records**: parent links are UDI strings looked up on
//!   demand, never references between records.
//! - **Join key**: `linux.sysfs_path_device` is how later events (removal,
//!   parent resolution) find a committed record.
//! - **Observable**: the global store broadcasts `StoreEvent`s so the IPC
//!   layer can follow mutations without calling back into the engine.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod device;
pub mod errors;
pub mod property;
pub mod store;
pub mod udi;

pub use device::{keys, Device, DeviceId};
pub use errors::StoreError;
pub use property::PropertyValue;
pub use store::{DeviceStore, StoreEvent};
pub use udi::{sanitize_udi, unique_udi, ROOT_UDI, UDI_PREFIX};

/// Maximum store events buffered per observer before it starts lagging.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;
