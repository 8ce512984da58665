//! Application layer: the serializing engine and its dispatch preamble.

pub mod engine;
pub mod parent;

pub use engine::{DispatchStats, HotplugEngine, GLOBAL_STORE, PENDING_STORE};
pub use parent::{resolve_parent, ParentResolution};
