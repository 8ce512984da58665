//! Domain module for the hotplug subsystem.
//!
//! Events, the serializing queue, dispatch outcomes, path normalisation
//! and error types.

pub mod errors;
pub mod event;
pub mod outcome;
pub mod path;
pub mod queue;

pub use errors::*;
pub use event::{HotplugAction, HotplugEvent};
pub use outcome::{DiscardReason, DispatchOutcome, IgnoreReason};
pub use path::{clean_path, normalize_link};
pub use queue::{EventQueue, InFlightEvent};
