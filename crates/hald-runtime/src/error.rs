use crate::config::RuntimeConfigError;
use hal_hotplug::{ColdplugError, UeventError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Configuration error: {0}")]
    Config(#[from] RuntimeConfigError),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("Coldplug failed: {0}")]
    Coldplug(#[from] ColdplugError),

    #[error("Rejected uevent: {0}")]
    Uevent(#[from] UeventError),

    #[error("Event channel closed")]
    ChannelClosed,

    #[error("Event loop is already running")]
    AlreadyRunning,
}
