//! Error types for the hotplug subsystem.
//!
//! None of these cross the serializer: dispatch failures are folded into
//! a `DispatchOutcome`. They surface from coldplug, helper invocation,
//! registry construction, uevent parsing and configuration.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of the coldplug pass. Any of these aborts the whole pass.
#[derive(Debug, Error)]
pub enum ColdplugError {
    /// A directory that must be listed could not be read.
    #[error("Unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An entry of a bus `devices` directory is not a symlink.
    #[error("{path} is not a symlink")]
    NotASymlink { path: PathBuf },
}

impl ColdplugError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ColdplugError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure to run a probe helper at all. A helper that ran and failed is
/// reported through `HelperOutcome`, not here.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to spawn helper '{helper}': {source}")]
    Spawn {
        helper: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error while waiting for helper '{helper}': {source}")]
    Io {
        helper: String,
        #[source]
        source: io::Error,
    },
}

/// Handler registry construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("A handler for subsystem '{subsystem}' is already registered")]
    DuplicateSubsystem { subsystem: String },
}

/// Kernel uevent parsing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UeventError {
    #[error("Uevent is missing mandatory key {key}")]
    MissingKey { key: &'static str },

    #[error("Unsupported uevent action: {action}")]
    UnsupportedAction { action: String },

    #[error("Malformed uevent field: {field}")]
    Malformed { field: String },
}

/// Configuration validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("sysfs root must be an absolute path, got {0}")]
    RelativeSysfsRoot(PathBuf),

    #[error("helper timeout must be greater than zero")]
    ZeroHelperTimeout,

    #[error("event channel capacity must be greater than zero")]
    ZeroChannelCapacity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ColdplugError::NotASymlink {
            path: PathBuf::from("/sys/bus/pci/devices/0000:00:00.0"),
        };
        assert_eq!(err.to_string(), "/sys/bus/pci/devices/0000:00:00.0 is not a symlink");

        let err = RegistryError::DuplicateSubsystem {
            subsystem: "input".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "A handler for subsystem 'input' is already registered"
        );
    }

    #[test]
    fn test_io_error_display_includes_path() {
        let err = ColdplugError::io(
            "/sys/bus",
            io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
        );
        assert_eq!(err.to_string(), "Unable to read /sys/bus: No such file or directory");
    }
}
