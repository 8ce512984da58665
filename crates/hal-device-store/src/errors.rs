//! Error types for device store operations.

use crate::device::DeviceId;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record is already held by this store.
    #[error("Device {id} is already present in store '{store}'")]
    AlreadyPresent { id: DeviceId, store: &'static str },

    /// Another committed record already carries this UDI.
    #[error("UDI already in use: {udi}")]
    UdiInUse { udi: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::UdiInUse {
            udi: "/org/freedesktop/Hal/devices/computer".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "UDI already in use: /org/freedesktop/Hal/devices/computer"
        );
    }
}
