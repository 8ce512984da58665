//! UDI helpers.
//!
//! A UDI is derived from the parent's UDI plus a subsystem-specific
//! suffix, sanitised to `[A-Za-z0-9_/]` and made unique against the
//! global store by appending `_0`, `_1`, ...

use crate::store::DeviceStore;

/// Common prefix of every UDI.
pub const UDI_PREFIX: &str = "/org/freedesktop/Hal/devices";

/// UDI of the root "computer" device, the parent of last resort.
pub const ROOT_UDI: &str = "/org/freedesktop/Hal/devices/computer";

/// Replace every character outside `[A-Za-z0-9_/]` with `_`.
pub fn sanitize_udi(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '/' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Sanitise `candidate` and make it unique within `store`.
pub fn unique_udi(store: &DeviceStore, candidate: &str) -> String {
    let base = sanitize_udi(candidate);
    if !store.contains_udi(&base) {
        return base;
    }

    (0u32..)
        .map(|n| format!("{base}_{n}"))
        .find(|udi| !store.contains_udi(udi))
        .unwrap_or(base)
}
