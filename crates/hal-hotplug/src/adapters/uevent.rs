//! Kernel uevent datagram parsing.
//!
//! A datagram is a NUL-separated list of segments. The first segment may
//! be an `action@devpath` header; the rest are `KEY=value` pairs. Only the
//! keys the pipeline consumes are interpreted.

use crate::domain::errors::UeventError;
use crate::domain::event::{HotplugAction, HotplugEvent};
use std::path::{Path, PathBuf};

/// Device node directory used when the caller has no configured one.
pub const DEFAULT_DEVICE_ROOT: &str = "/dev";

/// Parse a uevent rooted at `sysfs_root`, with device nodes under `/dev`.
pub fn parse_uevent(buf: &[u8], sysfs_root: &Path) -> Result<HotplugEvent, UeventError> {
    parse_uevent_with_device_root(buf, sysfs_root, Path::new(DEFAULT_DEVICE_ROOT))
}

/// Parse a uevent. `DEVPATH` is joined to `sysfs_root`; a relative
/// `DEVNAME` is joined to `device_root`.
pub fn parse_uevent_with_device_root(
    buf: &[u8],
    sysfs_root: &Path,
    device_root: &Path,
) -> Result<HotplugEvent, UeventError> {
    let mut action = None;
    let mut devpath = None;
    let mut subsystem = None;
    let mut devname = None;
    let mut ifindex = None;

    for (n, segment) in buf.split(|b| *b == 0).enumerate() {
        if segment.is_empty() {
            continue;
        }
        let segment = String::from_utf8_lossy(segment);

        let Some((key, value)) = segment.split_once('=') else {
            if n == 0 {
                if let Some((header_action, header_path)) = segment.split_once('@') {
                    action.get_or_insert_with(|| header_action.to_string());
                    devpath.get_or_insert_with(|| header_path.to_string());
                }
            }
            continue;
        };

        match key {
            "ACTION" => action = Some(value.to_string()),
            "DEVPATH" => devpath = Some(value.to_string()),
            "SUBSYSTEM" => subsystem = Some(value.to_string()),
            "DEVNAME" => devname = Some(value.to_string()),
            "IFINDEX" => {
                let index = value.parse::<i32>().map_err(|_| UeventError::Malformed {
                    field: format!("IFINDEX={value}"),
                })?;
                ifindex = Some(index);
            }
            _ => {}
        }
    }

    let action = match action.as_deref() {
        Some("add") => HotplugAction::Add,
        Some("remove") => HotplugAction::Remove,
        Some(other) => {
            return Err(UeventError::UnsupportedAction {
                action: other.to_string(),
            })
        }
        None => return Err(UeventError::MissingKey { key: "ACTION" }),
    };
    let devpath = devpath.ok_or(UeventError::MissingKey { key: "DEVPATH" })?;
    let subsystem = subsystem.ok_or(UeventError::MissingKey { key: "SUBSYSTEM" })?;

    let relative = devpath
        .strip_prefix('/')
        .ok_or_else(|| UeventError::Malformed {
            field: format!("DEVPATH={devpath}"),
        })?;
    let sysfs_path = sysfs_root.join(relative);

    let device_file = devname.filter(|n| !n.is_empty()).map(|name| {
        let name = PathBuf::from(name);
        if name.is_absolute() {
            name
        } else {
            device_root.join(name)
        }
    });

    Ok(HotplugEvent::new(action, subsystem, sysfs_path)
        .with_device_file(device_file)
        .with_net_ifindex(ifindex))
}
