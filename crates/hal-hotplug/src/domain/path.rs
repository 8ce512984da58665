//! Lexical path normalisation.
//!
//! Symlink targets in the device tree are relative (`../../../devices/...`).
//! Resolution is purely lexical: nothing here touches the filesystem.

use std::path::{Component, Path, PathBuf};

/// Resolve a symlink `target` found in directory `base_dir`.
///
/// Absolute targets are cleaned as-is; relative ones are joined onto
/// `base_dir` first.
pub fn normalize_link(base_dir: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        clean_path(target)
    } else {
        clean_path(&base_dir.join(target))
    }
}

/// Resolve `.` and `..` components without climbing above the root.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            Component::Normal(part) => parts.push(part),
        }
    }

    let mut out = if path.has_root() {
        PathBuf::from("/")
    } else {
        PathBuf::new()
    };
    out.extend(parts);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_bus_link_resolves_to_devices_tree() {
        let got = normalize_link(
            Path::new("/sys/bus/pci/devices"),
            Path::new("../../../devices/pci0000:00/0000:00:07.2"),
        );
        assert_eq!(got, PathBuf::from("/sys/devices/pci0000:00/0000:00:07.2"));
    }

    #[test]
    fn test_class_device_link() {
        let got = normalize_link(
            Path::new("/sys/class/input/input0"),
            Path::new("../../../devices/platform/i8042/serio0"),
        );
        assert_eq!(got, PathBuf::from("/sys/devices/platform/i8042/serio0"));
    }

    #[test]
    fn test_absolute_target_is_cleaned() {
        let got = normalize_link(
            Path::new("/sys/class/net/eth0"),
            Path::new("/sys/devices/./pci0000:00/../pci0000:00/0000:00:19.0"),
        );
        assert_eq!(got, PathBuf::from("/sys/devices/pci0000:00/0000:00:19.0"));
    }

    #[test]
    fn test_never_climbs_above_root() {
        let got = normalize_link(Path::new("/sys"), Path::new("../../../../devices"));
        assert_eq!(got, PathBuf::from("/devices"));
    }

    fn segment() -> impl Strategy<Value = String> {
        prop_oneof![
            3 => "[a-z0-9:._-]{1,8}".prop_filter("plain name", |s| s != "." && s != ".."),
            1 => Just("..".to_string()),
            1 => Just(".".to_string()),
        ]
    }

    proptest! {
        #[test]
        fn prop_result_is_absolute_and_clean(
            base in proptest::collection::vec("[a-z0-9]{1,6}", 0..6),
            target in proptest::collection::vec(segment(), 0..8),
        ) {
            let base_dir = PathBuf::from(format!("/{}", base.join("/")));
            let got = normalize_link(&base_dir, Path::new(&target.join("/")));

            prop_assert!(got.is_absolute());
            prop_assert!(got
                .components()
                .all(|c| matches!(c, Component::RootDir | Component::Normal(_))));
        }

        #[test]
        fn prop_single_parent_step_matches_parent_dir(
            base in proptest::collection::vec("[a-z0-9]{1,6}", 1..6),
            leaf in "[a-z0-9]{1,6}",
        ) {
            let base_dir = PathBuf::from(format!("/{}", base.join("/")));
            let got = normalize_link(&base_dir, Path::new(&format!("../{leaf}")));

            let expected = base_dir.parent().map(|p| p.join(&leaf));
            prop_assert_eq!(Some(got), expected);
        }
    }
}
