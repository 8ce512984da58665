//! # Sysfs Reader
//!
//! `DeviceTreeReader` over the real filesystem. Never follows a symlink
//! when classifying or listing; only `read_attribute` goes through the
//! normal (following) open path, as the kernel attribute files require.

use crate::ports::outbound::{DeviceTreeReader, FileKind, TreeEntry};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsReader;

impl SysfsReader {
    pub fn new() -> Self {
        Self
    }
}

fn kind_of(file_type: fs::FileType) -> FileKind {
    if file_type.is_symlink() {
        FileKind::Symlink
    } else if file_type.is_dir() {
        FileKind::Directory
    } else if file_type.is_file() {
        FileKind::Regular
    } else {
        FileKind::Other
    }
}

impl DeviceTreeReader for SysfsReader {
    fn list_children(&self, path: &Path) -> io::Result<Vec<TreeEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let kind = kind_of(entry.file_type()?);
            entries.push(TreeEntry::new(
                entry.file_name().to_string_lossy().into_owned(),
                kind,
            ));
        }
        // read_dir order is unspecified
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn read_link(&self, path: &Path) -> Option<PathBuf> {
        fs::read_link(path).ok()
    }

    fn read_attribute(&self, dir: &Path, name: &str) -> Option<String> {
        fs::read_to_string(dir.join(name))
            .ok()
            .map(|s| s.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;
    use tempfile::TempDir;

    #[test]
    fn test_file_kinds_do_not_follow_links() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("devices/pci0000:00");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("vendor"), "0x8086\n").unwrap();
        symlink("devices/pci0000:00", tmp.path().join("link")).unwrap();

        let reader = SysfsReader::new();
        let top = reader.list_children(tmp.path()).unwrap();
        assert_eq!(
            top,
            vec![
                TreeEntry::new("devices", FileKind::Directory),
                TreeEntry::new("link", FileKind::Symlink),
            ]
        );
        let attrs = reader.list_children(&dir).unwrap();
        assert_eq!(attrs, vec![TreeEntry::new("vendor", FileKind::Regular)]);
        assert!(reader.list_children(&tmp.path().join("missing")).is_err());
    }

    #[test]
    fn test_list_children_sorted() {
        let tmp = TempDir::new().unwrap();
        for name in ["sdb", "sda", "hda"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        symlink("sda", tmp.path().join("disk")).unwrap();

        let children = SysfsReader::new().list_children(tmp.path()).unwrap();
        let names: Vec<_> = children.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["disk", "hda", "sda", "sdb"]);
        assert_eq!(children[0].kind, FileKind::Symlink);
    }

    #[test]
    fn test_read_link_and_attribute() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("name"), "hci0\n").unwrap();
        symlink("../../devices/usb1", tmp.path().join("device")).unwrap();

        let reader = SysfsReader::new();
        assert_eq!(
            reader.read_link(&tmp.path().join("device")),
            Some(PathBuf::from("../../devices/usb1"))
        );
        assert_eq!(reader.read_link(&tmp.path().join("name")), None);
        assert_eq!(
            reader.read_attribute(tmp.path(), "name"),
            Some("hci0".to_string())
        );
        assert_eq!(reader.read_attribute(tmp.path(), "absent"), None);
    }
}
