//! Controllable adapters for tests.
//!
//! Production uses `SysfsReader` and `ProcessHelperInvoker`.

use crate::domain::errors::ProbeError;
use crate::ports::outbound::{DeviceTreeReader, FileKind, HelperInvoker, HelperOutcome, TreeEntry};
use async_trait::async_trait;
use hal_device_store::Device;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Clone, Debug)]
enum Node {
    Dir,
    File(String),
    Symlink(PathBuf),
}

/// In-memory device tree.
///
/// Adding a node creates its missing ancestors as directories. Children
/// are listed in name order.
#[derive(Clone, Debug, Default)]
pub struct MemoryDeviceTree {
    nodes: BTreeMap<PathBuf, Node>,
    unreadable: HashSet<PathBuf>,
}

impl MemoryDeviceTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), Node::Dir);
        self
    }

    pub fn file(mut self, path: impl AsRef<Path>, contents: &str) -> Self {
        self.insert(path.as_ref(), Node::File(contents.to_string()));
        self
    }

    pub fn symlink(mut self, path: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), Node::Symlink(target.as_ref().to_path_buf()));
        self
    }

    /// Make listing the directory at `path` fail.
    pub fn unreadable(mut self, path: impl AsRef<Path>) -> Self {
        self.insert(path.as_ref(), Node::Dir);
        self.unreadable.insert(path.as_ref().to_path_buf());
        self
    }

    fn insert(&mut self, path: &Path, node: Node) {
        for ancestor in path.ancestors().skip(1) {
            self.nodes
                .entry(ancestor.to_path_buf())
                .or_insert(Node::Dir);
        }
        self.nodes.insert(path.to_path_buf(), node);
    }

    fn kind_at(&self, path: &Path) -> io::Result<FileKind> {
        match self.nodes.get(path) {
            Some(Node::Dir) => Ok(FileKind::Directory),
            Some(Node::File(_)) => Ok(FileKind::Regular),
            Some(Node::Symlink(_)) => Ok(FileKind::Symlink),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "No such file or directory",
            )),
        }
    }
}

impl DeviceTreeReader for MemoryDeviceTree {
    fn list_children(&self, path: &Path) -> io::Result<Vec<TreeEntry>> {
        if self.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "Permission denied",
            ));
        }
        if self.kind_at(path)? != FileKind::Directory {
            return Err(io::Error::new(io::ErrorKind::Other, "Not a directory"));
        }

        let entries = self
            .nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(path))
            .filter_map(|(p, node)| {
                let name = p.file_name()?.to_string_lossy().into_owned();
                let kind = match node {
                    Node::Dir => FileKind::Directory,
                    Node::File(_) => FileKind::Regular,
                    Node::Symlink(_) => FileKind::Symlink,
                };
                Some(TreeEntry::new(name, kind))
            })
            .collect();
        Ok(entries)
    }

    fn read_link(&self, path: &Path) -> Option<PathBuf> {
        match self.nodes.get(path) {
            Some(Node::Symlink(target)) => Some(target.clone()),
            _ => None,
        }
    }

    fn read_attribute(&self, dir: &Path, name: &str) -> Option<String> {
        match self.nodes.get(&dir.join(name)) {
            Some(Node::File(contents)) => Some(contents.trim_end().to_string()),
            _ => None,
        }
    }
}

/// A helper invocation as seen by `ScriptedHelper`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelperCall {
    pub helper: String,
    pub sysfs_path: Option<String>,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
enum Scripted {
    Outcome(HelperOutcome),
    SpawnFailure,
}

/// Helper invoker returning canned outcomes per helper name.
///
/// Unknown helpers succeed. With a gate installed, every invocation waits
/// for one `Notify` permit before returning, which lets a test observe the
/// engine while a probe is suspended.
#[derive(Default)]
pub struct ScriptedHelper {
    scripts: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<HelperCall>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedHelper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, helper: &str, outcome: HelperOutcome) -> Self {
        self.scripts
            .lock()
            .insert(helper.to_string(), Scripted::Outcome(outcome));
        self
    }

    pub fn fail_spawn(self, helper: &str) -> Self {
        self.scripts
            .lock()
            .insert(helper.to_string(), Scripted::SpawnFailure);
        self
    }

    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> Vec<HelperCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl HelperInvoker for ScriptedHelper {
    async fn invoke(
        &self,
        helper: &str,
        device: &Device,
        timeout: Duration,
    ) -> Result<HelperOutcome, ProbeError> {
        self.calls.lock().push(HelperCall {
            helper: helper.to_string(),
            sysfs_path: device.sysfs_path().map(str::to_string),
            timeout,
        });

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let scripted = self.scripts.lock().get(helper).cloned();
        match scripted {
            Some(Scripted::Outcome(outcome)) => Ok(outcome),
            Some(Scripted::SpawnFailure) => Err(ProbeError::Spawn {
                helper: helper.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            }),
            None => Ok(HelperOutcome::success()),
        }
    }
}
