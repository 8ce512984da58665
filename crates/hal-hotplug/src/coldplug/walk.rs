//! Depth-first walk of the device tree.
//!
//! Pre-order, directories only, symlinks never followed, so the walk is
//! finite even though sysfs is full of cycles through links. Each
//! directory is listed only when the walk moves past it, so a consumer
//! that stops early never touches the rest of the tree.

use crate::domain::errors::ColdplugError;
use crate::ports::outbound::{DeviceTreeReader, FileKind};
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalkEntry {
    pub path: PathBuf,
    /// 1 for children of the walk root.
    pub depth: usize,
}

/// Iterator over the directories below a root (the root itself is not
/// yielded). The first listing error ends the walk.
#[derive(Clone)]
pub struct DeviceTreeWalk<'a> {
    tree: &'a dyn DeviceTreeReader,
    stack: Vec<WalkEntry>,
    expand_next: Option<(PathBuf, usize)>,
    finished: bool,
}

impl<'a> DeviceTreeWalk<'a> {
    pub fn new(tree: &'a dyn DeviceTreeReader, root: impl Into<PathBuf>) -> Self {
        Self {
            tree,
            stack: Vec::new(),
            expand_next: Some((root.into(), 0)),
            finished: false,
        }
    }

    fn expand(&mut self, dir: PathBuf, depth: usize) -> Result<(), ColdplugError> {
        let children = self
            .tree
            .list_children(&dir)
            .map_err(|e| ColdplugError::io(&dir, e))?;

        // Reversed so the first listed child is popped first
        self.stack.extend(
            children
                .into_iter()
                .rev()
                .filter(|child| child.kind == FileKind::Directory)
                .map(|child| WalkEntry {
                    path: dir.join(child.name),
                    depth: depth + 1,
                }),
        );
        Ok(())
    }
}

impl Iterator for DeviceTreeWalk<'_> {
    type Item = Result<WalkEntry, ColdplugError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if let Some((dir, depth)) = self.expand_next.take() {
            if let Err(e) = self.expand(dir, depth) {
                self.finished = true;
                return Some(Err(e));
            }
        }

        let Some(entry) = self.stack.pop() else {
            self.finished = true;
            return None;
        };
        self.expand_next = Some((entry.path.clone(), entry.depth));
        Some(Ok(entry))
    }
}
