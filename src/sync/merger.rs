//! Resumable directory walk reconciling a subtree against disk.

use super::Reconciler;
use crate::fs::list_dir;
use crate::types::{NodeId, WatcherId};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// What started a merge, and what to do when it finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOrigin {
    /// Project-wide merge, after start-up or a watcher overflow.
    FullRescan { watcher: Option<WatcherId> },
    /// A directory that appeared while watching.
    Subtree { node: NodeId, was_expanded: bool },
}

#[derive(Debug, Clone)]
struct MergeFrame {
    directory_path: PathBuf,
    parent: NodeId,
}

/// Depth-first merge with an explicit stack, one directory level per call
/// to [`continue_merge`](Self::continue_merge).
#[derive(Debug)]
pub struct DiskMerger {
    frames: Vec<MergeFrame>,
    origin: MergeOrigin,
}

impl DiskMerger {
    pub fn full_rescan(root: NodeId, root_path: &Path, watcher: Option<WatcherId>) -> Self {
        Self::new(root, root_path, MergeOrigin::FullRescan { watcher })
    }

    pub fn subtree(node: NodeId, path: &Path, was_expanded: bool) -> Self {
        Self::new(node, path, MergeOrigin::Subtree { node, was_expanded })
    }

    fn new(node: NodeId, path: &Path, origin: MergeOrigin) -> Self {
        Self {
            frames: vec![MergeFrame {
                directory_path: path.to_path_buf(),
                parent: node,
            }],
            origin,
        }
    }

    pub fn origin(&self) -> MergeOrigin {
        self.origin
    }

    /// Process one directory level. Returns false once the merge completed.
    pub fn continue_merge(&mut self, cx: &mut Reconciler<'_>) -> bool {
        let Some(frame) = self.frames.pop() else {
            self.complete(cx);
            return false;
        };

        let dir = frame.directory_path.as_path();
        let parent = frame.parent;
        if !dir.is_dir() || !cx.tree.contains(parent) {
            debug!(dir = %dir.display(), "frame target gone, skipping");
            return true;
        }

        let was_expanded = cx.expansion(parent);
        let listing = match list_dir(dir) {
            Ok(listing) => listing,
            Err(err) => {
                debug!(dir = %dir.display(), error = %err, "directory listing failed");
                cx.restore_expansion(parent, was_expanded);
                return true;
            }
        };
        debug!(
            dir = %dir.display(),
            directories = listing.directories.len(),
            files = listing.files.len(),
            "merging directory"
        );

        let children: Vec<NodeId> = cx.tree.all_children(parent).collect();
        let mut missing: HashSet<NodeId> = children.iter().copied().collect();

        for entry in &listing.directories {
            let path = entry.path.as_path();
            if !cx.host.is_included(path) {
                continue;
            }
            if entry.is_symlink {
                if cx.guard.would_recurse(dir, path) {
                    debug!(path = %path.display(), "recursive symlink excluded");
                    continue;
                }
            }
            if let Some(node) = cx.get_or_create_folder_node(parent, path) {
                if entry.is_symlink {
                    cx.watchers.watch_symlink(path);
                }
                missing.remove(&node);
                self.frames.push(MergeFrame {
                    directory_path: entry.path.clone(),
                    parent: node,
                });
            }
        }

        for entry in &listing.files {
            let path = entry.path.as_path();
            if !cx.host.is_included(path) {
                continue;
            }
            if let Some(node) = cx.get_or_create_file_node(parent, path) {
                missing.remove(&node);
            }
        }

        for node in children.into_iter().filter(|id| missing.contains(id)) {
            let Some(entry) = cx.tree.get(node) else {
                continue;
            };
            if entry.is_member() {
                cx.listener.member_missing(node);
            } else {
                cx.remove_subtree(node);
            }
        }

        cx.restore_expansion(parent, was_expanded);
        true
    }

    fn complete(&self, cx: &mut Reconciler<'_>) {
        match self.origin {
            MergeOrigin::FullRescan { watcher } => {
                if let Some(id) = watcher {
                    cx.watchers.resume(id);
                }
                info!(nodes = cx.tree.node_count(), "full merge completed");
            }
            MergeOrigin::Subtree { node, was_expanded } => {
                if cx.tree.contains(node) {
                    cx.listener.items_invalidated(node);
                    cx.restore_expansion(node, was_expanded);
                }
                debug!(node = %node, "subtree merge completed");
            }
        }
        cx.listener.merge_completed();
    }
}
