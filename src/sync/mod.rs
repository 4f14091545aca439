//! Reconciliation of the tree against disk.
//!
//! [`SyncEngine`] owns every piece of state. Each idle tick borrows the
//! pieces into a [`Reconciler`], which is what [`DiskMerger`] and record
//! application operate on.

mod apply;
mod engine;
pub mod merger;
mod scheduler;

pub use engine::{EngineStatus, SyncEngine};
pub use merger::{DiskMerger, MergeOrigin};
pub use scheduler::{IdleOutcome, IdleScheduler};

use crate::fs::SymlinkGuard;
use crate::host::{HierarchyListener, NodeProperty, ProjectHost};
use crate::tree::{HierarchyTree, Node};
use crate::types::{NodeId, NodeKind};
use crate::watch::WatcherRegistry;
use std::path::Path;
use tracing::{debug, warn};

/// Mutable view over the engine state for one unit of work.
pub struct Reconciler<'a> {
    pub(crate) tree: &'a mut HierarchyTree,
    pub(crate) host: &'a dyn ProjectHost,
    pub(crate) listener: &'a mut dyn HierarchyListener,
    pub(crate) watchers: &'a mut WatcherRegistry,
    pub(crate) guard: &'a SymlinkGuard,
    /// Whether a consumer is displaying the tree; expansion state is only
    /// pushed to the listener when attached.
    pub(crate) attached: bool,
}

impl Reconciler<'_> {
    /// Current expansion of `node`, preferring the listener's answer.
    pub(crate) fn expansion(&self, node: NodeId) -> bool {
        self.listener
            .is_expanded(node)
            .unwrap_or_else(|| self.tree.is_expanded(node))
    }

    pub(crate) fn restore_expansion(&mut self, node: NodeId, expanded: bool) {
        if !self.attached || !self.tree.contains(node) {
            return;
        }
        if self.tree.set_expanded(node, expanded).is_ok() {
            self.listener.set_expanded(node, expanded);
        }
    }

    /// Existing directory node for `path`, or a new non-member one.
    ///
    /// A non-member node of the wrong kind is replaced. Returns `None` when
    /// the path is held by a member file or the tree refuses the insert.
    pub(crate) fn get_or_create_folder_node(&mut self, parent: NodeId, path: &Path) -> Option<NodeId> {
        self.get_or_create(parent, path, NodeKind::Directory)
    }

    pub(crate) fn get_or_create_file_node(&mut self, parent: NodeId, path: &Path) -> Option<NodeId> {
        self.get_or_create(parent, path, NodeKind::File)
    }

    fn get_or_create(&mut self, parent: NodeId, path: &Path, kind: NodeKind) -> Option<NodeId> {
        if let Some(existing) = self.tree.find_by_path(path) {
            let node = self.tree.get(existing)?;
            if node.kind() == kind {
                return Some(existing);
            }
            if node.is_member() {
                debug!(path = %path.display(), "member kind differs from disk, leaving as is");
                return None;
            }
            debug!(path = %path.display(), "entry kind changed, recreating node");
            self.remove_subtree(existing);
        }

        let node = Node::new(path, kind, self.host.is_member(path));
        match self.tree.add_child(parent, node) {
            Ok(insertion) => {
                self.announce_added(parent, insertion.id, insertion.previous_visible);
                if kind == NodeKind::Directory && self.attached {
                    self.restore_expansion(insertion.id, false);
                }
                Some(insertion.id)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to add node");
                None
            }
        }
    }

    pub(crate) fn announce_added(&mut self, parent: NodeId, node: NodeId, previous_visible: Option<NodeId>) {
        if self.tree.get(node).is_some_and(Node::is_visible) {
            self.listener.item_added(parent, node, previous_visible);
        }
    }

    /// Remove `node` and its subtree, disposing symlink watchers below it.
    /// Visible nodes are reported deleted, children first.
    pub(crate) fn remove_subtree(&mut self, node: NodeId) {
        let Some(parent) = self.tree.get(node).and_then(Node::parent) else {
            return;
        };

        let mut affected = self.tree.descendants(node);
        affected.push(node);
        let mut visible = Vec::new();
        for id in &affected {
            if let Some(entry) = self.tree.get(*id) {
                if entry.is_directory() {
                    self.watchers.unwatch(entry.path());
                }
                if entry.is_visible() {
                    visible.push(*id);
                }
            }
        }

        match self.tree.remove_child(parent, node) {
            Ok(removed) => {
                for id in removed.into_iter().filter(|id| visible.contains(id)) {
                    self.listener.item_deleted(id);
                }
            }
            Err(err) => warn!(node = %node, error = %err, "failed to remove subtree"),
        }
    }

    /// Handle a node whose disk entry is gone: non-members are pruned,
    /// members are reported missing and their subtrees handled the same way.
    pub(crate) fn prune_missing(&mut self, node: NodeId) {
        let Some(entry) = self.tree.get(node) else {
            return;
        };
        if !entry.is_member() {
            self.remove_subtree(node);
            return;
        }
        if entry.is_directory() {
            self.watchers.unwatch(entry.path());
        }
        self.listener.member_missing(node);
        self.listener.property_changed(node, NodeProperty::Icon);
        let children: Vec<NodeId> = self.tree.all_children(node).collect();
        for child in children {
            self.prune_missing(child);
        }
    }
}
