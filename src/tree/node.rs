//! Tree node representation and sibling ordering.

use super::path::caption_of;
use crate::types::{NodeId, NodeKind};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// Sort priority of directories; lower priorities sort first.
pub const FOLDER_SORT_PRIORITY: i32 = 500;
/// Sort priority of files.
pub const FILE_SORT_PRIORITY: i32 = 1000;

/// One file or directory entry (or the root) of the hierarchy.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) path: PathBuf,
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) is_member: bool,
    pub(crate) is_visible: bool,
    pub(crate) expanded: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    /// A detached node ready for [`HierarchyTree::add_child`](super::HierarchyTree::add_child).
    ///
    /// Visibility is recomputed on insertion from membership and the tree's
    /// show-all-files mode.
    pub fn new(path: impl Into<PathBuf>, kind: NodeKind, is_member: bool) -> Self {
        let path = super::path::normalize(&path.into());
        Self {
            name: caption_of(&path),
            path,
            kind,
            is_member,
            is_visible: is_member,
            expanded: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_member(&self) -> bool {
        self.is_member
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_directory(&self) -> bool {
        self.kind == NodeKind::Directory
    }

    pub fn sort_priority(&self) -> i32 {
        match self.kind {
            NodeKind::Directory => FOLDER_SORT_PRIORITY,
            NodeKind::File => FILE_SORT_PRIORITY,
        }
    }
}

/// Total order over siblings: priority, then case-insensitive name, then
/// ordinal name so that names differing only in case stay distinct.
pub fn compare_nodes(a: &Node, b: &Node) -> Ordering {
    a.sort_priority()
        .cmp(&b.sort_priority())
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}
