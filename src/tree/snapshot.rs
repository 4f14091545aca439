use super::HierarchyTree;
use crate::types::{NodeId, NodeKind};
use serde::Serialize;
use std::path::PathBuf;

/// Point-in-time copy of a [`HierarchyTree`], in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeSnapshot {
    pub root: PathBuf,
    pub show_all_files: bool,
    pub entries: Vec<SnapshotEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotEntry {
    /// Path relative to the root.
    pub path: PathBuf,
    pub name: String,
    pub kind: NodeKind,
    pub depth: usize,
    pub member: bool,
    pub visible: bool,
}

impl TreeSnapshot {
    pub(super) fn capture(tree: &HierarchyTree) -> Self {
        let root_path = tree.root_path().to_path_buf();
        let mut entries = Vec::new();
        let mut stack: Vec<(NodeId, usize)> = tree
            .all_children(tree.root())
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .map(|id| (id, 1))
            .collect();

        while let Some((id, depth)) = stack.pop() {
            let Some(node) = tree.get(id) else {
                continue;
            };
            entries.push(SnapshotEntry {
                path: node
                    .path()
                    .strip_prefix(&root_path)
                    .unwrap_or(node.path())
                    .to_path_buf(),
                name: node.name().to_string(),
                kind: node.kind(),
                depth,
                member: node.is_member(),
                visible: node.is_visible(),
            });
            let children: Vec<NodeId> = tree.all_children(id).collect();
            stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
        }

        Self {
            root: root_path,
            show_all_files: tree.show_all_files(),
            entries,
        }
    }

    /// Entries a consumer would display under the current mode.
    pub fn visible(&self) -> impl Iterator<Item = &SnapshotEntry> + '_ {
        self.entries.iter().filter(|entry| entry.visible)
    }
}
