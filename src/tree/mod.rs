//! In-memory mirror of a directory subtree.
//!
//! The tree is an arena of [`Node`]s addressed by generational [`NodeId`]s,
//! plus a path map so every live node is reachable by its normalized path.
//! Siblings are kept sorted with [`compare_nodes`].

mod arena;
mod node;
pub mod path;
mod snapshot;

pub use node::{compare_nodes, Node, FILE_SORT_PRIORITY, FOLDER_SORT_PRIORITY};
pub use path::{normalize, PathKey};
pub use snapshot::{SnapshotEntry, TreeSnapshot};

use crate::error::TreeError;
use crate::types::{NodeId, NodeKind};
use arena::Arena;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Result of [`HierarchyTree::add_child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Insertion {
    pub id: NodeId,
    /// Closest visible sibling sorting before the new node.
    pub previous_visible: Option<NodeId>,
}

#[derive(Debug)]
pub struct HierarchyTree {
    nodes: Arena<Node>,
    paths: HashMap<PathKey, NodeId>,
    root: NodeId,
    show_all_files: bool,
}

impl HierarchyTree {
    /// Create a tree whose root node stands for `root_path`.
    ///
    /// The root is a visible member directory and starts expanded.
    pub fn new(root_path: impl Into<PathBuf>, show_all_files: bool) -> Self {
        let mut root_node = Node::new(root_path, NodeKind::Directory, true);
        root_node.is_visible = true;
        root_node.expanded = true;
        let key = PathKey::new(&root_node.path);

        let mut nodes = Arena::new();
        let root = nodes.insert(root_node);
        let mut paths = HashMap::new();
        paths.insert(key, root);

        Self {
            nodes,
            paths,
            root,
            show_all_files,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_path(&self) -> &Path {
        // The root is never removed.
        self.nodes
            .get(self.root)
            .map(|node| node.path.as_path())
            .unwrap_or_else(|| Path::new(""))
    }

    pub fn show_all_files(&self) -> bool {
        self.show_all_files
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some()
    }

    /// All live nodes in slot order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<NodeId> {
        self.paths.get(&PathKey::new(path)).copied()
    }

    /// Node of the directory containing `path`, if the tree has one.
    pub fn parent_folder_for_path(&self, path: &Path) -> Option<NodeId> {
        let normalized = normalize(path);
        let parent = normalized.parent()?;
        self.find_by_path(parent)
            .filter(|id| self.nodes.get(*id).is_some_and(Node::is_directory))
    }

    /// Insert `node` below `parent` at its sorted position.
    pub fn add_child(&mut self, parent: NodeId, mut node: Node) -> Result<Insertion, TreeError> {
        let parent_node = self.nodes.get(parent).ok_or(TreeError::UnknownNode(parent))?;
        let key = PathKey::new(&node.path);
        if self.paths.contains_key(&key) {
            return Err(TreeError::DuplicatePath(node.path));
        }

        node.is_visible = node.is_member || self.show_all_files;
        node.parent = Some(parent);
        node.children.clear();

        let index = self.insertion_index(&parent_node.children, &node);
        let previous_visible = self.previous_visible(&parent_node.children[..index]);

        let id = self.nodes.insert(node);
        self.paths.insert(key, id);
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.insert(index, id);
        }
        Ok(Insertion {
            id,
            previous_visible,
        })
    }

    /// Unlink `node` and everything below it.
    ///
    /// Returns the removed ids, every node listed before its parent.
    pub fn remove_child(&mut self, parent: NodeId, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        if node == self.root {
            return Err(TreeError::RootRemoval);
        }
        let parent_node = self
            .nodes
            .get_mut(parent)
            .ok_or(TreeError::UnknownNode(parent))?;
        let position = parent_node
            .children
            .iter()
            .position(|child| *child == node)
            .ok_or(TreeError::NodeNotFound { parent, node })?;
        parent_node.children.remove(position);

        let mut removed = self.preorder_from(node);
        removed.reverse();
        for id in &removed {
            if let Some(gone) = self.nodes.remove(*id) {
                let key = PathKey::new(&gone.path);
                if self.paths.get(&key) == Some(id) {
                    self.paths.remove(&key);
                }
            }
        }
        Ok(removed)
    }

    /// Closest visible sibling sorting before `id`.
    pub fn previous_visible_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(id)?.parent?;
        let siblings = self.children_slice(parent);
        let index = siblings.iter().position(|sibling| *sibling == id)?;
        self.previous_visible(&siblings[..index])
    }

    pub fn all_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children_slice(id).iter().copied()
    }

    pub fn visible_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children_slice(id)
            .iter()
            .copied()
            .filter(|child| self.nodes.get(*child).is_some_and(Node::is_visible))
    }

    /// Every node below `id` in preorder, `id` itself excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = self.preorder_from(id);
        if !order.is_empty() {
            order.remove(0);
        }
        order
    }

    /// Switch the show-all-files mode.
    ///
    /// Only non-member nodes change; the returned ids are in preorder, so a
    /// parent always precedes its children.
    pub fn set_visibility_mode(&mut self, show_all: bool) -> Vec<NodeId> {
        self.show_all_files = show_all;
        let mut changed = Vec::new();
        for id in self.descendants(self.root) {
            if let Some(node) = self.nodes.get_mut(id) {
                if !node.is_member && node.is_visible != show_all {
                    node.is_visible = show_all;
                    changed.push(id);
                }
            }
        }
        changed
    }

    /// Flip membership of `id`. Returns true if its visibility changed.
    pub fn set_member(&mut self, id: NodeId, is_member: bool) -> Result<bool, TreeError> {
        let show_all = self.show_all_files;
        let is_root = id == self.root;
        let node = self.nodes.get_mut(id).ok_or(TreeError::UnknownNode(id))?;
        if is_root {
            return Ok(false);
        }
        node.is_member = is_member;
        let visible = is_member || show_all;
        let changed = node.is_visible != visible;
        node.is_visible = visible;
        Ok(changed)
    }

    /// Move `id` to `new_path` within its current parent, re-sorting it.
    ///
    /// A new path whose key equals the old one (a case-only rename on a
    /// case-insensitive filesystem) is accepted.
    pub fn rename(&mut self, id: NodeId, new_path: &Path) -> Result<Insertion, TreeError> {
        let node = self.nodes.get(id).ok_or(TreeError::UnknownNode(id))?;
        let parent = node.parent.ok_or(TreeError::RootRemoval)?;
        let old_key = PathKey::new(&node.path);
        let new_key = PathKey::new(new_path);
        if new_key != old_key && self.paths.contains_key(&new_key) {
            return Err(TreeError::DuplicatePath(new_path.to_path_buf()));
        }

        let old_path = node.path.clone();
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.retain(|child| *child != id);
        }
        self.paths.remove(&old_key);

        let new_path = normalize(new_path);
        self.move_descendants(id, &old_path, &new_path);
        if let Some(node) = self.nodes.get_mut(id) {
            node.name = path::caption_of(&new_path);
            node.path = new_path;
        }

        let (index, previous_visible) = {
            let siblings = self.children_slice(parent);
            let index = match self.nodes.get(id) {
                Some(node) => self.insertion_index(siblings, node),
                None => siblings.len(),
            };
            (index, self.previous_visible(&siblings[..index]))
        };
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            parent_node.children.insert(index, id);
        }
        self.paths.insert(new_key, id);
        Ok(Insertion {
            id,
            previous_visible,
        })
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.nodes.get(id).is_some_and(Node::is_expanded)
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> Result<(), TreeError> {
        let node = self.nodes.get_mut(id).ok_or(TreeError::UnknownNode(id))?;
        node.expanded = expanded;
        Ok(())
    }

    /// Serializable view of the whole tree in display order.
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot::capture(self)
    }

    fn children_slice(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    fn insertion_index(&self, siblings: &[NodeId], node: &Node) -> usize {
        let sorts_before = |sibling: &NodeId| {
            self.nodes
                .get(*sibling)
                .is_some_and(|existing| compare_nodes(node, existing) == Ordering::Less)
        };
        match siblings.last() {
            None => 0,
            Some(last) if !sorts_before(last) => siblings.len(),
            Some(_) => siblings
                .iter()
                .position(sorts_before)
                .unwrap_or(siblings.len()),
        }
    }

    fn previous_visible(&self, before: &[NodeId]) -> Option<NodeId> {
        before
            .iter()
            .rev()
            .copied()
            .find(|id| self.nodes.get(*id).is_some_and(Node::is_visible))
    }

    /// Rewrite the `old_prefix` of every path below `id` to `new_prefix`.
    /// Names are unchanged, so sibling order holds.
    fn move_descendants(&mut self, id: NodeId, old_prefix: &Path, new_prefix: &Path) {
        let moved: Vec<(NodeId, PathBuf)> = self
            .preorder_from(id)
            .into_iter()
            .skip(1)
            .filter_map(|descendant| {
                let node = self.nodes.get(descendant)?;
                let rest = node.path.strip_prefix(old_prefix).ok()?;
                Some((descendant, new_prefix.join(rest)))
            })
            .collect();
        for (descendant, _) in &moved {
            if let Some(node) = self.nodes.get(*descendant) {
                self.paths.remove(&PathKey::new(&node.path));
            }
        }
        for (descendant, path) in moved {
            self.paths.insert(PathKey::new(&path), descendant);
            if let Some(node) = self.nodes.get_mut(descendant) {
                node.path = path;
            }
        }
    }

    fn preorder_from(&self, start: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        if !self.contains(start) {
            return order;
        }
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children_slice(id).iter().rev().copied());
        }
        order
    }
}
