//! Collaborator traits implemented by the embedding application.

use crate::types::NodeId;
use std::path::Path;

/// Answers project questions the engine cannot decide from disk alone.
pub trait ProjectHost {
    /// Whether a disk entry belongs in the tree at all.
    fn is_included(&self, path: &Path) -> bool;

    /// Whether a path is a member item of the project manifest.
    fn is_member(&self, path: &Path) -> bool;

    /// Set once the project is being torn down; checked at the top of every
    /// idle iteration.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Node property a consumer may need to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeProperty {
    Icon,
    Caption,
    Expanded,
}

/// Receives tree change notifications.
///
/// Every method defaults to a no-op. The expansion provider returns `None`
/// by default, in which case the engine's shadow copy is used.
pub trait HierarchyListener {
    fn item_added(&mut self, _parent: NodeId, _node: NodeId, _previous_visible: Option<NodeId>) {}

    fn item_deleted(&mut self, _node: NodeId) {}

    fn items_invalidated(&mut self, _node: NodeId) {}

    fn property_changed(&mut self, _node: NodeId, _property: NodeProperty) {}

    /// A member node whose disk entry is gone.
    fn member_missing(&mut self, _node: NodeId) {}

    /// A merge finished. Consumers restore per-node decorations and
    /// selection here.
    fn merge_completed(&mut self) {}

    fn is_expanded(&self, _node: NodeId) -> Option<bool> {
        None
    }

    fn set_expanded(&mut self, _node: NodeId, _expanded: bool) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl HierarchyListener for NullListener {}
