//! Error types for the tree, the watchers, configuration, and the engine.

use crate::types::NodeId;
use std::path::PathBuf;

/// Structural failures of [`HierarchyTree`](crate::tree::HierarchyTree) edits.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {node} is not a child of {parent}")]
    NodeNotFound { parent: NodeId, node: NodeId },

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("a node already exists for {0}")]
    DuplicatePath(PathBuf),

    #[error("the root node cannot be removed")]
    RootRemoval,
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("configuration error: {0}")]
    Invalid(String),
}

/// Top-level error for engine construction and manifest operations.
///
/// The reconciliation loop itself never returns errors; see
/// [`SyncEngine::on_idle`](crate::sync::SyncEngine::on_idle).
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("path is outside the watched root: {0}")]
    OutsideRoot(PathBuf),

    #[error("path not found: {0}")]
    PathNotFound(PathBuf),
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
