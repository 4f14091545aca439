//! Shadowtree: an in-memory project tree kept in sync with disk
//!
//! A [`HierarchyTree`](tree::HierarchyTree) mirrors a directory subtree. The
//! [`SyncEngine`](sync::SyncEngine) reconciles it against the filesystem in
//! bounded units of work: resumable directory merges and queued watcher
//! events, interleaved by cooperative idle ticks on the consumer thread.

pub mod config;
pub mod error;
pub mod fs;
pub mod host;
pub mod logging;
pub mod sync;
pub mod tooling;
pub mod tree;
pub mod types;
pub mod watch;

pub use config::{ConfigLoader, SyncConfig};
pub use error::{ConfigError, Result, SyncError, TreeError, WatchError};
pub use host::{HierarchyListener, NodeProperty, NullListener, ProjectHost};
pub use sync::{DiskMerger, IdleOutcome, MergeOrigin, SyncEngine};
pub use tree::{HierarchyTree, Insertion, Node};
pub use types::{NodeId, NodeKind, WatcherId};
pub use watch::{ChangeKind, ChangeRecord, RawEvent, RawEventKind, WatcherEventQueue};
