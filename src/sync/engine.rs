use super::merger::DiskMerger;
use super::scheduler::{IdleOutcome, IdleScheduler};
use super::Reconciler;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError, TreeError};
use crate::fs::SymlinkGuard;
use crate::host::{HierarchyListener, NodeProperty, ProjectHost};
use crate::tree::path::{is_within, normalize};
use crate::tree::{HierarchyTree, Node};
use crate::types::{NodeId, NodeKind};
use crate::watch::{RawEvent, Waker, WatcherEventQueue, WatcherRegistry};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Counts for status reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStatus {
    pub root: PathBuf,
    pub nodes: usize,
    pub members: usize,
    pub non_members: usize,
    pub visible: usize,
    pub directories: usize,
    pub files: usize,
    pub symlink_watchers: usize,
    pub pending_records: usize,
    pub merge_in_progress: bool,
    pub show_all_files: bool,
}

/// Owns the tree and everything that keeps it in sync with disk.
///
/// All methods run on the consumer thread. Watcher threads only touch the
/// shared [`WatcherEventQueue`]; the host wakes the consumer through the
/// waker installed with [`set_waker`](Self::set_waker) and then calls
/// [`on_idle`](Self::on_idle).
pub struct SyncEngine<H: ProjectHost, L: HierarchyListener> {
    tree: HierarchyTree,
    host: H,
    listener: L,
    queue: Arc<WatcherEventQueue>,
    watchers: WatcherRegistry,
    guard: SymlinkGuard,
    scheduler: IdleScheduler,
    config: SyncConfig,
    attached: bool,
    started: bool,
}

impl<H: ProjectHost, L: HierarchyListener> SyncEngine<H, L> {
    /// Build an engine for `root`, which is canonicalized.
    ///
    /// OS watchers are used when `watch.enabled` is set; otherwise changes
    /// only arrive through [`queue`](Self::queue).
    pub fn new(root: impl AsRef<Path>, host: H, listener: L, config: SyncConfig) -> Result<Self> {
        let root = root.as_ref();
        config.validate()?;
        let canonical = dunce::canonicalize(root)
            .ok()
            .filter(|path| path.is_dir())
            .ok_or_else(|| SyncError::PathNotFound(root.to_path_buf()))?;
        let canonical = normalize(&canonical);

        let queue = Arc::new(WatcherEventQueue::new(
            config.watch.queue_capacity,
            config.watch.max_path_len,
        ));
        let watchers = if config.watch.enabled {
            WatcherRegistry::live(Arc::clone(&queue))
        } else {
            WatcherRegistry::inert(Arc::clone(&queue))
        };

        Ok(Self {
            tree: HierarchyTree::new(&canonical, config.tree.show_all_files),
            host,
            listener,
            scheduler: IdleScheduler::new(Arc::clone(&queue)),
            queue,
            watchers,
            guard: SymlinkGuard::new(&canonical),
            config,
            attached: false,
            started: false,
        })
    }

    /// Watch the root and schedule the initial full merge. Idempotent.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        let root_path = self.tree.root_path().to_path_buf();
        let watcher = self.watchers.watch_root(&root_path)?;
        let merger = DiskMerger::full_rescan(self.tree.root(), &root_path, None);
        self.queue.restore_merger(merger, self.queue.epoch());
        self.started = true;
        info!(root = %root_path.display(), watcher = %watcher, "sync started");
        Ok(())
    }

    /// Run one idle tick; see [`IdleScheduler::on_idle`].
    pub fn on_idle(&mut self, continue_idle: impl FnMut() -> bool) -> IdleOutcome {
        let (scheduler, mut cx) = self.split();
        scheduler.on_idle(&mut cx, continue_idle)
    }

    /// Start if needed and run until no work is pending.
    pub fn sync_now(&mut self) -> Result<IdleOutcome> {
        self.start()?;
        let mut total = IdleOutcome::default();
        loop {
            let outcome = self.on_idle(|| true);
            total.absorb(outcome);
            if outcome.closed || !outcome.work_remaining {
                return Ok(total);
            }
        }
    }

    /// Toggle show-all-files without touching the disk.
    ///
    /// Newly visible nodes are announced parents first, newly hidden ones
    /// children first. Returns the number of nodes that flipped.
    pub fn set_show_all_files(&mut self, show_all: bool) -> usize {
        let changed = self.tree.set_visibility_mode(show_all);
        if show_all {
            for id in &changed {
                self.announce_added(*id);
            }
        } else {
            for id in changed.iter().rev() {
                self.listener.item_deleted(*id);
            }
        }
        debug!(show_all, changed = changed.len(), "visibility mode changed");
        changed.len()
    }

    /// Make `path` a member item.
    ///
    /// Missing ancestor folders are created and existing ones promoted, so
    /// the item is reachable through visible folders. The host is expected
    /// to report the path as a member from now on.
    pub fn add_member(&mut self, path: &Path, kind: NodeKind) -> Result<NodeId> {
        let path = normalize(path);
        let root_path = self.tree.root_path().to_path_buf();
        if path == root_path || !is_within(&root_path, &path) {
            return Err(SyncError::OutsideRoot(path));
        }

        let mut ancestors: Vec<&Path> = path
            .ancestors()
            .skip(1)
            .take_while(|ancestor| *ancestor != root_path)
            .collect();
        ancestors.reverse();

        let mut parent = self.tree.root();
        for dir in ancestors {
            parent = self.member_node(parent, dir, NodeKind::Directory)?;
        }
        self.member_node(parent, &path, kind)
    }

    fn member_node(&mut self, parent: NodeId, path: &Path, kind: NodeKind) -> Result<NodeId> {
        match self.tree.find_by_path(path) {
            Some(id) => {
                let existing_kind = self.tree.get(id).map(Node::kind);
                if existing_kind != Some(kind) {
                    return Err(TreeError::DuplicatePath(path.to_path_buf()).into());
                }
                if self.tree.set_member(id, true)? {
                    self.announce_added(id);
                }
                self.listener.property_changed(id, NodeProperty::Icon);
                Ok(id)
            }
            None => {
                let insertion = self.tree.add_child(parent, Node::new(path, kind, true))?;
                self.listener
                    .item_added(parent, insertion.id, insertion.previous_visible);
                Ok(insertion.id)
            }
        }
    }

    /// Drop `path` from the members.
    ///
    /// Returns true if the node was kept as a non-member because the entry is
    /// still on disk, false if it was pruned.
    pub fn remove_member(&mut self, path: &Path) -> Result<bool> {
        let id = self
            .tree
            .find_by_path(path)
            .ok_or_else(|| SyncError::PathNotFound(path.to_path_buf()))?;
        if id == self.tree.root() {
            return Err(TreeError::RootRemoval.into());
        }

        if path.symlink_metadata().is_ok() && self.host.is_included(path) {
            if self.tree.set_member(id, false)? {
                self.listener.item_deleted(id);
            }
            self.listener.property_changed(id, NodeProperty::Icon);
            return Ok(true);
        }

        let (_, mut cx) = self.split();
        cx.remove_subtree(id);
        Ok(false)
    }

    /// Tear down: watchers are disposed and queued work is dropped.
    pub fn close(&mut self) {
        self.queue.close();
        self.watchers.clear();
        info!(root = %self.tree.root_path().display(), "sync closed");
    }

    /// Whether a consumer currently displays the tree.
    pub fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    /// Expansion state of `node`, from the listener when it tracks one.
    pub fn is_expanded(&self, node: NodeId) -> bool {
        self.listener
            .is_expanded(node)
            .unwrap_or_else(|| self.tree.is_expanded(node))
    }

    /// Expand or collapse `node`. Merges keep this state.
    pub fn expand(&mut self, node: NodeId, expanded: bool) -> Result<()> {
        self.tree.set_expanded(node, expanded)?;
        self.listener.set_expanded(node, expanded);
        self.listener.property_changed(node, NodeProperty::Expanded);
        Ok(())
    }

    /// Install the host callback that schedules idle ticks.
    pub fn set_waker(&self, waker: Waker) {
        self.queue.set_waker(waker);
    }

    /// Feed one raw event, as a watcher would.
    pub fn enqueue(&self, event: RawEvent) {
        self.queue.enqueue(event);
    }

    pub fn tree(&self) -> &HierarchyTree {
        &self.tree
    }

    pub fn root_path(&self) -> &Path {
        self.tree.root_path()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn queue(&self) -> &Arc<WatcherEventQueue> {
        &self.queue
    }

    pub fn watchers(&self) -> &WatcherRegistry {
        &self.watchers
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &IdleScheduler {
        &self.scheduler
    }

    pub fn status(&self) -> EngineStatus {
        let mut status = EngineStatus {
            root: self.tree.root_path().to_path_buf(),
            symlink_watchers: self.watchers.symlink_watch_paths().len(),
            pending_records: self.queue.len(),
            merge_in_progress: self.queue.has_merger(),
            show_all_files: self.tree.show_all_files(),
            ..EngineStatus::default()
        };
        for id in self.tree.descendants(self.tree.root()) {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            status.nodes += 1;
            if node.is_member() {
                status.members += 1;
            } else {
                status.non_members += 1;
            }
            if node.is_visible() {
                status.visible += 1;
            }
            match node.kind() {
                NodeKind::Directory => status.directories += 1,
                NodeKind::File => status.files += 1,
            }
        }
        status
    }

    fn announce_added(&mut self, id: NodeId) {
        if let Some(parent) = self.tree.get(id).and_then(Node::parent) {
            let previous = self.tree.previous_visible_sibling(id);
            self.listener.item_added(parent, id, previous);
        }
    }

    fn split(&mut self) -> (&mut IdleScheduler, Reconciler<'_>) {
        let Self {
            tree,
            host,
            listener,
            watchers,
            guard,
            scheduler,
            attached,
            ..
        } = self;
        let cx = Reconciler {
            tree,
            host: &*host,
            listener,
            watchers,
            guard: &*guard,
            attached: *attached,
        };
        (scheduler, cx)
    }
}
