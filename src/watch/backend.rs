//! OS watcher registrations feeding a [`WatcherEventQueue`].

use super::events::RawEvent;
use super::queue::WatcherEventQueue;
use crate::error::WatchError;
use crate::tree::PathKey;
use crate::types::WatcherId;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Real notify watchers.
    Live,
    /// Registrations are tracked but nothing is watched; events arrive only
    /// through the queue directly.
    Inert,
}

struct Registration {
    path: PathBuf,
    is_symlink: bool,
    watcher: Option<RecommendedWatcher>,
}

/// Owns the root watcher and one watcher per accepted symlinked directory.
pub struct WatcherRegistry {
    queue: Arc<WatcherEventQueue>,
    mode: Mode,
    next_id: u32,
    entries: HashMap<WatcherId, Registration>,
    by_path: HashMap<PathKey, WatcherId>,
}

impl std::fmt::Debug for WatcherRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherRegistry")
            .field("mode", &self.mode)
            .field("watchers", &self.entries.len())
            .finish()
    }
}

impl WatcherRegistry {
    pub fn live(queue: Arc<WatcherEventQueue>) -> Self {
        Self::with_mode(queue, Mode::Live)
    }

    pub fn inert(queue: Arc<WatcherEventQueue>) -> Self {
        Self::with_mode(queue, Mode::Inert)
    }

    fn with_mode(queue: Arc<WatcherEventQueue>, mode: Mode) -> Self {
        Self {
            queue,
            mode,
            next_id: 0,
            entries: HashMap::new(),
            by_path: HashMap::new(),
        }
    }

    /// Watch the project root recursively.
    pub fn watch_root(&mut self, root: &Path) -> Result<WatcherId, WatchError> {
        self.register(root, false)
    }

    /// Watch an accepted symlinked directory. Idempotent per path; failures
    /// are logged and leave the directory unwatched.
    pub fn watch_symlink(&mut self, path: &Path) -> Option<WatcherId> {
        match self.register(path, true) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!(error = %err, "symlink watcher not registered");
                None
            }
        }
    }

    fn register(&mut self, path: &Path, is_symlink: bool) -> Result<WatcherId, WatchError> {
        let key = PathKey::new(path);
        if let Some(id) = self.by_path.get(&key) {
            return Ok(*id);
        }

        let id = WatcherId(self.next_id);
        let watcher = match self.mode {
            Mode::Live => Some(self.spawn_watcher(id, path)?),
            Mode::Inert => None,
        };
        self.next_id += 1;
        debug!(watcher = %id, path = %path.display(), is_symlink, "watcher registered");
        self.entries.insert(
            id,
            Registration {
                path: path.to_path_buf(),
                is_symlink,
                watcher,
            },
        );
        self.by_path.insert(key, id);
        Ok(id)
    }

    fn spawn_watcher(&self, id: WatcherId, path: &Path) -> Result<RecommendedWatcher, WatchError> {
        let queue = Arc::clone(&self.queue);
        let notify_err = |source| WatchError::Notify {
            path: path.to_path_buf(),
            source,
        };
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if event.need_rescan() => queue.on_overflow(Some(id)),
            Ok(event) => {
                for raw in translate_event(event) {
                    queue.enqueue(raw);
                }
            }
            Err(err) => {
                warn!(watcher = %id, error = %err, "watcher error");
                queue.on_overflow(Some(id));
            }
        })
        .map_err(notify_err)?;
        watcher
            .watch(path, RecursiveMode::Recursive)
            .map_err(notify_err)?;
        Ok(watcher)
    }

    /// Dispose the watcher registered for `path`, if any.
    pub fn unwatch(&mut self, path: &Path) -> bool {
        let Some(id) = self.by_path.remove(&PathKey::new(path)) else {
            return false;
        };
        if let Some(mut entry) = self.entries.remove(&id) {
            if let Some(watcher) = entry.watcher.as_mut() {
                if let Err(err) = watcher.unwatch(&entry.path) {
                    debug!(watcher = %id, error = %err, "unwatch failed");
                }
            }
            debug!(watcher = %id, path = %entry.path.display(), "watcher disposed");
        }
        true
    }

    /// Re-enable a watcher after the full rescan its overflow caused.
    ///
    /// Live watchers are re-registered with the OS, since the failed
    /// registration may have stopped delivering events.
    pub fn resume(&mut self, id: WatcherId) {
        let Some(path) = self.entries.get(&id).map(|entry| entry.path.clone()) else {
            debug!(watcher = %id, "resume for unknown watcher");
            return;
        };
        if self.mode == Mode::Inert {
            debug!(watcher = %id, "watcher resumed");
            return;
        }
        match self.spawn_watcher(id, &path) {
            Ok(watcher) => {
                if let Some(entry) = self.entries.get_mut(&id) {
                    entry.watcher = Some(watcher);
                }
                info!(watcher = %id, path = %path.display(), "watcher resumed");
            }
            Err(err) => warn!(watcher = %id, error = %err, "watcher could not be resumed"),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        self.by_path.contains_key(&PathKey::new(path))
    }

    /// Paths of the dedicated symlink watchers, sorted.
    pub fn symlink_watch_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .entries
            .values()
            .filter(|entry| entry.is_symlink)
            .map(|entry| entry.path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Dispose every watcher.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_path.clear();
    }
}

/// Map one notify event onto raw events. Content-only changes and access
/// notifications carry nothing the tree needs.
pub fn translate_event(event: Event) -> Vec<RawEvent> {
    let Event { kind, mut paths, .. } = event;
    match kind {
        EventKind::Create(_) => paths.into_iter().map(RawEvent::created).collect(),
        EventKind::Remove(_) => paths.into_iter().map(RawEvent::deleted).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if paths.len() >= 2 => {
            let new_path = paths.swap_remove(1);
            let old_path = paths.swap_remove(0);
            vec![RawEvent::renamed(old_path, new_path)]
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.into_iter().map(RawEvent::deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.into_iter().map(RawEvent::created).collect()
        }
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .into_iter()
            .map(|path| {
                if path.symlink_metadata().is_ok() {
                    RawEvent::created(path)
                } else {
                    RawEvent::deleted(path)
                }
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => {
            paths.into_iter().map(RawEvent::changed).collect()
        }
        _ => Vec::new(),
    }
}
