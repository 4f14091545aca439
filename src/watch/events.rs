//! Raw watcher notifications and the typed records they become.

use crate::tree::path::eq_ignore_case;
use crate::types::WatcherId;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RawEventKind {
    Created,
    Deleted,
    /// Attributes changed; may affect inclusion.
    Changed,
    Renamed,
}

/// One notification as delivered by an OS watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub kind: RawEventKind,
    pub path: PathBuf,
    /// Previous path, set for [`RawEventKind::Renamed`] only.
    pub old_path: Option<PathBuf>,
}

impl RawEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self::plain(RawEventKind::Created, path)
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self::plain(RawEventKind::Deleted, path)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::plain(RawEventKind::Changed, path)
    }

    pub fn renamed(old_path: impl Into<PathBuf>, new_path: impl Into<PathBuf>) -> Self {
        Self {
            kind: RawEventKind::Renamed,
            path: new_path.into(),
            old_path: Some(old_path.into()),
        }
    }

    fn plain(kind: RawEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            old_path: None,
        }
    }

    /// Split into the records the queue stores.
    ///
    /// A rename becomes a Deleted/Created pair unless only the letter case
    /// changed, which stays a single Renamed record.
    pub fn into_records(self) -> Vec<ChangeRecord> {
        match (self.kind, self.old_path) {
            (RawEventKind::Created, _) => vec![ChangeRecord::new(ChangeKind::Created, self.path)],
            (RawEventKind::Deleted, _) => vec![ChangeRecord::new(ChangeKind::Deleted, self.path)],
            (RawEventKind::Changed, _) => vec![ChangeRecord::new(ChangeKind::Changed, self.path)],
            (RawEventKind::Renamed, None) => vec![ChangeRecord::new(ChangeKind::Created, self.path)],
            (RawEventKind::Renamed, Some(old_path)) if eq_ignore_case(&old_path, &self.path) => {
                vec![ChangeRecord {
                    old_path: Some(old_path),
                    ..ChangeRecord::new(ChangeKind::Renamed, self.path)
                }]
            }
            (RawEventKind::Renamed, Some(old_path)) => vec![
                ChangeRecord {
                    is_rename_pair: true,
                    ..ChangeRecord::new(ChangeKind::Deleted, old_path)
                },
                ChangeRecord {
                    is_rename_pair: true,
                    ..ChangeRecord::new(ChangeKind::Created, self.path)
                },
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Deleted,
    Changed,
    Renamed,
    /// Watcher overflow; everything must be re-read from disk.
    FullRescan,
}

/// Queued unit of change work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub path: PathBuf,
    pub old_path: Option<PathBuf>,
    pub is_rename_pair: bool,
    /// Watcher to re-enable once a full rescan completes.
    pub watcher: Option<WatcherId>,
}

impl ChangeRecord {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            old_path: None,
            is_rename_pair: false,
            watcher: None,
        }
    }

    pub fn full_rescan(watcher: Option<WatcherId>) -> Self {
        Self {
            watcher,
            ..Self::new(ChangeKind::FullRescan, PathBuf::new())
        }
    }

    pub fn is_full_rescan(&self) -> bool {
        self.kind == ChangeKind::FullRescan
    }

    /// Longest path carried by the record, in bytes.
    pub(crate) fn path_len(&self) -> usize {
        let len = |path: &Path| path.as_os_str().len();
        len(&self.path).max(self.old_path.as_deref().map_or(0, len))
    }
}
