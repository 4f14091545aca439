//! Applying one queued [`ChangeRecord`] to the tree.

use super::merger::DiskMerger;
use super::Reconciler;
use crate::host::NodeProperty;
use crate::tree::path::is_within;
use crate::watch::{ChangeKind, ChangeRecord};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

fn exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Apply `record`. Returns a merger when the record needs a disk walk: a
/// full rescan, or a directory that appeared.
pub(crate) fn apply_record(cx: &mut Reconciler<'_>, record: ChangeRecord) -> Option<DiskMerger> {
    debug!(kind = ?record.kind, path = %record.path.display(), rename = record.is_rename_pair, "applying change");
    match record.kind {
        ChangeKind::FullRescan => Some(DiskMerger::full_rescan(
            cx.tree.root(),
            cx.tree.root_path(),
            record.watcher,
        )),
        ChangeKind::Deleted => {
            apply_deleted(cx, &record.path);
            None
        }
        ChangeKind::Created => apply_created(cx, &record.path),
        ChangeKind::Changed => apply_changed(cx, &record.path),
        ChangeKind::Renamed => match record.old_path {
            Some(old_path) => apply_renamed(cx, &old_path, &record.path),
            None => apply_created(cx, &record.path),
        },
    }
}

fn apply_deleted(cx: &mut Reconciler<'_>, path: &Path) {
    if exists(path) && cx.host.is_included(path) {
        debug!(path = %path.display(), "entry still present, ignoring delete");
        return;
    }
    if let Some(node) = cx.tree.find_by_path(path) {
        if node == cx.tree.root() {
            return;
        }
        cx.prune_missing(node);
    }
}

fn apply_created(cx: &mut Reconciler<'_>, path: &Path) -> Option<DiskMerger> {
    if let Some(node) = cx.tree.find_by_path(path) {
        cx.listener.property_changed(node, NodeProperty::Icon);
        return None;
    }
    if !exists(path) || !cx.host.is_included(path) {
        return None;
    }
    // No parent yet means the watcher fell behind; a later merge picks the
    // entry up.
    let parent = cx.tree.parent_folder_for_path(path)?;
    let was_expanded = cx.expansion(parent);

    let merger = if path.is_dir() {
        if cx.guard.is_symlink(path) {
            let parent_dir = path.parent().unwrap_or(path);
            if cx.guard.would_recurse(parent_dir, path) {
                debug!(path = %path.display(), "recursive symlink excluded");
                return None;
            }
        }
        cx.get_or_create_folder_node(parent, path).map(|folder| {
            if cx.guard.is_symlink(path) {
                cx.watchers.watch_symlink(path);
            }
            let folder_expanded = cx.expansion(folder);
            DiskMerger::subtree(folder, path, folder_expanded)
        })
    } else {
        cx.get_or_create_file_node(parent, path);
        None
    };

    cx.restore_expansion(parent, was_expanded);
    merger
}

/// Attribute changes only matter when they flip inclusion.
fn apply_changed(cx: &mut Reconciler<'_>, path: &Path) -> Option<DiskMerger> {
    let included = exists(path) && cx.host.is_included(path);
    match (cx.tree.find_by_path(path), included) {
        (Some(_), false) => {
            apply_deleted(cx, path);
            None
        }
        (None, true) => apply_created(cx, path),
        _ => None,
    }
}

fn apply_renamed(cx: &mut Reconciler<'_>, old_path: &Path, new_path: &Path) -> Option<DiskMerger> {
    if let Some(node) = cx.tree.find_by_path(old_path) {
        let target_free = cx.tree.find_by_path(new_path).map_or(true, |other| other == node);
        if target_free {
            let moved: Vec<PathBuf> = cx
                .watchers
                .symlink_watch_paths()
                .into_iter()
                .filter(|watched| is_within(old_path, watched))
                .collect();
            match cx.tree.rename(node, new_path) {
                Ok(_) => {
                    for watched in moved {
                        if let Ok(rest) = watched.strip_prefix(old_path) {
                            cx.watchers.unwatch(&watched);
                            cx.watchers.watch_symlink(&new_path.join(rest));
                        }
                    }
                    cx.listener.property_changed(node, NodeProperty::Caption);
                    return None;
                }
                Err(err) => warn!(path = %new_path.display(), error = %err, "rename failed"),
            }
        }
    }
    apply_deleted(cx, old_path);
    apply_created(cx, new_path)
}
