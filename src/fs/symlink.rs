//! Symlink detection and cycle prevention.

use crate::tree::path::{is_within, normalize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A path with every link resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalPath(PathBuf);

impl CanonicalPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for CanonicalPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Decides whether a symlinked directory may be descended into.
///
/// A link is refused when its target is, or contains, the directory it
/// appears in or any logical ancestor of it below the watched root. Walking
/// into such a link would revisit a directory already on the current path.
#[derive(Debug, Clone)]
pub struct SymlinkGuard {
    root: PathBuf,
}

impl SymlinkGuard {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: normalize(root.as_ref()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// False on any metadata error.
    pub fn is_symlink(&self, path: &Path) -> bool {
        fs::symlink_metadata(path)
            .map(|meta| meta.file_type().is_symlink())
            .unwrap_or(false)
    }

    pub fn canonicalize(&self, path: &Path) -> Option<CanonicalPath> {
        dunce::canonicalize(path).ok().map(CanonicalPath)
    }

    /// True if following `candidate`, found inside `ancestor_dir`, would
    /// loop back into the directories above it.
    pub fn would_recurse(&self, ancestor_dir: &Path, candidate: &Path) -> bool {
        let Some(target) = self.canonicalize(candidate) else {
            debug!(path = %candidate.display(), "unresolvable symlink treated as recursive");
            return true;
        };

        let ancestor_dir = normalize(ancestor_dir);
        let mut current = Some(ancestor_dir.as_path());
        while let Some(dir) = current {
            if let Some(canonical) = self.canonicalize(dir) {
                if canonical.as_path().starts_with(target.as_path()) {
                    debug!(
                        link = %candidate.display(),
                        target = %target.as_path().display(),
                        ancestor = %dir.display(),
                        "symlink cycle detected"
                    );
                    return true;
                }
            }
            if dir == self.root || !is_within(&self.root, dir) {
                break;
            }
            current = dir.parent();
        }
        false
    }
}
