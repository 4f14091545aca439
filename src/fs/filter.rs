//! Inclusion rules and the filesystem-backed [`ProjectHost`].

use crate::config::TreeConfig;
use crate::host::ProjectHost;
use crate::tree::path::{is_within, normalize};
use crate::tree::PathKey;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decides which paths under the root are excluded by name or pattern.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    hidden_names: HashSet<String>,
    ignore_patterns: Vec<String>,
    include_hidden: bool,
}

impl PathFilter {
    pub fn new(root: impl AsRef<Path>, config: &TreeConfig) -> Self {
        Self {
            root: normalize(root.as_ref()),
            hidden_names: config.hidden_names.iter().cloned().collect(),
            ignore_patterns: config.ignore_patterns.clone(),
            include_hidden: config.include_hidden,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True if `path` is outside the root or excluded by any rule. The root
    /// itself is never excluded.
    pub fn is_excluded(&self, path: &Path) -> bool {
        let path = normalize(path);
        if !is_within(&self.root, &path) {
            return true;
        }
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return true;
        };
        if relative.as_os_str().is_empty() {
            return false;
        }

        for component in relative.components() {
            let name = component.as_os_str().to_string_lossy();
            if self.hidden_names.contains(name.as_ref()) {
                return true;
            }
            if !self.include_hidden && name.starts_with('.') {
                return true;
            }
        }

        let relative = relative.to_string_lossy();
        self.ignore_patterns
            .iter()
            .any(|pattern| matches_pattern(&relative, pattern))
    }
}

/// Glob-like matching on a root-relative path.
///
/// `**` splits the pattern into a prefix and a suffix; a single `*` is a
/// prefix and a suffix on the same path; anything else matches by equality or
/// containment of a whole path segment run.
pub fn matches_pattern(path: &str, pattern: &str) -> bool {
    let path = path.replace('\\', "/");
    let pattern = pattern.replace('\\', "/");

    if pattern.contains("**") {
        let parts: Vec<&str> = pattern.split("**").collect();
        if parts.len() == 2 {
            let (prefix, suffix) = (parts[0], parts[1].trim_start_matches('/'));
            return match (prefix.is_empty(), suffix.is_empty()) {
                (true, true) => true,
                (true, false) => matches_pattern_tail(&path, suffix),
                (false, true) => {
                    path == prefix.trim_end_matches('/') || path.starts_with(prefix)
                }
                (false, false) => path.starts_with(prefix) && matches_pattern_tail(&path, suffix),
            };
        }
    }

    if pattern.contains('*') {
        let parts: Vec<&str> = pattern.split('*').collect();
        if parts.len() == 2 {
            let file_name = path.rsplit('/').next().unwrap_or(&path);
            let subject = if pattern.contains('/') { path.as_str() } else { file_name };
            return subject.len() >= parts[0].len() + parts[1].len()
                && subject.starts_with(parts[0])
                && subject.ends_with(parts[1]);
        }
    }

    matches_segments(&path, &pattern)
}

fn matches_segments(path: &str, pattern: &str) -> bool {
    path == pattern
        || path.starts_with(&format!("{}/", pattern))
        || path.contains(&format!("/{}/", pattern))
        || path.ends_with(&format!("/{}", pattern))
}

fn matches_pattern_tail(path: &str, suffix: &str) -> bool {
    if suffix.contains('*') {
        let segments: Vec<&str> = path.split('/').collect();
        (0..segments.len()).any(|index| matches_pattern(&segments[index..].join("/"), suffix))
    } else {
        matches_segments(path, suffix)
    }
}

/// [`ProjectHost`] backed by the filesystem and an in-memory member set.
///
/// A path is included when it exists and [`PathFilter`] does not exclude it.
#[derive(Debug, Clone)]
pub struct FsProjectHost {
    filter: PathFilter,
    members: HashSet<PathKey>,
    closed: Arc<AtomicBool>,
}

impl FsProjectHost {
    pub fn new(filter: PathFilter) -> Self {
        Self {
            filter,
            members: HashSet::new(),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    pub fn add_member(&mut self, path: &Path) {
        self.members.insert(PathKey::new(path));
    }

    pub fn remove_member(&mut self, path: &Path) {
        self.members.remove(&PathKey::new(path));
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Shared flag that makes [`ProjectHost::is_closed`] report true.
    pub fn close_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }
}

impl ProjectHost for FsProjectHost {
    fn is_included(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok() && !self.filter.is_excluded(path)
    }

    fn is_member(&self, path: &Path) -> bool {
        self.members.contains(&PathKey::new(path))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Read a members file: one root-relative path per line; blank lines and
/// `#` comments are ignored. Returns absolute paths.
pub fn read_members_file(root: &Path, file: &Path) -> io::Result<Vec<PathBuf>> {
    let contents = fs::read_to_string(file)?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| normalize(&root.join(line)))
        .collect())
}
