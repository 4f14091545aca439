//! Path normalization and map keys for tree nodes.

use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Whether the host filesystem compares names case-insensitively by default.
pub const CASE_INSENSITIVE_FS: bool = cfg!(any(windows, target_os = "macos"));

/// Lexically normalize a path: drop `.` components, fold `..`, strip trailing
/// separators, and NFC-normalize every name. Symlinks are not resolved.
pub fn normalize(path: &Path) -> PathBuf {
    let path = dunce::simplified(path);
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            Component::Normal(name) => out.push(nfc(name.to_os_string())),
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
        }
    }
    out
}

fn nfc(name: OsString) -> OsString {
    match name.into_string() {
        Ok(name) => name.nfc().collect::<String>().into(),
        Err(raw) => raw,
    }
}

/// Key of the path→node map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathKey(String);

impl PathKey {
    pub fn new(path: &Path) -> Self {
        let normalized = normalize(path).to_string_lossy().into_owned();
        if CASE_INSENSITIVE_FS {
            Self(normalized.to_lowercase())
        } else {
            Self(normalized)
        }
    }
}

/// Case-insensitive comparison of two paths after normalization.
pub fn eq_ignore_case(a: &Path, b: &Path) -> bool {
    let a = normalize(a).to_string_lossy().to_lowercase();
    let b = normalize(b).to_string_lossy().to_lowercase();
    a == b
}

/// Display caption for a node: its final component, or the whole path for roots.
pub fn caption_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// True if `path` is `root` or lies below it.
pub fn is_within(root: &Path, path: &Path) -> bool {
    path == root || path.starts_with(root)
}
