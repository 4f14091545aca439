//! Single-level directory listing.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub path: PathBuf,
    pub is_symlink: bool,
}

/// Immediate children of one directory, each group sorted by file name.
#[derive(Debug, Default, Clone)]
pub struct DirListing {
    pub directories: Vec<DirEntryInfo>,
    pub files: Vec<DirEntryInfo>,
}

/// List the immediate subdirectories and files of `dir`.
///
/// Links are classified by their target. Entries that vanish or cannot be
/// stat'ed mid-listing are skipped; failing to read `dir` itself is an error.
pub fn list_dir(dir: &Path) -> io::Result<DirListing> {
    if !fs::metadata(dir)?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} is not a directory", dir.display()),
        ));
    }

    let mut listing = DirListing::default();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => return Err(err.into()),
            Err(err) => {
                debug!(dir = %dir.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };

        let is_symlink = entry.path_is_symlink();
        let is_dir = if is_symlink {
            match fs::metadata(entry.path()) {
                Ok(meta) => meta.is_dir(),
                // Dangling links are listed as directories so the symlink
                // check can refuse them.
                Err(_) => true,
            }
        } else {
            entry.file_type().is_dir()
        };

        let info = DirEntryInfo {
            path: entry.into_path(),
            is_symlink,
        };
        if is_dir {
            listing.directories.push(info);
        } else {
            listing.files.push(info);
        }
    }

    Ok(listing)
}
