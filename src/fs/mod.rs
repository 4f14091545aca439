//! Disk access: directory listing, inclusion rules, and symlink safety.

pub mod enumerate;
pub mod filter;
pub mod symlink;

pub use enumerate::{list_dir, DirEntryInfo, DirListing};
pub use filter::{read_members_file, FsProjectHost, PathFilter};
pub use symlink::{CanonicalPath, SymlinkGuard};
