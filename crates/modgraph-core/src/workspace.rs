//! Scan-root detection

use std::path::{Path, PathBuf};

/// Directory whose presence marks a repository root.
pub const ROOT_MARKER: &str = ".git";

/// Walk upward from `start` until a directory containing a `.git` directory
/// is found. Returns `None` once the filesystem root is passed.
pub fn find_root_marker(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    let mut current = if start.is_dir() {
        Some(start.as_path())
    } else {
        start.parent()
    };

    while let Some(dir) = current {
        if dir.join(ROOT_MARKER).is_dir() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}
