//! Filesystem capability used by traversal, extraction and resolution
//!
//! The engine never touches `std::fs` directly. `OsFileSystem` serves real
//! directories; `MemoryFileSystem` serves an in-memory tree for sandboxed
//! hosts that hand over file contents instead of paths.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

/// One child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

pub trait FileSystem: Send + Sync {
    /// Children of `dir`, in no particular order.
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntry>>;

    fn read_file(&self, path: &Path) -> io::Result<String>;

    fn is_directory(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;
}

/// The real disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Cannot read entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    tracing::warn!("Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };
            // Linked files are read through the link; linked directories are
            // never descended into, so a link back to an ancestor cannot loop
            if file_type.is_symlink() && path.is_dir() {
                tracing::debug!("Skipping directory symlink {}", path.display());
                continue;
            }
            let is_dir = file_type.is_dir();
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                is_dir,
            });
        }
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// An in-memory tree. Directories exist implicitly as ancestors of files,
/// or explicitly through [`MemoryFileSystem::add_dir`].
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: BTreeMap<PathBuf, String>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(path, contents)` pairs.
    pub fn from_files<P, C>(files: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: AsRef<Path>,
        C: Into<String>,
    {
        let mut fs = Self::new();
        for (path, contents) in files {
            fs.add_file(path, contents);
        }
        fs
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>, contents: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.register_ancestors(&path);
        self.files.insert(path, contents.into());
    }

    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.register_ancestors(&path);
        self.dirs.insert(path);
    }

    fn register_ancestors(&mut self, path: &Path) {
        for ancestor in path.ancestors().skip(1) {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(ancestor.to_path_buf());
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn list_entries(&self, dir: &Path) -> io::Result<Vec<DirEntry>> {
        if !self.dirs.contains(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such directory: {}", dir.display()),
            ));
        }

        let child = |path: &PathBuf, is_dir: bool| {
            if path.parent() != Some(dir) {
                return None;
            }
            let name = path.file_name()?.to_string_lossy().into_owned();
            Some(DirEntry {
                path: path.clone(),
                name,
                is_dir,
            })
        };

        let mut entries: Vec<DirEntry> = self
            .dirs
            .iter()
            .filter_map(|p| child(p, true))
            .collect();
        entries.extend(self.files.keys().filter_map(|p| child(p, false)));
        Ok(entries)
    }

    fn read_file(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.dirs.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
}
