//! Module specifier resolution
//!
//! Maps a specifier written in one file to a concrete file inside the root,
//! or to an external verdict.

use crate::fs::FileSystem;
use modgraph_core::{SourceKind, SCRIPT_EXTENSIONS, STYLE_EXTENSIONS};
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A package, a remote URL, or anything that did not land on a file in the root.
    External,
    /// An existing file inside the root.
    Internal(PathBuf),
}

pub struct ModuleResolver<'a> {
    fs: &'a dyn FileSystem,
    root: &'a Path,
    aliases: &'a [String],
}

impl<'a> ModuleResolver<'a> {
    pub fn new(fs: &'a dyn FileSystem, root: &'a Path, aliases: &'a [String]) -> Self {
        Self { fs, root, aliases }
    }

    /// Resolve `specifier` as written in `from_file`.
    pub fn resolve(&self, from_file: &Path, specifier: &str) -> Resolution {
        if specifier.starts_with("http") {
            return Resolution::External;
        }
        let specifier = strip_query(specifier);

        let candidate = if let Some(rest) = self
            .aliases
            .iter()
            .find_map(|alias| specifier.strip_prefix(alias.as_str()))
        {
            self.root.join(rest)
        } else if let Some(rest) = specifier.strip_prefix('/') {
            self.root.join(rest)
        } else if specifier.starts_with('.') {
            from_file.parent().unwrap_or(self.root).join(specifier)
        } else {
            return Resolution::External;
        };

        let candidate = normalize(&candidate);
        match self.probe(&candidate) {
            Some(hit) if hit.starts_with(self.root) => Resolution::Internal(hit),
            Some(hit) => {
                tracing::debug!("'{}' resolved outside the root to {}", specifier, hit.display());
                Resolution::External
            }
            None => Resolution::External,
        }
    }

    fn probe(&self, path: &Path) -> Option<PathBuf> {
        if self.fs.is_file(path) {
            return Some(path.to_path_buf());
        }

        if !SourceKind::is_supported(path) {
            let hit = resolve_extensions()
                .map(|ext| with_appended_extension(path, ext))
                .find(|candidate| self.fs.is_file(candidate));
            if hit.is_some() {
                return hit;
            }
        }

        if self.fs.is_directory(path) {
            return resolve_extensions()
                .map(|ext| path.join(format!("index.{}", ext)))
                .find(|candidate| self.fs.is_file(candidate));
        }

        None
    }
}

/// Extension probing order: scripts before styles.
fn resolve_extensions() -> impl Iterator<Item = &'static str> {
    SCRIPT_EXTENSIONS.iter().chain(STYLE_EXTENSIONS).copied()
}

fn strip_query(specifier: &str) -> &str {
    match specifier.find(['?', '#']) {
        Some(cut) => &specifier[..cut],
        None => specifier,
    }
}

/// `./a/b` + `ts` gives `./a/b.ts`, keeping any dots already in the name.
fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

/// Fold `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
