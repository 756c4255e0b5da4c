//! Depth-first traversal with layered ignore rules and a hard file ceiling

use crate::fs::FileSystem;
use crate::ignore_rules::{IgnoreRules, IGNORE_FILE};
use modgraph_core::{ExtractError, SourceKind};
use std::path::{Path, PathBuf};

/// A supported file found during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    pub path: PathBuf,
    /// Root-relative path with `/` separators.
    pub relative: String,
    pub kind: SourceKind,
    pub ignored: bool,
}

/// Everything one traversal produced.
#[derive(Debug, Default)]
pub struct WalkOutput {
    /// Supported files, ignored or not, in traversal order.
    pub files: Vec<WalkedFile>,
    /// Non-ignored files of any type.
    pub total_files: usize,
    /// Ignored entries, files and directories alike.
    pub ignored_count: usize,
}

impl WalkOutput {
    /// Files that should be parsed.
    pub fn candidates(&self) -> impl Iterator<Item = &WalkedFile> {
        self.files.iter().filter(|f| !f.ignored)
    }
}

pub struct TreeWalker<'a> {
    fs: &'a dyn FileSystem,
    root: &'a Path,
    max_files: usize,
}

impl<'a> TreeWalker<'a> {
    pub fn new(fs: &'a dyn FileSystem, root: &'a Path, max_files: usize) -> Self {
        Self {
            fs,
            root,
            max_files,
        }
    }

    /// Walk the whole tree. Fails with `Capacity` as soon as the number of
    /// non-ignored files passes the limit.
    pub fn walk(&self) -> Result<WalkOutput, ExtractError> {
        let mut output = WalkOutput::default();
        self.walk_dir(self.root, "", &IgnoreRules::new(), &mut output)?;
        tracing::debug!(
            "Walked {}: {} files, {} ignored, {} candidates",
            self.root.display(),
            output.total_files,
            output.ignored_count,
            output.candidates().count()
        );
        Ok(output)
    }

    fn walk_dir(
        &self,
        dir: &Path,
        relative_dir: &str,
        inherited: &IgnoreRules,
        output: &mut WalkOutput,
    ) -> Result<(), ExtractError> {
        let mut entries = match self.fs.list_entries(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Cannot read directory {}: {}", dir.display(), e);
                return Ok(());
            }
        };
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let rules = match entries.iter().find(|e| !e.is_dir && e.name == IGNORE_FILE) {
            Some(entry) => match self.fs.read_file(&entry.path) {
                Ok(content) => inherited.with_ignore_file(relative_dir, &content),
                Err(e) => {
                    tracing::warn!("Cannot read {}: {}", entry.path.display(), e);
                    inherited.clone()
                }
            },
            None => inherited.clone(),
        };

        for entry in entries {
            let relative = if relative_dir.is_empty() {
                entry.name.clone()
            } else {
                format!("{}/{}", relative_dir, entry.name)
            };

            if rules.is_ignored(&relative, entry.is_dir) {
                output.ignored_count += 1;
                if !entry.is_dir {
                    if let Some(kind) = SourceKind::from_path(&entry.path) {
                        output.files.push(WalkedFile {
                            path: entry.path,
                            relative,
                            kind,
                            ignored: true,
                        });
                    }
                }
                continue;
            }

            if entry.is_dir {
                self.walk_dir(&entry.path, &relative, &rules, output)?;
                continue;
            }

            output.total_files += 1;
            if output.total_files > self.max_files {
                tracing::warn!("File limit of {} exceeded at {}", self.max_files, relative);
                return Err(ExtractError::Capacity {
                    limit: self.max_files,
                });
            }

            if let Some(kind) = SourceKind::from_path(&entry.path) {
                output.files.push(WalkedFile {
                    path: entry.path,
                    relative,
                    kind,
                    ignored: false,
                });
            }
        }

        Ok(())
    }
}
