//! Orchestrates one extraction pass: walk, parallel parse and resolve, assemble

use crate::assembler::{FileExtraction, GraphAssembler, ResolvedDependency, Target};
use crate::config::ExtractOptions;
use crate::fs::{FileSystem, OsFileSystem};
use crate::languages::get_extractor;
use crate::parser_pool::{create_parser_pool, ParserPool};
use crate::resolver::{ModuleResolver, Resolution};
use crate::walker::{TreeWalker, WalkedFile};
use modgraph_core::{ExtractError, GraphData, Granularity};
use rayon::prelude::*;
use std::path::Path;
use std::time::Instant;

pub struct Coordinator {
    fs: Box<dyn FileSystem>,
    options: ExtractOptions,
    parser_pool: ParserPool,
}

impl Coordinator {
    pub fn new(fs: impl FileSystem + 'static, options: ExtractOptions) -> Self {
        Self {
            fs: Box::new(fs),
            options,
            parser_pool: create_parser_pool(),
        }
    }

    /// Run the whole pipeline over `root`. Only an unusable root or the file
    /// ceiling fail the pass; per-file problems are logged and skipped.
    pub fn extract(&self, root: &Path) -> Result<GraphData, ExtractError> {
        let start = Instant::now();
        if !self.fs.is_directory(root) {
            return Err(ExtractError::Input {
                path: root.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }
        if let Err(e) = self.fs.list_entries(root) {
            return Err(ExtractError::Input {
                path: root.to_path_buf(),
                reason: e.to_string(),
            });
        }

        let walk = TreeWalker::new(self.fs.as_ref(), root, self.options.max_files).walk()?;
        let resolver = ModuleResolver::new(self.fs.as_ref(), root, &self.options.aliases);
        let with_symbols = self.options.granularity == Granularity::Symbol;

        let candidates: Vec<&WalkedFile> = walk.candidates().collect();
        let files: Vec<FileExtraction> = candidates
            .par_iter()
            .map(|file| self.extract_file(file, root, &resolver, with_symbols))
            .collect();

        let data = GraphAssembler::new(&self.options).assemble(root.display().to_string(), &walk, &files);
        tracing::info!(
            "Extracted {} nodes and {} edges from {} in {:?}",
            data.nodes.len(),
            data.edges.len(),
            root.display(),
            start.elapsed()
        );
        Ok(data)
    }

    fn extract_file(
        &self,
        file: &WalkedFile,
        root: &Path,
        resolver: &ModuleResolver,
        with_symbols: bool,
    ) -> FileExtraction {
        let empty = || FileExtraction::empty(file.relative.clone(), file.kind);

        let content = match self.fs.read_file(&file.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!("Skipping unreadable {}: {}", file.relative, e);
                return empty();
            }
        };
        let Some(extractor) = get_extractor(&file.path, &self.parser_pool) else {
            return empty();
        };
        let result = match extractor.extract(&file.path, &content, with_symbols) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", file.relative, e);
                return empty();
            }
        };

        let dependencies = result
            .dependencies
            .into_iter()
            .map(|dependency| {
                let target = match resolver.resolve(&file.path, &dependency.specifier) {
                    Resolution::Internal(path) => match relative_id(root, &path) {
                        Some(relative) => Target::File(relative),
                        None => Target::External,
                    },
                    Resolution::External => Target::External,
                };
                ResolvedDependency { dependency, target }
            })
            .collect();

        FileExtraction {
            relative: file.relative.clone(),
            kind: file.kind,
            dependencies,
            symbols: result.symbols,
        }
    }
}

/// Root-relative id with `/` separators.
pub fn relative_id(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Extract the graph of a directory on disk.
pub fn extract(root: &Path, options: &ExtractOptions) -> Result<GraphData, ExtractError> {
    let root = root.canonicalize().map_err(|e| ExtractError::Input {
        path: root.to_path_buf(),
        reason: e.to_string(),
    })?;
    Coordinator::new(OsFileSystem, options.clone()).extract(&root)
}
