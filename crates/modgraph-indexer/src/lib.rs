//! File traversal, dependency extraction, resolution and graph assembly

pub mod assembler;
pub mod config;
pub mod coordinator;
pub mod extractor;
pub mod fs;
pub mod ignore_rules;
pub mod languages;
pub mod parser_pool;
pub mod resolver;
pub mod walker;

#[cfg(test)]
pub mod test_utils;

pub use assembler::{FileExtraction, GraphAssembler, ResolvedDependency, Target};
pub use config::{ExtractOptions, CONFIG_FILE, DEFAULT_MAX_FILES};
pub use coordinator::{extract, relative_id, Coordinator};
pub use extractor::{
    BindingKind, Dependency, ExtractionResult, ImportBinding, LanguageExtractor, SymbolInfo,
};
pub use fs::{DirEntry, FileSystem, MemoryFileSystem, OsFileSystem};
pub use ignore_rules::{IgnoreRules, BUILTIN_IGNORES, IGNORE_FILE};
pub use languages::{extract_dependencies, extract_symbols, get_extractor};
pub use parser_pool::{create_parser_pool, Grammar, ParserPool};
pub use resolver::{ModuleResolver, Resolution};
pub use walker::{TreeWalker, WalkOutput, WalkedFile};
