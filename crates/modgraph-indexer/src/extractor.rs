//! Language extractor trait and the records it produces

use modgraph_core::{EdgeKind, Location, SymbolKind};
use std::path::Path;

/// Statements longer than this many characters are cut for display.
pub const MAX_STATEMENT_CHARS: usize = 200;

/// How a name is brought in by an import declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Default,
    Named,
    Namespace,
}

/// One name bound by an import declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub kind: BindingKind,
    /// Exported name on the target side (`default` for default imports, `*` for namespaces).
    pub imported: String,
    pub local: String,
}

/// One reference from a file to a module, as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub specifier: String,
    pub kind: EdgeKind,
    pub statement: Option<String>,
    pub location: Option<Location>,
    pub bindings: Vec<ImportBinding>,
}

/// One exported top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    /// Export name; `default` for default exports.
    pub name: String,
    pub kind: SymbolKind,
    /// Local name behind a default export, when it has one.
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub dependencies: Vec<Dependency>,
    pub symbols: Vec<SymbolInfo>,
}

pub trait LanguageExtractor: Send + Sync {
    /// Extract dependencies, and exported symbols when `with_symbols` is set,
    /// from one parse of `content`. An error means the file could not be parsed.
    fn extract(&self, path: &Path, content: &str, with_symbols: bool)
        -> anyhow::Result<ExtractionResult>;
}

/// Cut a statement to [`MAX_STATEMENT_CHARS`] characters, marking the cut.
pub fn truncate_statement(text: &str) -> String {
    let text = text.trim();
    match text.char_indices().nth(MAX_STATEMENT_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
