//! Language extractors for script and stylesheet files

pub mod script;
pub mod style;

use crate::extractor::{Dependency, ExtractionResult, LanguageExtractor, SymbolInfo};
use crate::parser_pool::ParserPool;
use anyhow::Result;
use modgraph_core::SourceKind;
use std::path::Path;

/// Get the appropriate extractor for a file based on its extension
pub fn get_extractor(path: &Path, parser_pool: &ParserPool) -> Option<Box<dyn LanguageExtractor>> {
    match SourceKind::from_path(path)? {
        SourceKind::Script => Some(Box::new(script::ScriptExtractor::new(parser_pool.clone()))),
        SourceKind::Style => Some(Box::new(style::StyleExtractor)),
    }
}

/// Extract only the module references of one file.
pub fn extract_dependencies(path: &Path, content: &str, parser_pool: &ParserPool) -> Result<Vec<Dependency>> {
    Ok(extract_with(path, content, parser_pool, false)?.dependencies)
}

/// Extract only the exported top-level symbols of one file.
pub fn extract_symbols(path: &Path, content: &str, parser_pool: &ParserPool) -> Result<Vec<SymbolInfo>> {
    Ok(extract_with(path, content, parser_pool, true)?.symbols)
}

fn extract_with(
    path: &Path,
    content: &str,
    parser_pool: &ParserPool,
    with_symbols: bool,
) -> Result<ExtractionResult> {
    let extractor = get_extractor(path, parser_pool)
        .ok_or_else(|| anyhow::anyhow!("unsupported file type: {}", path.display()))?;
    extractor.extract(path, content, with_symbols)
}
