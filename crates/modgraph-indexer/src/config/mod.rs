//! Extraction options and the optional `modgraph.toml` file

use crate::fs::FileSystem;
use anyhow::{Context, Result};
use modgraph_core::Granularity;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the per-root options file.
pub const CONFIG_FILE: &str = "modgraph.toml";

pub const DEFAULT_MAX_FILES: usize = 10_000;

/// Knobs for one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Hard ceiling on non-ignored files.
    pub max_files: usize,
    /// Add the external sentinel node and edges to it.
    pub include_external: bool,
    pub granularity: Granularity,
    /// Specifier prefixes that map to the root.
    pub aliases: Vec<String>,
    /// Globs over root-relative paths that mark a file as a route.
    pub route_patterns: Vec<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_files: DEFAULT_MAX_FILES,
            include_external: false,
            granularity: Granularity::File,
            aliases: vec!["~/".to_string(), "@/".to_string()],
            route_patterns: vec![
                "**/routes/*.{js,jsx,ts,tsx,mjs,cjs}".to_string(),
                "**/pages/_*.{js,jsx,ts,tsx,mjs,cjs}".to_string(),
            ],
        }
    }
}

impl ExtractOptions {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid extraction options")
    }

    /// Options from `<root>/modgraph.toml`, or the defaults when there is none.
    pub fn load(fs: &dyn FileSystem, root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !fs.is_file(&path) {
            return Ok(Self::default());
        }
        let content = fs
            .read_file(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let options = Self::from_toml(&content)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        tracing::debug!("Loaded options from {}", path.display());
        Ok(options)
    }
}
