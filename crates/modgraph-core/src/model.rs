//! Core data structures for the module graph

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Id of the single node that stands in for every external reference.
pub const EXTERNAL_NODE_ID: &str = "__external__";

/// Separator between a file id and a symbol name in symbol-mode node ids.
pub const SYMBOL_SEPARATOR: &str = "::";

/// Script extensions, in resolution preference order.
pub const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Style extensions, in resolution preference order.
pub const STYLE_EXTENSIONS: &[&str] = &["css", "scss", "sass"];

/// Node identity: a root-relative path, a `path::symbol` pair, or the external sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn file(relative_path: &str) -> Self {
        NodeId(relative_path.to_string())
    }

    pub fn symbol(file: &NodeId, name: &str) -> Self {
        NodeId(format!("{}{}{}", file.0, SYMBOL_SEPARATOR, name))
    }

    pub fn external() -> Self {
        NodeId(EXTERNAL_NODE_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable edge identifier, derived from the edge's dedup key.
///
/// Serialized as 16 hex digits so JSON consumers never round it through a float.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EdgeId(pub String);

impl EdgeId {
    /// Blake3 digest of `(source, target, kind, statement)`. Same key, same id.
    pub fn new(source: &NodeId, target: &NodeId, kind: EdgeKind, statement: Option<&str>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for field in [Some(source.as_str()), Some(target.as_str()), Some(kind.as_str()), statement] {
            match field {
                Some(value) => {
                    hasher.update(&[1]);
                    hasher.update(&(value.len() as u64).to_le_bytes());
                    hasher.update(value.as_bytes());
                }
                None => {
                    hasher.update(&[0]);
                }
            }
        }
        let hex = hasher.finalize().to_hex();
        EdgeId(hex.as_str()[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A framework route entry file.
    Route,
    /// Any other script file.
    Module,
    /// A stylesheet.
    Style,
    /// The sentinel aggregating all external references.
    External,
    /// An exported declaration inside a file (symbol granularity only).
    Symbol,
}

/// What kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Static,
    Dynamic,
    Style,
    External,
    /// File to symbol.
    Contains,
}

impl EdgeKind {
    /// Wire name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Static => "static",
            EdgeKind::Dynamic => "dynamic",
            EdgeKind::Style => "style",
            EdgeKind::External => "external",
            EdgeKind::Contains => "contains",
        }
    }
}

/// Coarse kind of an exported declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Type,
    Enum,
    Const,
    Let,
    Var,
    /// Default export of an expression with no better classification.
    Export,
}

/// Script or stylesheet, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Script,
    Style,
}

impl SourceKind {
    /// Detect source kind from file extension. `None` for unsupported files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if SCRIPT_EXTENSIONS.contains(&ext) {
            Some(SourceKind::Script)
        } else if STYLE_EXTENSIONS.contains(&ext) {
            Some(SourceKind::Style)
        } else {
            None
        }
    }

    pub fn is_supported(path: &Path) -> bool {
        Self::from_path(path).is_some()
    }
}

/// A 1-based line and 0-based column in the importing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// A single node in the module graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub ignored: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_kind: Option<SymbolKind>,
    /// Owning file for symbol nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    /// Local name behind a default export, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl GraphNode {
    /// A file node labelled with its file name.
    pub fn file(id: NodeId, kind: NodeKind, ignored: bool) -> Self {
        let label = id
            .as_str()
            .rsplit('/')
            .next()
            .unwrap_or(id.as_str())
            .to_string();
        GraphNode {
            id,
            label,
            kind,
            ignored,
            symbol_kind: None,
            parent: None,
            display_name: None,
        }
    }

    pub fn external() -> Self {
        GraphNode {
            id: NodeId::external(),
            label: "External".to_string(),
            kind: NodeKind::External,
            ignored: false,
            symbol_kind: None,
            parent: None,
            display_name: None,
        }
    }

    pub fn symbol(
        parent: &NodeId,
        name: &str,
        symbol_kind: SymbolKind,
        display_name: Option<String>,
    ) -> Self {
        GraphNode {
            id: NodeId::symbol(parent, name),
            label: display_name.clone().unwrap_or_else(|| name.to_string()),
            kind: NodeKind::Symbol,
            ignored: false,
            symbol_kind: Some(symbol_kind),
            parent: Some(parent.clone()),
            display_name,
        }
    }
}

/// A directed edge in the module graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Hash of source + target + kind + statement.
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub kind: EdgeKind,
    /// The import statement as written, truncated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

/// How much detail graph nodes carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One node per file.
    #[default]
    File,
    /// One node per file plus one per exported declaration.
    Symbol,
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(Granularity::File),
            "symbol" => Ok(Granularity::Symbol),
            other => Err(format!("unknown granularity '{}', expected 'file' or 'symbol'", other)),
        }
    }
}

/// The result of one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    pub root: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Non-ignored files seen during traversal, supported or not.
    pub total_files: usize,
    pub ignored_count: usize,
    /// References resolved as external, counted whether or not the sentinel is shown.
    pub external_count: usize,
}

impl GraphData {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }

    pub fn edges_from<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source.as_str() == source)
    }
}
