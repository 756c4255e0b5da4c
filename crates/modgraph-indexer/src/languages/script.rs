//! JavaScript / TypeScript extractor using tree-sitter

use crate::extractor::{
    truncate_statement, BindingKind, Dependency, ExtractionResult, ImportBinding,
    LanguageExtractor, SymbolInfo,
};
use crate::parser_pool::{Grammar, ParserPool};
use anyhow::Result;
use modgraph_core::{EdgeKind, Location, SymbolKind};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tree_sitter::Node;

pub struct ScriptExtractor {
    parser_pool: ParserPool,
}

impl ScriptExtractor {
    pub fn new(parser_pool: ParserPool) -> Self {
        Self { parser_pool }
    }
}

impl LanguageExtractor for ScriptExtractor {
    fn extract(&self, path: &Path, content: &str, with_symbols: bool) -> Result<ExtractionResult> {
        let grammar = Grammar::from_path(path)
            .ok_or_else(|| anyhow::anyhow!("not a script file: {}", path.display()))?;
        let mut tree = self.parser_pool.parse_blocking(grammar, content)?;
        // Plain JavaScript files may still carry type annotations (Flow or TS-style)
        if tree.root_node().has_error() && grammar == Grammar::JavaScript {
            tracing::debug!("Retrying {} with the TSX grammar", path.display());
            tree = self.parser_pool.parse_blocking(Grammar::Tsx, content)?;
        }
        let root = tree.root_node();
        if root.has_error() {
            anyhow::bail!("syntax error in {}", path.display());
        }

        let source = content.as_bytes();
        let dependencies = collect_dependencies(root, source);
        let symbols = if with_symbols {
            collect_symbols(root, source)
        } else {
            Vec::new()
        };

        Ok(ExtractionResult {
            dependencies,
            symbols,
        })
    }
}

/// The syntax nodes that can carry a module reference.
enum ScriptNode<'t> {
    /// `import … from "x"`, `import "x"`, `import x = require("x")`
    Import(Node<'t>),
    /// `export … from "x"`
    ExportFrom(Node<'t>),
    /// `import("x")` or `require("x")`, checked on visit
    Call(Node<'t>),
}

impl<'t> ScriptNode<'t> {
    fn classify(node: Node<'t>) -> Option<Self> {
        match node.kind() {
            "import_statement" => Some(ScriptNode::Import(node)),
            "export_statement" if node.child_by_field_name("source").is_some() => {
                Some(ScriptNode::ExportFrom(node))
            }
            "call_expression" => Some(ScriptNode::Call(node)),
            _ => None,
        }
    }

    fn visit(self, source: &[u8]) -> Option<Dependency> {
        match self {
            ScriptNode::Import(node) => {
                let (specifier_node, require_clause) = match node.child_by_field_name("source") {
                    Some(s) => (s, None),
                    None => {
                        let clause = child_of_kind(node, "import_require_clause")?;
                        (clause.child_by_field_name("source")?, Some(clause))
                    }
                };
                let bindings = match require_clause {
                    Some(clause) => require_clause_binding(clause, source),
                    None => child_of_kind(node, "import_clause")
                        .map(|clause| import_clause_bindings(clause, source))
                        .unwrap_or_default(),
                };
                dependency(node, specifier_node, EdgeKind::Static, bindings, source)
            }
            ScriptNode::ExportFrom(node) => {
                let specifier_node = node.child_by_field_name("source")?;
                dependency(node, specifier_node, EdgeKind::Static, Vec::new(), source)
            }
            ScriptNode::Call(node) => {
                let function = node.child_by_field_name("function")?;
                let kind = match function.kind() {
                    "import" => EdgeKind::Dynamic,
                    "identifier" if text(function, source) == "require" => EdgeKind::Static,
                    _ => return None,
                };
                let arguments = node.child_by_field_name("arguments")?;
                let mut cursor = arguments.walk();
                let args: Vec<Node> = arguments
                    .named_children(&mut cursor)
                    .filter(|n| n.kind() != "comment")
                    .collect();
                match args.as_slice() {
                    [only] if only.kind() == "string" => {
                        dependency(node, *only, kind, Vec::new(), source)
                    }
                    _ => None,
                }
            }
        }
    }
}

fn dependency(
    statement: Node,
    specifier_node: Node,
    kind: EdgeKind,
    bindings: Vec<ImportBinding>,
    source: &[u8],
) -> Option<Dependency> {
    let specifier = string_value(specifier_node, source)?;
    if specifier.is_empty() || specifier.starts_with("http") {
        return None;
    }
    let start = statement.start_position();
    Some(Dependency {
        specifier,
        kind,
        statement: Some(truncate_statement(text(statement, source))),
        location: Some(Location {
            line: start.row as u32 + 1,
            column: start.column as u32,
        }),
        bindings,
    })
}

/// Walk the whole tree once, collecting every module reference.
fn collect_dependencies(root: Node, source: &[u8]) -> Vec<Dependency> {
    let mut dependencies = Vec::new();
    let mut cursor = root.walk();
    loop {
        if let Some(node) = ScriptNode::classify(cursor.node()) {
            dependencies.extend(node.visit(source));
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return dependencies;
            }
        }
    }
}

fn import_clause_bindings(clause: Node, source: &[u8]) -> Vec<ImportBinding> {
    let mut bindings = Vec::new();
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => bindings.push(ImportBinding {
                kind: BindingKind::Default,
                imported: "default".to_string(),
                local: text(child, source).to_string(),
            }),
            "namespace_import" => {
                if let Some(local) = child_of_kind(child, "identifier") {
                    bindings.push(ImportBinding {
                        kind: BindingKind::Namespace,
                        imported: "*".to_string(),
                        local: text(local, source).to_string(),
                    });
                }
            }
            "named_imports" => {
                let mut inner = child.walk();
                for spec in child.named_children(&mut inner) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let Some(name) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    let imported = name_value(name, source);
                    let local = spec
                        .child_by_field_name("alias")
                        .map(|alias| text(alias, source).to_string())
                        .unwrap_or_else(|| imported.clone());
                    let kind = if imported == "default" {
                        BindingKind::Default
                    } else {
                        BindingKind::Named
                    };
                    bindings.push(ImportBinding {
                        kind,
                        imported,
                        local,
                    });
                }
            }
            _ => {}
        }
    }
    bindings
}

/// `import fs = require("fs")` binds the whole module.
fn require_clause_binding(clause: Node, source: &[u8]) -> Vec<ImportBinding> {
    child_of_kind(clause, "identifier")
        .map(|local| {
            vec![ImportBinding {
                kind: BindingKind::Namespace,
                imported: "*".to_string(),
                local: text(local, source).to_string(),
            }]
        })
        .unwrap_or_default()
}

/// An export whose kind depends on a local declaration that may come later.
enum PendingExport {
    Resolved(SymbolInfo),
    Local { local: String, exported: String },
}

/// Exported top-level declarations, in export order.
fn collect_symbols(root: Node, source: &[u8]) -> Vec<SymbolInfo> {
    let mut locals: HashMap<String, SymbolKind> = HashMap::new();
    let mut pending = Vec::new();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == "export_statement" {
            visit_export(child, source, &mut locals, &mut pending);
        } else {
            for (name, kind) in declared_names(child, source) {
                locals.entry(name).or_insert(kind);
            }
        }
    }

    let mut seen = HashSet::new();
    pending
        .into_iter()
        .map(|export| match export {
            PendingExport::Resolved(symbol) => symbol,
            PendingExport::Local { local, exported } => {
                let kind = locals.get(&local).copied().unwrap_or(SymbolKind::Export);
                let display_name = (exported == "default" && local != "default").then_some(local);
                SymbolInfo {
                    name: exported,
                    kind,
                    display_name,
                }
            }
        })
        .filter(|symbol| seen.insert(symbol.name.clone()))
        .collect()
}

fn visit_export(
    node: Node,
    source: &[u8],
    locals: &mut HashMap<String, SymbolKind>,
    pending: &mut Vec<PendingExport>,
) {
    // Re-exports belong to the other file
    if node.child_by_field_name("source").is_some() {
        return;
    }

    let is_default = {
        let mut cursor = node.walk();
        let found = node.children(&mut cursor).any(|c| c.kind() == "default");
        found
    };

    if let Some(declaration) = node.child_by_field_name("declaration") {
        let names = declared_names(declaration, source);
        for (name, kind) in &names {
            locals.entry(name.clone()).or_insert(*kind);
        }
        if is_default {
            let symbol = match names.into_iter().next() {
                Some((name, kind)) => SymbolInfo {
                    name: "default".to_string(),
                    kind,
                    display_name: Some(name),
                },
                None => SymbolInfo {
                    name: "default".to_string(),
                    kind: declaration_kind(declaration.kind(), source, declaration)
                        .unwrap_or(SymbolKind::Export),
                    display_name: None,
                },
            };
            pending.push(PendingExport::Resolved(symbol));
        } else {
            pending.extend(names.into_iter().map(|(name, kind)| {
                PendingExport::Resolved(SymbolInfo {
                    name,
                    kind,
                    display_name: None,
                })
            }));
        }
        return;
    }

    if is_default {
        if let Some(value) = node.child_by_field_name("value") {
            pending.push(default_value_export(value, source));
        }
        return;
    }

    if let Some(clause) = child_of_kind(node, "export_clause") {
        let mut cursor = clause.walk();
        for spec in clause.named_children(&mut cursor) {
            if spec.kind() != "export_specifier" {
                continue;
            }
            let Some(name) = spec.child_by_field_name("name") else {
                continue;
            };
            let local = name_value(name, source);
            let exported = spec
                .child_by_field_name("alias")
                .map(|alias| name_value(alias, source))
                .unwrap_or_else(|| local.clone());
            pending.push(PendingExport::Local { local, exported });
        }
    }
}

fn default_value_export(value: Node, source: &[u8]) -> PendingExport {
    let named = |kind: SymbolKind| {
        PendingExport::Resolved(SymbolInfo {
            name: "default".to_string(),
            kind,
            display_name: value
                .child_by_field_name("name")
                .map(|n| text(n, source).to_string()),
        })
    };
    match value.kind() {
        "identifier" => PendingExport::Local {
            local: text(value, source).to_string(),
            exported: "default".to_string(),
        },
        "function_expression" | "function" | "generator_function" | "arrow_function" => {
            named(SymbolKind::Function)
        }
        "class" => named(SymbolKind::Class),
        _ => PendingExport::Resolved(SymbolInfo {
            name: "default".to_string(),
            kind: SymbolKind::Export,
            display_name: None,
        }),
    }
}

/// Names introduced by a top-level declaration.
fn declared_names(node: Node, source: &[u8]) -> Vec<(String, SymbolKind)> {
    match node.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let Some(kind) = declaration_kind(node.kind(), source, node) else {
                return Vec::new();
            };
            let mut cursor = node.walk();
            node.named_children(&mut cursor)
                .filter(|c| c.kind() == "variable_declarator")
                .filter_map(|declarator| declarator.child_by_field_name("name"))
                .filter(|name| name.kind() == "identifier")
                .map(|name| (text(name, source).to_string(), kind))
                .collect()
        }
        "ambient_declaration" => {
            let mut cursor = node.walk();
            let inner: Vec<Node> = node.named_children(&mut cursor).collect();
            inner
                .into_iter()
                .flat_map(|child| declared_names(child, source))
                .collect()
        }
        kind => match (declaration_kind(kind, source, node), node.child_by_field_name("name")) {
            (Some(symbol_kind), Some(name)) => vec![(text(name, source).to_string(), symbol_kind)],
            _ => Vec::new(),
        },
    }
}

fn declaration_kind(kind: &str, source: &[u8], node: Node) -> Option<SymbolKind> {
    match kind {
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            Some(SymbolKind::Function)
        }
        "class_declaration" | "abstract_class_declaration" => Some(SymbolKind::Class),
        "interface_declaration" => Some(SymbolKind::Interface),
        "type_alias_declaration" => Some(SymbolKind::Type),
        "enum_declaration" => Some(SymbolKind::Enum),
        "variable_declaration" => Some(SymbolKind::Var),
        "lexical_declaration" => match node.child(0).map(|keyword| text(keyword, source)) {
            Some("const") => Some(SymbolKind::Const),
            Some("let") => Some(SymbolKind::Let),
            _ => None,
        },
        _ => None,
    }
}

fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.named_children(&mut cursor).find(|c| c.kind() == kind);
    found
}

fn text<'s>(node: Node, source: &'s [u8]) -> &'s str {
    node.utf8_text(source).unwrap_or("")
}

/// Contents of a string literal, without its quotes.
fn string_value(node: Node, source: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let raw = text(node, source);
    raw.get(1..raw.len().saturating_sub(1)).map(str::to_string)
}

/// An identifier, or a string literal used as a module export name.
fn name_value(node: Node, source: &[u8]) -> String {
    string_value(node, source).unwrap_or_else(|| text(node, source).to_string())
}
