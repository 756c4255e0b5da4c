//! Turns per-file extraction results into one deduplicated graph

use crate::config::ExtractOptions;
use crate::extractor::{BindingKind, Dependency, SymbolInfo};
use crate::walker::WalkOutput;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use modgraph_core::{
    EdgeKind, Granularity, Graph, GraphData, GraphNode, NodeId, NodeKind, SourceKind,
};
use std::path::Path;

/// Where a dependency landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    External,
    /// Root-relative path of an in-tree file.
    File(String),
}

#[derive(Debug, Clone)]
pub struct ResolvedDependency {
    pub dependency: Dependency,
    pub target: Target,
}

/// Everything one parsed file contributes.
#[derive(Debug, Clone)]
pub struct FileExtraction {
    pub relative: String,
    pub kind: SourceKind,
    pub dependencies: Vec<ResolvedDependency>,
    pub symbols: Vec<SymbolInfo>,
}

impl FileExtraction {
    /// A file that was read but contributes nothing.
    pub fn empty(relative: String, kind: SourceKind) -> Self {
        Self {
            relative,
            kind,
            dependencies: Vec::new(),
            symbols: Vec::new(),
        }
    }
}

pub struct GraphAssembler {
    routes: GlobSet,
    include_external: bool,
    granularity: Granularity,
}

impl GraphAssembler {
    pub fn new(options: &ExtractOptions) -> Self {
        let mut builder = GlobSetBuilder::new();
        for pattern in &options.route_patterns {
            match GlobBuilder::new(pattern).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!("Skipping invalid route pattern '{}': {}", pattern, e),
            }
        }
        let routes = builder.build().unwrap_or_else(|e| {
            tracing::warn!("Failed to compile route patterns: {}", e);
            GlobSet::empty()
        });

        Self {
            routes,
            include_external: options.include_external,
            granularity: options.granularity,
        }
    }

    /// Node kind for a root-relative file path.
    pub fn node_kind(&self, relative: &str) -> NodeKind {
        if self.routes.is_match(relative) {
            NodeKind::Route
        } else if SourceKind::from_path(Path::new(relative)) == Some(SourceKind::Style) {
            NodeKind::Style
        } else {
            NodeKind::Module
        }
    }

    /// Build the graph. `files` must be in traversal order for stable output.
    pub fn assemble(&self, root: String, walk: &WalkOutput, files: &[FileExtraction]) -> GraphData {
        let mut graph = Graph::new();

        for file in &walk.files {
            let kind = self.node_kind(&file.relative);
            graph.add_node(GraphNode::file(NodeId::file(&file.relative), kind, file.ignored));
        }

        if self.granularity == Granularity::Symbol {
            for file in files {
                add_symbols(&mut graph, file);
            }
        }

        let mut external_count = 0;
        for file in files {
            let source = NodeId::file(&file.relative);
            for resolved in &file.dependencies {
                match &resolved.target {
                    Target::External => {
                        external_count += 1;
                        if self.include_external {
                            self.add_external_edge(&mut graph, &source, &resolved.dependency);
                        }
                    }
                    Target::File(relative) => {
                        self.add_internal_edge(&mut graph, file, &source, relative, &resolved.dependency);
                    }
                }
            }
        }

        tracing::debug!(
            "Assembled {} nodes, {} edges, {} external references",
            graph.node_count(),
            graph.edge_count(),
            external_count
        );
        graph.into_data(root, walk.total_files, walk.ignored_count, external_count)
    }

    fn add_external_edge(&self, graph: &mut Graph, source: &NodeId, dependency: &Dependency) {
        graph.add_node(GraphNode::external());
        graph.add_edge(
            source,
            &NodeId::external(),
            EdgeKind::External,
            dependency.statement.clone(),
            dependency.location,
        );
    }

    fn add_internal_edge(
        &self,
        graph: &mut Graph,
        file: &FileExtraction,
        source: &NodeId,
        relative: &str,
        dependency: &Dependency,
    ) {
        let target = NodeId::file(relative);
        if !graph.contains_node(&target) {
            graph.add_node(GraphNode::file(target.clone(), self.node_kind(relative), false));
        }

        let target_kind = SourceKind::from_path(Path::new(relative));
        let kind = if target_kind == Some(SourceKind::Style) {
            EdgeKind::Style
        } else {
            dependency.kind
        };

        if self.granularity == Granularity::Symbol
            && file.kind == SourceKind::Script
            && target_kind == Some(SourceKind::Script)
            && retarget_onto_symbols(graph, source, &target, kind, dependency)
        {
            return;
        }

        graph.add_edge(source, &target, kind, dependency.statement.clone(), dependency.location);
    }
}

fn add_symbols(graph: &mut Graph, file: &FileExtraction) {
    let parent = NodeId::file(&file.relative);
    for symbol in &file.symbols {
        let node = GraphNode::symbol(&parent, &symbol.name, symbol.kind, symbol.display_name.clone());
        let id = node.id.clone();
        graph.add_node(node);
        graph.add_edge(&parent, &id, EdgeKind::Contains, None, None);
    }
}

/// Point a dependency at the symbols it imports by name. Returns false when
/// none of them exist, so the caller keeps a file-level edge.
fn retarget_onto_symbols(
    graph: &mut Graph,
    source: &NodeId,
    target: &NodeId,
    kind: EdgeKind,
    dependency: &Dependency,
) -> bool {
    let mut retargeted = false;
    for binding in &dependency.bindings {
        if binding.kind == BindingKind::Namespace {
            continue;
        }
        let symbol = NodeId::symbol(target, &binding.imported);
        if !graph.contains_node(&symbol) {
            continue;
        }
        graph.add_edge(source, &symbol, kind, dependency.statement.clone(), dependency.location);
        retargeted = true;
    }
    retargeted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ImportBinding;
    use crate::walker::WalkedFile;
    use modgraph_core::{Location, SymbolKind};
    use std::path::PathBuf;

    fn walked(relative: &str, ignored: bool) -> WalkedFile {
        WalkedFile {
            path: PathBuf::from("/repo").join(relative),
            relative: relative.to_string(),
            kind: SourceKind::from_path(Path::new(relative)).unwrap(),
            ignored,
        }
    }

    fn walk(files: &[(&str, bool)]) -> WalkOutput {
        WalkOutput {
            files: files.iter().map(|(r, i)| walked(r, *i)).collect(),
            total_files: files.iter().filter(|(_, i)| !i).count(),
            ignored_count: files.iter().filter(|(_, i)| *i).count(),
        }
    }

    fn dep(specifier: &str, kind: EdgeKind, bindings: Vec<ImportBinding>) -> Dependency {
        Dependency {
            specifier: specifier.to_string(),
            kind,
            statement: Some(format!("import '{}'", specifier)),
            location: Some(Location { line: 1, column: 0 }),
            bindings,
        }
    }

    fn resolved(dependency: Dependency, target: Target) -> ResolvedDependency {
        ResolvedDependency { dependency, target }
    }

    fn named(name: &str) -> ImportBinding {
        ImportBinding {
            kind: BindingKind::Named,
            imported: name.to_string(),
            local: name.to_string(),
        }
    }

    fn script(relative: &str, dependencies: Vec<ResolvedDependency>) -> FileExtraction {
        FileExtraction {
            relative: relative.to_string(),
            kind: SourceKind::Script,
            dependencies,
            symbols: Vec::new(),
        }
    }

    #[test]
    fn test_node_kinds() {
        let assembler = GraphAssembler::new(&ExtractOptions::default());
        assert_eq!(assembler.node_kind("app/routes/index.tsx"), NodeKind::Route);
        assert_eq!(assembler.node_kind("routes/about.js"), NodeKind::Route);
        assert_eq!(assembler.node_kind("app/routes/nested/deep.tsx"), NodeKind::Module);
        assert_eq!(assembler.node_kind("pages/_app.tsx"), NodeKind::Route);
        assert_eq!(assembler.node_kind("pages/about.tsx"), NodeKind::Module);
        assert_eq!(assembler.node_kind("styles/main.scss"), NodeKind::Style);
        assert_eq!(assembler.node_kind("src/util.ts"), NodeKind::Module);
    }

    #[test]
    fn test_external_sentinel_and_count() {
        let walk = walk(&[("a.ts", false)]);
        let files = vec![script(
            "a.ts",
            vec![
                resolved(dep("react", EdgeKind::Static, vec![]), Target::External),
                resolved(dep("lodash", EdgeKind::Dynamic, vec![]), Target::External),
            ],
        )];

        let hidden = GraphAssembler::new(&ExtractOptions::default()).assemble("/repo".into(), &walk, &files);
        assert_eq!(hidden.external_count, 2);
        assert!(hidden.node("__external__").is_none());
        assert!(hidden.edges.is_empty());

        let options = ExtractOptions {
            include_external: true,
            ..ExtractOptions::default()
        };
        let shown = GraphAssembler::new(&options).assemble("/repo".into(), &walk, &files);
        assert_eq!(shown.external_count, 2);
        assert_eq!(shown.nodes.iter().filter(|n| n.kind == NodeKind::External).count(), 1);
        assert_eq!(shown.edges.len(), 2);
        assert!(shown.edges.iter().all(|e| e.kind == EdgeKind::External));
    }

    #[test]
    fn test_style_targets_force_style_edges() {
        let walk = walk(&[("a.ts", false), ("a.css", false)]);
        let files = vec![script(
            "a.ts",
            vec![resolved(dep("./a.css", EdgeKind::Static, vec![]), Target::File("a.css".into()))],
        )];
        let data = GraphAssembler::new(&ExtractOptions::default()).assemble("/repo".into(), &walk, &files);
        assert_eq!(data.edges.len(), 1);
        assert_eq!(data.edges[0].kind, EdgeKind::Style);
        assert_eq!(data.node("a.css").unwrap().kind, NodeKind::Style);
    }

    #[test]
    fn test_duplicate_dependencies_collapse() {
        let walk = walk(&[("a.ts", false), ("b.ts", false)]);
        let same = || resolved(dep("./b", EdgeKind::Static, vec![]), Target::File("b.ts".into()));
        let mut other_statement = dep("./b", EdgeKind::Static, vec![]);
        other_statement.statement = Some("import b from './b'".into());

        let files = vec![script(
            "a.ts",
            vec![same(), same(), resolved(other_statement, Target::File("b.ts".into()))],
        )];
        let data = GraphAssembler::new(&ExtractOptions::default()).assemble("/repo".into(), &walk, &files);
        assert_eq!(data.edges.len(), 2);
    }

    #[test]
    fn test_target_outside_walk_gets_plain_node() {
        let walk = walk(&[("a.ts", false), ("gen/out.ts", true)]);
        let files = vec![script(
            "a.ts",
            vec![
                resolved(dep("./dist/lib", EdgeKind::Static, vec![]), Target::File("dist/lib.js".into())),
                resolved(dep("./gen/out", EdgeKind::Static, vec![]), Target::File("gen/out.ts".into())),
            ],
        )];
        let data = GraphAssembler::new(&ExtractOptions::default()).assemble("/repo".into(), &walk, &files);

        let lib = data.node("dist/lib.js").unwrap();
        assert!(!lib.ignored);
        assert_eq!(lib.kind, NodeKind::Module);
        // Ignored nodes keep their flag when something imports them
        assert!(data.node("gen/out.ts").unwrap().ignored);
        assert_eq!(data.edges.len(), 2);
    }

    #[test]
    fn test_symbol_retargeting() {
        let walk = walk(&[("a.ts", false), ("b.ts", false)]);
        let mut b = script("b.ts", vec![]);
        b.symbols = vec![SymbolInfo {
            name: "foo".into(),
            kind: SymbolKind::Function,
            display_name: None,
        }];
        let a = script(
            "a.ts",
            vec![
                resolved(dep("./b", EdgeKind::Static, vec![named("foo")]), Target::File("b.ts".into())),
                resolved(dep("./b?x", EdgeKind::Static, vec![named("missing")]), Target::File("b.ts".into())),
                resolved(
                    dep(
                        "./b#ns",
                        EdgeKind::Static,
                        vec![ImportBinding {
                            kind: BindingKind::Namespace,
                            imported: "*".into(),
                            local: "b".into(),
                        }],
                    ),
                    Target::File("b.ts".into()),
                ),
            ],
        );
        let options = ExtractOptions {
            granularity: Granularity::Symbol,
            ..ExtractOptions::default()
        };
        let data = GraphAssembler::new(&options).assemble("/repo".into(), &walk, &[a, b]);

        let symbol = data.node("b.ts::foo").unwrap();
        assert_eq!(symbol.kind, NodeKind::Symbol);
        assert_eq!(symbol.parent.as_ref().map(|p| p.as_str()), Some("b.ts"));

        let from_a: Vec<_> = data.edges_from("a.ts").collect();
        assert_eq!(from_a.len(), 3);
        assert_eq!(from_a[0].target.as_str(), "b.ts::foo");
        // Unknown names and namespaces fall back to the file
        assert_eq!(from_a[1].target.as_str(), "b.ts");
        assert_eq!(from_a[2].target.as_str(), "b.ts");

        let contains: Vec<_> = data.edges.iter().filter(|e| e.kind == EdgeKind::Contains).collect();
        assert_eq!(contains.len(), 1);
        assert_eq!(contains[0].source.as_str(), "b.ts");
    }

    #[test]
    fn test_invalid_route_pattern_is_skipped() {
        let options = ExtractOptions {
            route_patterns: vec!["[".into(), "**/routes/*.ts".into()],
            ..ExtractOptions::default()
        };
        let assembler = GraphAssembler::new(&options);
        assert_eq!(assembler.node_kind("routes/a.ts"), NodeKind::Route);
    }
}
