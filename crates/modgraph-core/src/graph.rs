//! Graph builder using petgraph::StableDiGraph keyed by NodeId

use crate::model::*;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// The edge deduplication key.
type EdgeKey = (NodeId, NodeId, EdgeKind, Option<String>);

/// The module graph under construction: a directed multigraph that refuses
/// duplicate node ids and duplicate `(source, target, kind, statement)` edges.
pub struct Graph {
    inner: StableDiGraph<GraphNode, GraphEdge>,
    index: HashMap<NodeId, NodeIndex>,
    edge_keys: HashSet<EdgeKey>,
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl Graph {
    pub fn new() -> Self {
        Graph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
            edge_keys: HashSet::new(),
        }
    }

    /// Add a node unless one with the same id exists. Returns true if added.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        let id = node.id.clone();
        let idx = self.inner.add_node(node);
        self.index.insert(id, idx);
        true
    }

    /// Add an edge between two existing nodes. Returns the new EdgeId, or
    /// `None` when an endpoint is missing or the edge key is already present.
    pub fn add_edge(
        &mut self,
        source: &NodeId,
        target: &NodeId,
        kind: EdgeKind,
        statement: Option<String>,
        location: Option<Location>,
    ) -> Option<EdgeId> {
        let source_idx = *self.index.get(source)?;
        let target_idx = *self.index.get(target)?;

        let key = (source.clone(), target.clone(), kind, statement.clone());
        if self.edge_keys.contains(&key) {
            return None;
        }

        let id = EdgeId::new(source, target, kind, statement.as_deref());
        self.inner.add_edge(
            source_idx,
            target_idx,
            GraphEdge {
                id: id.clone(),
                source: source.clone(),
                target: target.clone(),
                kind,
                statement,
                location,
            },
        );
        self.edge_keys.insert(key);
        Some(id)
    }

    /// Get a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.index.get(id).and_then(|&idx| self.inner.node_weight(idx))
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// Total number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Iterate over all nodes in insertion order.
    pub fn all_nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.inner
            .node_indices()
            .filter_map(move |idx| self.inner.node_weight(idx))
    }

    /// Iterate over all edges in insertion order.
    pub fn all_edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.inner
            .edge_indices()
            .filter_map(move |idx| self.inner.edge_weight(idx))
    }

    /// Get all outgoing edges from a node.
    pub fn edges_from(&self, source: &NodeId) -> impl Iterator<Item = &GraphEdge> {
        let idx = self.index.get(source).copied();
        idx.into_iter().flat_map(move |idx| {
            self.inner
                .edges_directed(idx, Direction::Outgoing)
                .filter_map(move |edge_ref| self.inner.edge_weight(edge_ref.id()))
        })
    }

    /// Check if an edge of a specific kind exists between two nodes.
    pub fn has_edge_between(&self, source: &NodeId, target: &NodeId, kind: EdgeKind) -> bool {
        self.edges_from(source)
            .any(|e| &e.target == target && e.kind == kind)
    }

    /// Freeze into the serializable output form.
    pub fn into_data(
        self,
        root: String,
        total_files: usize,
        ignored_count: usize,
        external_count: usize,
    ) -> GraphData {
        let nodes = self.all_nodes().cloned().collect();
        let edges = self.all_edges().cloned().collect();
        GraphData {
            root,
            nodes,
            edges,
            total_files,
            ignored_count,
            external_count,
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
