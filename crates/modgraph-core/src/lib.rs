//! Modgraph Core: graph data model, deduplicating builder, and snapshots

pub mod error;
pub mod graph;
pub mod model;
pub mod snapshot;
pub mod workspace;


pub use error::{ExtractError, Result};
pub use graph::Graph;
pub use model::{
    EdgeId, EdgeKind, GraphData, GraphEdge, GraphNode, Granularity, Location, NodeId, NodeKind,
    SourceKind, SymbolKind, EXTERNAL_NODE_ID, SCRIPT_EXTENSIONS, STYLE_EXTENSIONS,
    SYMBOL_SEPARATOR,
};
pub use snapshot::{from_json, load_graph, save_graph, to_json, SNAPSHOT_FILE};
pub use workspace::{find_root_marker, ROOT_MARKER};
