//! JSON snapshots of extracted graphs
//!
//! A snapshot is the serialized `GraphData` and nothing else, so exporting,
//! importing and exporting again produces the same bytes.

use crate::model::GraphData;
use anyhow::Context;
use std::path::Path;

/// Default file name used when exporting next to the scanned root.
pub const SNAPSHOT_FILE: &str = "modgraph.json";

/// Serialize a graph to its snapshot form.
pub fn to_json(data: &GraphData) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(data)?)
}

/// Rebuild a graph from a snapshot without re-running extraction.
pub fn from_json(json: &str) -> anyhow::Result<GraphData> {
    Ok(serde_json::from_str(json)?)
}

/// Write a snapshot to disk, creating parent directories as needed.
pub fn save_graph(data: &GraphData, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let json_str = to_json(data)?;
    std::fs::write(path, json_str).with_context(|| format!("writing {}", path.display()))?;

    tracing::debug!(
        "Graph snapshot saved: {} ({} nodes, {} edges)",
        path.display(),
        data.nodes.len(),
        data.edges.len()
    );
    Ok(())
}

/// Load a snapshot from disk.
pub fn load_graph(path: &Path) -> anyhow::Result<GraphData> {
    let json_str =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let data = from_json(&json_str).with_context(|| format!("parsing {}", path.display()))?;

    tracing::debug!("Graph snapshot loaded from: {}", path.display());
    Ok(data)
}
