//! CLI command implementations

use crate::ExtractArgs;
use anyhow::{Context, Result};
use modgraph_core::{find_root_marker, load_graph, save_graph, to_json, GraphData, NodeKind};
use modgraph_indexer::{ExtractOptions, OsFileSystem};
use modgraph_watcher::{WatchConfig, WatchRegistry};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// `modgraph.toml` values with command-line overrides applied.
fn options_for(root: &Path, args: &ExtractArgs) -> Result<ExtractOptions> {
    let mut options = ExtractOptions::load(&OsFileSystem, root)?;
    if let Some(max_files) = args.max_files {
        options.max_files = max_files;
    }
    if args.external {
        options.include_external = true;
    }
    if let Some(granularity) = args.granularity {
        options.granularity = granularity;
    }
    Ok(options)
}

fn canonical(root: &Path) -> Result<PathBuf> {
    root.canonicalize()
        .with_context(|| format!("Cannot open {}", root.display()))
}

/// Run one extraction off the async runtime.
async fn run_pass(root: &Path, options: &ExtractOptions) -> Result<GraphData> {
    let root = root.to_path_buf();
    let options = options.clone();
    let data = tokio::task::spawn_blocking(move || modgraph_indexer::extract(&root, &options))
        .await
        .context("Extraction task failed")??;
    Ok(data)
}

pub async fn extract(root: PathBuf, args: &ExtractArgs, output: Option<PathBuf>) -> Result<()> {
    let root = canonical(&root)?;
    let options = options_for(&root, args)?;
    let data = run_pass(&root, &options).await?;

    match output {
        Some(path) => {
            save_graph(&data, &path)?;
            tracing::info!("Wrote {} nodes, {} edges to {}", data.nodes.len(), data.edges.len(), path.display());
        }
        None => println!("{}", to_json(&data)?),
    }
    Ok(())
}

pub async fn watch(root: PathBuf, args: &ExtractArgs, settle_ms: u64) -> Result<()> {
    let root = canonical(&root)?;
    let options = options_for(&root, args)?;
    let registry = WatchRegistry::with_config(WatchConfig {
        quiet_period: Duration::from_millis(settle_ms),
        ..WatchConfig::default()
    });

    report(&root, run_pass(&root, &options).await);

    let (change_tx, mut change_rx) = mpsc::unbounded_channel();
    let _subscription = registry.subscribe(&root, move || {
        let _ = change_tx.send(());
    })?;
    tracing::info!("Watching {} (Ctrl-C to stop)", root.display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Stopping");
                break;
            }
            Some(()) = change_rx.recv() => {
                // Signals that piled up during the last pass collapse into this one
                while change_rx.try_recv().is_ok() {}
                if registry.is_degraded(&root) {
                    tracing::warn!("Watcher for {} reported errors; changes may be missed", root.display());
                }
                report(&root, run_pass(&root, &options).await);
            }
        }
    }
    Ok(())
}

fn report(root: &Path, result: Result<GraphData>) {
    match result {
        Ok(data) => tracing::info!(
            "{}: {} nodes, {} edges, {} files, {} ignored, {} external",
            root.display(),
            data.nodes.len(),
            data.edges.len(),
            data.total_files,
            data.ignored_count,
            data.external_count
        ),
        Err(e) => tracing::error!("Extraction failed: {:#}", e),
    }
}

pub fn root(start: PathBuf) -> Result<()> {
    let found = find_root_marker(&start)
        .with_context(|| format!("No repository root found above {}", start.display()))?;
    println!("{}", found.display());
    Ok(())
}

pub fn import(file: &Path) -> Result<()> {
    let data = load_graph(file)?;
    print!("{}", summarize(&data));
    Ok(())
}

fn summarize(data: &GraphData) -> String {
    let count = |kind: NodeKind| data.nodes.iter().filter(|n| n.kind == kind).count();
    format!(
        "root: {}\nnodes: {} ({} route, {} module, {} style, {} symbol)\nedges: {}\nfiles: {}\nignored: {}\nexternal: {}\n",
        data.root,
        data.nodes.len(),
        count(NodeKind::Route),
        count(NodeKind::Module),
        count(NodeKind::Style),
        count(NodeKind::Symbol),
        data.edges.len(),
        data.total_files,
        data.ignored_count,
        data.external_count
    )
}
