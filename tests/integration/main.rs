//! Integration tests for modgraph
//!
//! These drive the binary and the library crates together over real trees.

use modgraph_core::{from_json, EdgeKind, GraphData, Granularity, NodeKind};
use modgraph_indexer::{extract, ExtractOptions};
use modgraph_watcher::{WatchConfig, WatchRegistry};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
}

fn modgraph(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_modgraph"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("Failed to execute modgraph")
}

fn sample_tree() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write_tree(
        temp_dir.path(),
        &[
            ("a.ts", "import b from './b';\nimport { helper } from './lib';\nimport 'react';\n"),
            ("b.ts", "export default 1;\n"),
            (".gitignore", "b.ts\n"),
            ("lib/index.ts", "export function helper() {}\n"),
            ("styles/main.css", "@import \"./t.css\";\n@import url(\"./t.css\");\n"),
            ("styles/t.css", "p { margin: 0; }\n"),
        ],
    );
    temp_dir
}

#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_modgraph"))
        .arg("--help")
        .output()
        .expect("Failed to execute modgraph");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("extract"));
    assert!(stdout.contains("watch"));
}

#[test]
fn test_cli_extract_prints_snapshot() {
    let temp_dir = sample_tree();
    let output = modgraph(temp_dir.path(), &["extract", "--external"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let data = from_json(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert!(data.node("b.ts").unwrap().ignored);
    assert_eq!(data.ignored_count, 1);
    assert_eq!(data.external_count, 1);
    assert!(data.node("__external__").is_some());

    let styles: Vec<_> = data.edges_from("styles/main.css").collect();
    assert_eq!(styles.len(), 2);
    assert!(styles.iter().all(|e| e.kind == EdgeKind::Style && e.target.as_str() == "styles/t.css"));
}

#[test]
fn test_cli_output_file_and_import() {
    let temp_dir = sample_tree();
    let out_dir = TempDir::new().unwrap();
    let snapshot = out_dir.path().join("graph/modgraph.json");

    let output = modgraph(
        temp_dir.path(),
        &["extract", "--granularity", "symbol", "--output", snapshot.to_str().unwrap()],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(snapshot.exists());

    let output = modgraph(temp_dir.path(), &["import", snapshot.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ignored: 1"));
    assert!(stdout.contains("1 symbol"));
}

#[test]
fn test_cli_capacity_failure() {
    let temp_dir = sample_tree();
    let output = modgraph(temp_dir.path(), &["extract", "--max-files", "2"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("limit of 2"));
}

#[test]
fn test_cli_root_marker() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir_all(temp_dir.path().join(".git")).unwrap();
    fs::create_dir_all(temp_dir.path().join("packages/web/src")).unwrap();

    let nested = temp_dir.path().join("packages/web/src");
    let output = modgraph(&nested, &["root"]);
    assert!(output.status.success());
    let printed = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        Path::new(printed.trim()),
        temp_dir.path().canonicalize().unwrap()
    );
}

#[test]
fn test_cli_rejects_unknown_granularity() {
    let temp_dir = sample_tree();
    let output = modgraph(temp_dir.path(), &["extract", "--granularity", "line"]);
    assert!(!output.status.success());
}

#[test]
fn test_snapshot_json_shape() {
    let temp_dir = sample_tree();
    let data = extract(temp_dir.path(), &ExtractOptions::default()).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&modgraph_core::to_json(&data).unwrap()).unwrap();

    assert!(json["nodes"].is_array());
    assert_eq!(json["ignored_count"], 1);
    let edge = &json["edges"][0];
    assert_eq!(edge["source"], "a.ts");
    assert_eq!(edge["kind"], "static");
    assert_eq!(edge["location"]["line"], 1);
    assert_eq!(edge["location"]["column"], 0);
    assert_eq!(edge["id"].as_str().map(str::len), Some(16));
}

#[test]
fn test_edge_ids_stable_across_runs() {
    let temp_dir = sample_tree();
    let first = extract(temp_dir.path(), &ExtractOptions::default()).unwrap();

    // Touching a file without changing it keeps every id
    fs::write(temp_dir.path().join("b.ts"), "export default 1;\n").unwrap();
    let second = extract(temp_dir.path(), &ExtractOptions::default()).unwrap();

    let ids = |data: &GraphData| data.edges.iter().map(|e| e.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.nodes, second.nodes);
}

#[test]
fn test_symbol_granularity_end_to_end() {
    let temp_dir = sample_tree();
    let options = ExtractOptions {
        granularity: Granularity::Symbol,
        ..ExtractOptions::default()
    };
    let data = extract(temp_dir.path(), &options).unwrap();

    let helper = data.node("lib/index.ts::helper").unwrap();
    assert_eq!(helper.kind, NodeKind::Symbol);

    let targets: Vec<_> = data.edges_from("a.ts").map(|e| e.target.as_str()).collect();
    assert!(targets.contains(&"lib/index.ts::helper"));
    assert!(!targets.contains(&"lib/index.ts"));
    // b.ts is ignored, so it has no symbols and the default import stays file-level
    assert!(targets.contains(&"b.ts"));
}

#[tokio::test]
async fn test_watch_then_reextract() {
    let temp_dir = sample_tree();
    let root = temp_dir.path().canonicalize().unwrap();
    let registry = WatchRegistry::with_config(WatchConfig {
        quiet_period: Duration::from_millis(100),
        max_batch_wait: Duration::from_secs(1),
    });

    let changes = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&changes);
    let subscription = registry
        .subscribe(&root, move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    fs::write(root.join("c.ts"), "import './a';\n").unwrap();
    for _ in 0..50 {
        if changes.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(changes.load(Ordering::SeqCst) >= 1);

    let data = extract(&root, &ExtractOptions::default()).unwrap();
    assert!(data.edges_from("c.ts").any(|e| e.target.as_str() == "a.ts"));

    subscription.unsubscribe();
    assert!(!registry.is_watching(&root));
}
