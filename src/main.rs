//! modgraph CLI entry point

use clap::{Args, Parser, Subcommand};
use modgraph_core::Granularity;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "modgraph")]
#[command(about = "Module dependency graphs for JavaScript, TypeScript and CSS trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory to scan (defaults to current directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,
}

/// Overrides for values otherwise taken from `modgraph.toml`.
#[derive(Args, Debug, Clone, Default)]
pub struct ExtractArgs {
    /// Abort when more than this many files are found
    #[arg(long)]
    max_files: Option<usize>,

    /// Include the external sentinel node and its edges
    #[arg(long)]
    external: bool,

    /// Node granularity: file or symbol
    #[arg(long)]
    granularity: Option<Granularity>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the graph once and print it as JSON
    Extract {
        #[command(flatten)]
        args: ExtractArgs,

        /// Write the snapshot to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Extract, then re-extract whenever the tree changes
    Watch {
        #[command(flatten)]
        args: ExtractArgs,

        /// Quiet period before a burst of changes triggers a pass
        #[arg(long, default_value = "250")]
        settle_ms: u64,
    },
    /// Print the nearest enclosing repository root
    Root {
        /// Where to start looking (defaults to --root)
        path: Option<PathBuf>,
    },
    /// Load a saved snapshot and summarize it
    Import {
        file: PathBuf,
    },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "modgraph={0},modgraph_core={0},modgraph_indexer={0},modgraph_watcher={0}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("modgraph v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Extract { args, output } => commands::extract(cli.root, &args, output).await,
        Commands::Watch { args, settle_ms } => commands::watch(cli.root, &args, settle_ms).await,
        Commands::Root { path } => commands::root(path.unwrap_or(cli.root)),
        Commands::Import { file } => commands::import(&file),
        Commands::Version => {
            println!("modgraph v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
