use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use mnemograph::config::MnemoConfig;
use mnemograph::db;
use mnemograph::graph::query::{Focus, GraphFilter};
use mnemograph::graph::service::MemoryGraph;
use mnemograph::graph::types::{NodeKind, NodeMetadata, Source};
use mnemograph::ingest::source::JsonExportSource;
use mnemograph::ingest::sync::SyncService;

#[derive(Parser)]
#[command(name = "mnemograph", about = "A persistent memory graph over repository activity", version)]
struct Cli {
    /// Path to a config file (defaults to ~/.mnemograph/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest repositories and commits for an identity, then run decay
    Sync {
        /// Identity (e.g. a username) to pull activity for
        identity: String,
        /// JSON commit export to ingest from (overrides config)
        #[arg(long)]
        source: Option<String>,
    },
    /// Print a filtered, ranked, clustered view of the graph as JSON
    Graph {
        /// Time window: last_7_days, last_30_days, or all
        #[arg(long, default_value = "last_30_days")]
        focus: Focus,
        /// Restrict to these node kinds (repeatable)
        #[arg(long = "kind")]
        kinds: Vec<NodeKind>,
        /// Exclude nodes below this importance
        #[arg(long, default_value_t = 0.0)]
        min_importance: f64,
    },
    /// Store a memory directly
    Remember {
        /// Node kind: concept, decision, task, mistake, insight, or code_event
        kind: NodeKind,
        title: String,
        summary: String,
        /// Tags to attach (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Record that a node was recalled
    Touch { node_id: String },
    /// Print detected patterns, one per line
    Patterns,
    /// Run one decay pass over aging nodes and edges
    Decay,
    /// Print aggregate graph stats as JSON
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MnemoConfig::load_from(path)?,
        None => MnemoConfig::load()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let conn = db::open_database(config.resolved_db_path())?;
    let graph = MemoryGraph::new(conn, config.maintenance.clone());

    match cli.command {
        Command::Sync { identity, source } => {
            let export_path = source
                .or_else(|| config.ingestion.source_path.clone())
                .ok_or_else(|| {
                    anyhow::anyhow!("no commit source configured; pass --source or set ingestion.source_path")
                })?;
            let source = Arc::new(JsonExportSource::load(&export_path)?);
            let service = SyncService::new(graph, source, config.ingestion.clone());
            service.sync(&identity).await?;
            if let Some(status) = service.status(&identity) {
                println!("{}", serde_json::to_string_pretty(&status)?);
            }
        }
        Command::Graph {
            focus,
            kinds,
            min_importance,
        } => {
            let filter = GraphFilter {
                focus,
                kinds: if kinds.is_empty() { None } else { Some(kinds) },
                min_importance,
            };
            let view = graph.get_graph(&filter)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Command::Remember {
            kind,
            title,
            summary,
            tags,
        } => {
            let node = graph.create_memory(
                kind,
                &title,
                &summary,
                Source::Manual,
                NodeMetadata {
                    tags,
                    ..NodeMetadata::default()
                },
            )?;
            println!("{}", serde_json::to_string_pretty(&node)?);
        }
        Command::Touch { node_id } => {
            graph.track_access(&node_id)?;
        }
        Command::Patterns => {
            for insight in graph.find_patterns()? {
                println!("{insight}");
            }
        }
        Command::Decay => {
            let outcome = graph.apply_decay()?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Stats => {
            let stats = graph.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
