#![allow(dead_code)]

use std::sync::Arc;

use mnemograph::config::{IngestionConfig, MaintenanceConfig};
use mnemograph::db;
use mnemograph::graph::service::MemoryGraph;
use mnemograph::ingest::source::{Commit, CommitSource, InsightProvider, JsonExportSource, Repository};
use mnemograph::ingest::sync::SyncService;

/// A graph backed by a fresh in-memory database.
pub fn memory_graph() -> MemoryGraph {
    let conn = db::open_memory_database().expect("in-memory database");
    MemoryGraph::new(conn, MaintenanceConfig::default())
}

/// The graph handle is cloneable; keep one to assert against after syncing.
pub fn sync_service(graph: MemoryGraph, source: Arc<dyn CommitSource>) -> SyncService {
    SyncService::new(graph, source, IngestionConfig::default())
}

/// Two repositories for `alice`, three commits total.
pub fn sample_export() -> Arc<JsonExportSource> {
    let json = r#"{
        "alice": [
            {
                "name": "loom",
                "full_name": "alice/loom",
                "description": "a weaving tool",
                "language": "Rust",
                "topics": ["cli", "text"],
                "commits": [
                    {"sha": "c1", "message": "Initial scaffold", "author_date": "2026-08-20T09:00:00Z", "files": ["src/main.rs", "Cargo.toml"]},
                    {"sha": "c2", "message": "Add warp parser", "author_date": "2026-08-21T09:00:00Z", "files": ["src/parser.rs"]}
                ]
            },
            {
                "name": "notes",
                "full_name": "alice/notes",
                "language": "Markdown",
                "commits": [
                    {"sha": "c3", "message": "First note", "author_date": "2026-08-22T09:00:00Z"}
                ]
            }
        ]
    }"#;
    Arc::new(JsonExportSource::from_json(json).expect("valid export"))
}

/// An insight provider that returns a fixed set of observations.
pub struct CannedInsightProvider {
    pub lines: Vec<String>,
}

impl InsightProvider for CannedInsightProvider {
    fn insights(&self, _activity_summary: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.lines.clone())
    }
}

/// An insight provider that always errors.
pub struct FailingInsightProvider;

impl InsightProvider for FailingInsightProvider {
    fn insights(&self, _activity_summary: &str) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("model endpoint unavailable")
    }
}

/// A source whose commit listing fails for one repository.
pub struct FlakyCommitSource {
    pub inner: Arc<JsonExportSource>,
    pub broken_repo: String,
}

impl CommitSource for FlakyCommitSource {
    fn repositories(&self, identity: &str, limit: usize) -> anyhow::Result<Vec<Repository>> {
        self.inner.repositories(identity, limit)
    }

    fn commits(&self, full_name: &str, limit: usize) -> anyhow::Result<Vec<Commit>> {
        if full_name == self.broken_repo {
            anyhow::bail!("upstream returned 502");
        }
        self.inner.commits(full_name, limit)
    }
}
