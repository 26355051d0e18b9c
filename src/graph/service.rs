//! The memory graph facade.
//!
//! [`MemoryGraph`] owns the shared database handle and exposes the core
//! operations: memory creation (with inline relationship inference), graph
//! views, access tracking, pattern detection, decay, and stats. It is the
//! surface both the CLI and the ingestion service talk to.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::MaintenanceConfig;
use crate::graph::decay::{self, DecayOutcome};
use crate::graph::infer;
use crate::graph::patterns;
use crate::graph::query::{self, GraphFilter, GraphView};
use crate::graph::stats::{self, GraphStats};
use crate::graph::store;
use crate::graph::types::{MemoryNode, NewNode, NodeKind, NodeMetadata, Source};

/// Importance assigned to memories created directly by a caller.
const MANUAL_IMPORTANCE: f64 = 0.7;
/// Titles derived from commit messages are cut to this many characters.
const TITLE_MAX_CHARS: usize = 100;

/// A commit handed to [`MemoryGraph::create_memory_from_commit`].
#[derive(Debug, Clone)]
pub struct CommitParams {
    pub message: String,
    pub repo: String,
    pub sha: String,
    pub language: Option<String>,
    pub files: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Shared handle to the memory graph.
#[derive(Clone)]
pub struct MemoryGraph {
    db: Arc<Mutex<Connection>>,
    maintenance: MaintenanceConfig,
}

impl MemoryGraph {
    pub fn new(conn: Connection, maintenance: MaintenanceConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            maintenance,
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|_| anyhow!("database lock poisoned"))
    }

    /// Record a commit as a `code_event` node and infer its relationships.
    ///
    /// The title is the first line of the commit message, truncated; the full
    /// message becomes the summary. Importance is scored from commit width
    /// and recency.
    pub fn create_memory_from_commit(&self, commit: &CommitParams) -> Result<MemoryNode> {
        let title = commit_title(&commit.message);
        let importance = infer::commit_importance(commit.files.len(), commit.timestamp, Utc::now());

        let new = NewNode::new(NodeKind::CodeEvent, title, commit.message.as_str(), Source::Github)
            .with_timestamp(commit.timestamp)
            .with_importance(importance)
            .with_metadata(NodeMetadata {
                repo_name: Some(commit.repo.clone()),
                commit_sha: Some(commit.sha.clone()),
                file_paths: commit.files.clone(),
                language: commit.language.clone(),
                tags: Vec::new(),
            });

        let conn = self.conn()?;
        let node = store::insert_node(&conn, &new).context("failed to store commit memory")?;
        infer::infer_relationships(&conn, &node)
            .context("relationship inference failed for commit memory")?;
        Ok(node)
    }

    /// Record a caller-declared memory and infer its relationships.
    pub fn create_memory(
        &self,
        kind: NodeKind,
        title: &str,
        summary: &str,
        source: Source,
        metadata: NodeMetadata,
    ) -> Result<MemoryNode> {
        let new = NewNode::new(kind, title, summary, source)
            .with_importance(MANUAL_IMPORTANCE)
            .with_metadata(metadata);

        let conn = self.conn()?;
        let node = store::insert_node(&conn, &new).context("failed to store memory")?;
        infer::infer_relationships(&conn, &node).context("relationship inference failed")?;
        Ok(node)
    }

    /// A bounded, ranked, clustered view of the graph.
    pub fn get_graph(&self, filter: &GraphFilter) -> Result<GraphView> {
        let conn = self.conn()?;
        query::get_graph(&conn, filter).context("graph query failed")
    }

    /// Fetch a single node by id.
    pub fn get_node(&self, node_id: &str) -> Result<MemoryNode> {
        let conn = self.conn()?;
        store::get_node(&conn, node_id).with_context(|| format!("failed to load node {node_id}"))
    }

    /// Bump a node's recall bookkeeping.
    pub fn track_access(&self, node_id: &str) -> Result<()> {
        let conn = self.conn()?;
        store::increment_access(&conn, node_id)
            .with_context(|| format!("failed to track access for {node_id}"))
    }

    /// Human-readable insight strings over the whole graph.
    pub fn find_patterns(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        patterns::find_patterns(&conn).context("pattern detection failed")
    }

    /// Run one decay pass over aging nodes and edges.
    pub fn apply_decay(&self) -> Result<DecayOutcome> {
        let conn = self.conn()?;
        decay::apply_decay(&conn, &self.maintenance).context("decay pass failed")
    }

    /// Aggregate counts.
    pub fn stats(&self) -> Result<GraphStats> {
        let conn = self.conn()?;
        stats::collect_stats(&conn).context("stats query failed")
    }

    /// Whether a commit with this SHA has already been ingested.
    pub fn has_commit(&self, sha: &str) -> Result<bool> {
        let conn = self.conn()?;
        Ok(store::find_node_by_commit_sha(&conn, sha)?.is_some())
    }

    /// Whether a decision node already records this repository's creation.
    pub fn has_repo_decision(&self, repo_name: &str) -> Result<bool> {
        let conn = self.conn()?;
        Ok(store::repo_decision_exists(&conn, repo_name)?)
    }
}

/// First line of a commit message, truncated to [`TITLE_MAX_CHARS`].
fn commit_title(message: &str) -> String {
    message
        .lines()
        .next()
        .unwrap_or("")
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn service() -> MemoryGraph {
        let conn = db::open_memory_database().unwrap();
        MemoryGraph::new(conn, MaintenanceConfig::default())
    }

    fn sample_commit(sha: &str) -> CommitParams {
        CommitParams {
            message: "Add edge dedup\n\nUnique index over the relation triple.".into(),
            repo: "loom".into(),
            sha: sha.into(),
            language: Some("Rust".into()),
            files: vec!["src/store.rs".into()],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn commit_memory_carries_commit_shape() {
        let graph = service();
        let node = graph.create_memory_from_commit(&sample_commit("abc123")).unwrap();

        assert_eq!(node.kind, NodeKind::CodeEvent);
        assert_eq!(node.title, "Add edge dedup");
        assert!(node.summary.contains("Unique index"));
        assert_eq!(node.source, Source::Github);
        assert_eq!(node.metadata.commit_sha.as_deref(), Some("abc123"));
        assert_eq!(node.metadata.repo_name.as_deref(), Some("loom"));
        // fresh, narrow commit: base 0.5 + recency 0.2
        assert!((node.importance - 0.7).abs() < 1e-9);
        assert!(graph.has_commit("abc123").unwrap());
        assert!(!graph.has_commit("def456").unwrap());
    }

    #[test]
    fn long_commit_titles_are_truncated() {
        let graph = service();
        let mut commit = sample_commit("ffff00");
        commit.message = "x".repeat(300);
        let node = graph.create_memory_from_commit(&commit).unwrap();
        assert_eq!(node.title.chars().count(), 100);
    }

    #[test]
    fn manual_memories_get_elevated_importance() {
        let graph = service();
        let node = graph
            .create_memory(
                NodeKind::Insight,
                "Batch writes help",
                "Grouping inserts cut sync time noticeably",
                Source::Manual,
                NodeMetadata::default(),
            )
            .unwrap();
        assert!((node.importance - 0.7).abs() < 1e-9);
        assert_eq!(node.source, Source::Manual);
    }

    #[test]
    fn track_access_counts_per_node() {
        let graph = service();
        let node = graph
            .create_memory(
                NodeKind::Task,
                "Review index usage",
                "Check the query planner output",
                Source::Agent,
                NodeMetadata::default(),
            )
            .unwrap();

        for _ in 0..3 {
            graph.track_access(&node.id).unwrap();
        }
        assert!(graph.track_access("no-such-node").is_err());

        let view = graph.get_graph(&GraphFilter::default()).unwrap();
        assert_eq!(view.nodes.len(), 1);
    }
}
