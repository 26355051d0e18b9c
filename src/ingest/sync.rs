//! Background sync: pull repository activity and materialize it as memories.
//!
//! A sync is fire-and-forget from the caller's point of view: `sync` spawns
//! the work on the blocking pool and returns immediately. Outcomes are
//! recorded per identity in a [`SyncTracker`], which also serializes runs so
//! two overlapping syncs for the same identity cannot double-create edges.
//! Fetch failures are caught per repository and per commit; the remaining
//! units keep processing.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::IngestionConfig;
use crate::graph::service::{CommitParams, MemoryGraph};
use crate::graph::types::{NodeKind, NodeMetadata, Source};
use crate::ingest::source::{CommitSource, InsightProvider, Repository};

/// Counters for one completed sync run.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct IngestOutcome {
    pub repos_processed: usize,
    pub commits_ingested: usize,
    pub commits_skipped: usize,
    /// Units of work (repositories or commits) that errored and were skipped.
    pub failures: usize,
}

/// Where a given identity's sync currently stands.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    Running { started_at: String },
    Completed { finished_at: String, outcome: IngestOutcome },
    Failed { finished_at: String, error: String },
}

/// Per-identity sync bookkeeping. One in-flight run per identity.
#[derive(Default)]
pub struct SyncTracker {
    runs: Mutex<HashMap<String, SyncStatus>>,
}

impl SyncTracker {
    /// Mark a run as started. Returns `false` if one is already in flight.
    fn begin(&self, identity: &str) -> bool {
        let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(runs.get(identity), Some(SyncStatus::Running { .. })) {
            return false;
        }
        runs.insert(
            identity.to_string(),
            SyncStatus::Running {
                started_at: Utc::now().to_rfc3339(),
            },
        );
        true
    }

    fn complete(&self, identity: &str, outcome: IngestOutcome) {
        let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        runs.insert(
            identity.to_string(),
            SyncStatus::Completed {
                finished_at: Utc::now().to_rfc3339(),
                outcome,
            },
        );
    }

    fn fail(&self, identity: &str, error: &anyhow::Error) {
        let mut runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        runs.insert(
            identity.to_string(),
            SyncStatus::Failed {
                finished_at: Utc::now().to_rfc3339(),
                error: format!("{error:#}"),
            },
        );
    }

    pub fn status(&self, identity: &str) -> Option<SyncStatus> {
        let runs = self.runs.lock().unwrap_or_else(|e| e.into_inner());
        runs.get(identity).cloned()
    }
}

/// Drives ingestion for one configured commit source.
#[derive(Clone)]
pub struct SyncService {
    graph: MemoryGraph,
    source: Arc<dyn CommitSource>,
    insight: Option<Arc<dyn InsightProvider>>,
    tracker: Arc<SyncTracker>,
    config: IngestionConfig,
}

impl SyncService {
    pub fn new(graph: MemoryGraph, source: Arc<dyn CommitSource>, config: IngestionConfig) -> Self {
        Self {
            graph,
            source,
            insight: None,
            tracker: Arc::new(SyncTracker::default()),
            config,
        }
    }

    pub fn with_insight_provider(mut self, provider: Arc<dyn InsightProvider>) -> Self {
        self.insight = Some(provider);
        self
    }

    /// Kick off a sync for `identity` on the blocking pool and return
    /// immediately. Failures land in the tracker and the logs, not here.
    pub fn sync(&self, identity: &str) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        let identity = identity.to_string();
        tokio::task::spawn_blocking(move || {
            if let Err(error) = service.run_sync(&identity) {
                tracing::error!(%identity, %error, "sync failed");
            }
        })
    }

    /// The synchronous sync worker. Skips out early if a run for this
    /// identity is already in flight.
    pub fn run_sync(&self, identity: &str) -> Result<IngestOutcome> {
        if !self.tracker.begin(identity) {
            tracing::warn!(%identity, "sync already in flight, skipping");
            return Ok(IngestOutcome::default());
        }

        let result = self.ingest_identity(identity);
        match &result {
            Ok(outcome) => self.tracker.complete(identity, *outcome),
            Err(error) => self.tracker.fail(identity, error),
        }
        result
    }

    fn ingest_identity(&self, identity: &str) -> Result<IngestOutcome> {
        tracing::info!(%identity, "starting sync");
        let mut outcome = IngestOutcome::default();

        let repos = self
            .source
            .repositories(identity, self.config.repo_limit)
            .with_context(|| format!("failed to list repositories for {identity}"))?;

        for repo in &repos {
            if let Err(error) = self.ingest_repository(repo, &mut outcome) {
                tracing::warn!(repo = %repo.full_name, %error, "skipping repository");
                outcome.failures += 1;
                continue;
            }
            outcome.repos_processed += 1;
        }

        if let Some(ref provider) = self.insight {
            self.record_insights(provider.as_ref(), identity, &repos, &mut outcome);
        }

        // Trailing decay pass keeps recent activity ranked above stale memories.
        if let Err(error) = self.graph.apply_decay() {
            tracing::warn!(%error, "post-sync decay pass failed");
        }

        tracing::info!(
            %identity,
            repos = outcome.repos_processed,
            ingested = outcome.commits_ingested,
            skipped = outcome.commits_skipped,
            failures = outcome.failures,
            "sync complete"
        );
        Ok(outcome)
    }

    fn ingest_repository(&self, repo: &Repository, outcome: &mut IngestOutcome) -> Result<()> {
        // Repository metadata becomes a decision node exactly once.
        if !self.graph.has_repo_decision(&repo.name)? {
            let summary = repo
                .description
                .clone()
                .unwrap_or_else(|| "No description provided".to_string());
            self.graph.create_memory(
                NodeKind::Decision,
                &format!("Created repository: {}", repo.name),
                &summary,
                Source::Github,
                NodeMetadata {
                    repo_name: Some(repo.name.clone()),
                    language: repo.language.clone(),
                    tags: repo.topics.clone(),
                    ..NodeMetadata::default()
                },
            )?;
        }

        let commits = self
            .source
            .commits(&repo.full_name, self.config.commit_limit)
            .with_context(|| format!("failed to list commits for {}", repo.full_name))?;

        for commit in commits {
            match self.graph.has_commit(&commit.sha) {
                Ok(true) => {
                    outcome.commits_skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(sha = %commit.sha, %error, "dedup check failed, skipping commit");
                    outcome.failures += 1;
                    continue;
                }
            }

            let params = CommitParams {
                message: commit.message,
                repo: repo.name.clone(),
                sha: commit.sha.clone(),
                language: repo.language.clone(),
                files: commit.files,
                timestamp: commit.author_date,
            };
            match self.graph.create_memory_from_commit(&params) {
                Ok(_) => outcome.commits_ingested += 1,
                Err(error) => {
                    tracing::warn!(sha = %commit.sha, %error, "failed to ingest commit");
                    outcome.failures += 1;
                }
            }
        }
        Ok(())
    }

    /// Ask the generative collaborator for observations over this sync's
    /// repositories and store them as insight nodes. Best-effort.
    fn record_insights(
        &self,
        provider: &dyn InsightProvider,
        identity: &str,
        repos: &[Repository],
        outcome: &mut IngestOutcome,
    ) {
        let summary = repos
            .iter()
            .map(|r| {
                format!(
                    "{} ({}): {}",
                    r.full_name,
                    r.language.as_deref().unwrap_or("unknown"),
                    r.description.as_deref().unwrap_or("no description")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let insights = match provider.insights(&summary) {
            Ok(insights) => insights,
            Err(error) => {
                tracing::warn!(%identity, %error, "insight provider failed");
                outcome.failures += 1;
                return;
            }
        };

        for text in insights {
            let result = self.graph.create_memory(
                NodeKind::Insight,
                "Activity insight",
                &text,
                Source::Agent,
                NodeMetadata::default(),
            );
            if let Err(error) = result {
                tracing::warn!(%error, "failed to store insight");
                outcome.failures += 1;
            }
        }
    }

    pub fn status(&self, identity: &str) -> Option<SyncStatus> {
        self.tracker.status(identity)
    }
}
