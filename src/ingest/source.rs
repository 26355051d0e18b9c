//! Commit source abstraction and the bundled JSON-export source.
//!
//! The sync service is written against [`CommitSource`]; anything that can
//! list repositories for an identity and commits for a repository can feed
//! the graph. [`JsonExportSource`] reads a local JSON export, which is what
//! the CLI ships with and what the tests use.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Repository metadata from a code host.
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// A single commit from a code host.
#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author_date: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<String>,
}

/// Lists repositories and commits for an identity.
pub trait CommitSource: Send + Sync {
    /// Repositories belonging to `identity`, newest activity first.
    fn repositories(&self, identity: &str, limit: usize) -> Result<Vec<Repository>>;

    /// Recent commits of the repository identified by `full_name`.
    fn commits(&self, full_name: &str, limit: usize) -> Result<Vec<Commit>>;
}

/// Optional generative collaborator that turns an activity summary into
/// free-text insight strings. Sync works without one.
pub trait InsightProvider: Send + Sync {
    fn insights(&self, activity_summary: &str) -> Result<Vec<String>>;
}

#[derive(Debug, Deserialize)]
struct ExportRepository {
    #[serde(flatten)]
    repo: Repository,
    #[serde(default)]
    commits: Vec<Commit>,
}

/// A [`CommitSource`] backed by a JSON export file.
///
/// Export shape: a map from identity to a list of repositories, each carrying
/// its commits inline.
pub struct JsonExportSource {
    identities: HashMap<String, Vec<ExportRepository>>,
}

impl JsonExportSource {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read export at {}", path.display()))?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let identities =
            serde_json::from_str(contents).context("failed to parse commit export JSON")?;
        Ok(Self { identities })
    }
}

impl CommitSource for JsonExportSource {
    fn repositories(&self, identity: &str, limit: usize) -> Result<Vec<Repository>> {
        let repos = self
            .identities
            .get(identity)
            .map(|entries| entries.iter().map(|e| e.repo.clone()).take(limit).collect())
            .unwrap_or_default();
        Ok(repos)
    }

    fn commits(&self, full_name: &str, limit: usize) -> Result<Vec<Commit>> {
        for entries in self.identities.values() {
            if let Some(entry) = entries.iter().find(|e| e.repo.full_name == full_name) {
                return Ok(entry.commits.iter().take(limit).cloned().collect());
            }
        }
        anyhow::bail!("repository {full_name} not present in export")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = r#"{
        "alice": [
            {
                "name": "loom",
                "full_name": "alice/loom",
                "description": "a weaving tool",
                "language": "Rust",
                "topics": ["cli"],
                "commits": [
                    {"sha": "a1", "message": "init", "author_date": "2026-08-01T10:00:00Z", "files": ["src/main.rs"]},
                    {"sha": "a2", "message": "add parser", "author_date": "2026-08-02T10:00:00Z"}
                ]
            },
            {"name": "notes", "full_name": "alice/notes", "commits": []}
        ]
    }"#;

    #[test]
    fn export_lists_repositories_with_limit() {
        let source = JsonExportSource::from_json(EXPORT).unwrap();
        let repos = source.repositories("alice", 10).unwrap();
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].full_name, "alice/loom");
        assert_eq!(repos[0].language.as_deref(), Some("Rust"));

        assert_eq!(source.repositories("alice", 1).unwrap().len(), 1);
        assert!(source.repositories("nobody", 10).unwrap().is_empty());
    }

    #[test]
    fn export_lists_commits_by_full_name() {
        let source = JsonExportSource::from_json(EXPORT).unwrap();
        let commits = source.commits("alice/loom", 50).unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].sha, "a1");
        assert!(commits[1].files.is_empty());

        assert!(source.commits("alice/unknown", 50).is_err());
    }
}
