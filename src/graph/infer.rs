//! Relationship inference over newly-created nodes.
//!
//! Runs synchronously as part of node creation. Two candidate pools are
//! examined: the most recent nodes inside a 30-day window (text-overlap and
//! temporal rules) and nodes sharing the new node's repository (dependency
//! rule). Edge inserts go through the store's triple dedup, so replaying
//! inference over a node is idempotent.

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use std::collections::HashSet;

use crate::graph::store::{self, StoreError};
use crate::graph::types::{InferredBy, MemoryNode, NewEdge, Relation};

/// How far back candidate set A reaches.
const RECENT_WINDOW_DAYS: i64 = 30;
/// Size cap on candidate set A.
const RECENT_CANDIDATE_LIMIT: usize = 50;
/// Size cap on candidate set B (same repository).
const REPO_CANDIDATE_LIMIT: usize = 20;

/// Overlap above this creates a `similar_to` edge weighted by the similarity.
const SIMILAR_THRESHOLD: f64 = 0.6;
/// Overlap above this (with the new node strictly newer) creates a `refines` edge.
const REFINE_THRESHOLD: f64 = 0.5;
const REFINE_WEIGHT: f64 = 0.7;
/// Fixed weight for same-repository `depends_on` edges.
const DEPENDS_WEIGHT: f64 = 0.6;

/// What an inference pass did.
#[derive(Debug, Default)]
pub struct InferenceOutcome {
    /// Edges actually created (dedup hits are not counted).
    pub edges_created: usize,
    /// Candidates examined across both pools.
    pub candidates_examined: usize,
}

/// Discover and persist edges from `node` to related existing nodes.
pub fn infer_relationships(
    conn: &Connection,
    node: &MemoryNode,
) -> Result<InferenceOutcome, StoreError> {
    let mut outcome = InferenceOutcome::default();
    let node_tokens = tokenize(&node.title, &node.summary);

    // Candidate set A: recent nodes inside the window
    let since = Utc::now() - Duration::days(RECENT_WINDOW_DAYS);
    let recent = store::recent_nodes(conn, &node.id, since, RECENT_CANDIDATE_LIMIT)?;

    for candidate in &recent {
        outcome.candidates_examined += 1;
        let similarity = jaccard(&node_tokens, &tokenize(&candidate.title, &candidate.summary));

        if similarity > SIMILAR_THRESHOLD {
            let edge = NewEdge::new(
                node.id.as_str(),
                candidate.id.as_str(),
                Relation::SimilarTo,
                similarity,
            )
            .inferred_by(InferredBy::Semantic);
            if !store::insert_edge(conn, &edge)?.deduplicated {
                outcome.edges_created += 1;
            }
        }

        if similarity > REFINE_THRESHOLD && node.timestamp > candidate.timestamp {
            let edge = NewEdge::new(
                node.id.as_str(),
                candidate.id.as_str(),
                Relation::Refines,
                REFINE_WEIGHT,
            )
            .inferred_by(InferredBy::Temporal);
            if !store::insert_edge(conn, &edge)?.deduplicated {
                outcome.edges_created += 1;
            }
        }
    }

    // Candidate set B: nodes sharing the repository
    if let Some(ref repo) = node.metadata.repo_name {
        let same_repo = store::nodes_in_repo(conn, repo, &node.id, REPO_CANDIDATE_LIMIT)?;
        for candidate in &same_repo {
            outcome.candidates_examined += 1;
            if candidate.timestamp < node.timestamp {
                let edge = NewEdge::new(
                    node.id.as_str(),
                    candidate.id.as_str(),
                    Relation::DependsOn,
                    DEPENDS_WEIGHT,
                )
                .inferred_by(InferredBy::Temporal);
                if !store::insert_edge(conn, &edge)?.deduplicated {
                    outcome.edges_created += 1;
                }
            }
        }
    }

    tracing::debug!(
        node = %node.id,
        edges = outcome.edges_created,
        candidates = outcome.candidates_examined,
        "relationship inference complete"
    );
    Ok(outcome)
}

/// Importance score for a commit-derived node, applied at creation.
///
/// Base 0.5, bumped for wide commits (file count) and recency, capped at 1.0.
pub fn commit_importance(file_count: usize, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let mut score: f64 = 0.5;

    if file_count > 5 {
        score += 0.1;
    }
    if file_count > 10 {
        score += 0.1;
    }

    let days_since = (now - timestamp).num_seconds() as f64 / 86_400.0;
    if days_since < 7.0 {
        score += 0.2;
    } else if days_since < 30.0 {
        score += 0.1;
    }

    score.min(1.0)
}

/// Lower-cased whitespace-tokenized word set of title+summary.
fn tokenize(title: &str, summary: &str) -> HashSet<String> {
    format!("{title} {summary}")
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of two word sets: |intersection| / |union|.
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}
