//! Core graph type definitions.
//!
//! Defines [`NodeKind`] (the six memory categories), [`Source`] (where a
//! memory came from), [`Relation`] and [`InferredBy`] (edge typing), plus the
//! [`MemoryNode`] and [`MemoryEdge`] records and their insert-time
//! counterparts [`NewNode`] and [`NewEdge`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The six kinds of memory a node can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A named idea or technique worth remembering.
    Concept,
    /// A choice that was made — repository creation, architecture calls.
    Decision,
    /// Work that was (or is to be) done.
    Task,
    /// Something that went wrong and should not be repeated.
    Mistake,
    /// A distilled observation.
    Insight,
    /// An ingested commit.
    CodeEvent,
}

impl NodeKind {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Decision => "decision",
            Self::Task => "task",
            Self::Mistake => "mistake",
            Self::Insight => "insight",
            Self::CodeEvent => "code_event",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "concept" => Ok(Self::Concept),
            "decision" => Ok(Self::Decision),
            "task" => Ok(Self::Task),
            "mistake" => Ok(Self::Mistake),
            "insight" => Ok(Self::Insight),
            "code_event" => Ok(Self::CodeEvent),
            _ => Err(format!("unknown node kind: {s}")),
        }
    }
}

/// Where a memory originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Ingested from a code host.
    Github,
    /// Declared by a user.
    Manual,
    /// Declared by an agent.
    Agent,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Manual => "manual",
            Self::Agent => "agent",
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "github" => Ok(Self::Github),
            "manual" => Ok(Self::Manual),
            "agent" => Ok(Self::Agent),
            _ => Err(format!("unknown source: {s}")),
        }
    }
}

/// The typed relationship an edge carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Causes,
    DependsOn,
    Contradicts,
    Refines,
    SimilarTo,
    LeadsTo,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Causes => "causes",
            Self::DependsOn => "depends_on",
            Self::Contradicts => "contradicts",
            Self::Refines => "refines",
            Self::SimilarTo => "similar_to",
            Self::LeadsTo => "leads_to",
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "causes" => Ok(Self::Causes),
            "depends_on" => Ok(Self::DependsOn),
            "contradicts" => Ok(Self::Contradicts),
            "refines" => Ok(Self::Refines),
            "similar_to" => Ok(Self::SimilarTo),
            "leads_to" => Ok(Self::LeadsTo),
            _ => Err(format!("unknown relation: {s}")),
        }
    }
}

/// How an edge came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferredBy {
    /// Text-overlap similarity between the two nodes.
    Semantic,
    /// Ordering or shared-repository heuristics.
    Temporal,
    /// A generative collaborator proposed the link.
    Llm,
    /// A caller asserted the link directly.
    Manual,
}

impl InferredBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Temporal => "temporal",
            Self::Llm => "llm",
            Self::Manual => "manual",
        }
    }
}

impl std::fmt::Display for InferredBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InferredBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "semantic" => Ok(Self::Semantic),
            "temporal" => Ok(Self::Temporal),
            "llm" => Ok(Self::Llm),
            "manual" => Ok(Self::Manual),
            _ => Err(format!("unknown inference origin: {s}")),
        }
    }
}

/// Structured metadata attached to a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    /// Ordered list of changed file paths (commit-derived nodes).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_paths: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A memory node record, matching the `memory_nodes` table schema.
///
/// All timestamps are RFC 3339 strings in UTC, the format SQLite rows carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNode {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    pub kind: NodeKind,
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub source: Source,
    /// Event time — not necessarily creation time.
    pub timestamp: String,
    /// Relevance score in `[0.0, 1.0]`, decays over time.
    pub importance: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub metadata: NodeMetadata,
    /// Number of times this node has been recalled.
    pub access_count: u32,
    /// Timestamp of the last recall, initialized to creation time.
    pub last_accessed: String,
    pub created_at: String,
}

/// A directed, typed edge record, matching the `memory_edges` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEdge {
    /// UUID v7 primary key.
    pub id: String,
    pub from: String,
    pub to: String,
    pub relation: Relation,
    /// Relationship strength in `[0.0, 1.0]`, decays over time.
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_by: Option<InferredBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: String,
}

/// Parameters for inserting a node. The store assigns id, access bookkeeping,
/// and created_at.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub kind: NodeKind,
    pub title: String,
    pub summary: String,
    pub content: Option<String>,
    pub source: Source,
    /// Event time.
    pub timestamp: DateTime<Utc>,
    pub importance: f64,
    pub confidence: Option<f64>,
    pub metadata: NodeMetadata,
}

impl NewNode {
    /// A node with the schema defaults: importance 0.5, event time now.
    pub fn new(kind: NodeKind, title: impl Into<String>, summary: impl Into<String>, source: Source) -> Self {
        Self {
            kind,
            title: title.into(),
            summary: summary.into(),
            content: None,
            source,
            timestamp: Utc::now(),
            importance: 0.5,
            confidence: None,
            metadata: NodeMetadata::default(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_metadata(mut self, metadata: NodeMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Parameters for inserting an edge. The store assigns id and created_at.
#[derive(Debug, Clone)]
pub struct NewEdge {
    pub from: String,
    pub to: String,
    pub relation: Relation,
    pub weight: f64,
    pub confidence: Option<f64>,
    pub inferred_by: Option<InferredBy>,
    pub reason: Option<String>,
}

impl NewEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>, relation: Relation, weight: f64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            relation,
            weight,
            confidence: None,
            inferred_by: None,
            reason: None,
        }
    }

    pub fn inferred_by(mut self, origin: InferredBy) -> Self {
        self.inferred_by = Some(origin);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_strings() {
        for kind in [
            NodeKind::Concept,
            NodeKind::Decision,
            NodeKind::Task,
            NodeKind::Mistake,
            NodeKind::Insight,
            NodeKind::CodeEvent,
        ] {
            assert_eq!(kind.as_str().parse::<NodeKind>().unwrap(), kind);
        }
        assert!("dream".parse::<NodeKind>().is_err());
    }

    #[test]
    fn relation_round_trips_through_strings() {
        for relation in [
            Relation::Causes,
            Relation::DependsOn,
            Relation::Contradicts,
            Relation::Refines,
            Relation::SimilarTo,
            Relation::LeadsTo,
        ] {
            assert_eq!(relation.as_str().parse::<Relation>().unwrap(), relation);
        }
        assert!("blocks".parse::<Relation>().is_err());
    }

    #[test]
    fn new_node_defaults() {
        let node = NewNode::new(NodeKind::Concept, "T", "S", Source::Manual);
        assert!((node.importance - 0.5).abs() < f64::EPSILON);
        assert!(node.confidence.is_none());
        assert!(node.metadata.file_paths.is_empty());
    }
}
