//! Write and read path for the memory graph tables.
//!
//! [`insert_node`] and [`insert_edge`] are the only entry points that create
//! rows. Both validate their input before touching the database: score ranges
//! are checked here (the CHECK constraints are a backstop, not the policy),
//! and edges verify that both endpoints exist so the graph never holds a
//! dangling reference. All policy — inference, decay cadence, query shaping —
//! lives in the sibling modules; this one is pure data access.

use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::graph::types::{MemoryEdge, MemoryNode, NewEdge, NewNode, NodeKind, NodeMetadata};

/// Errors raised by the store's insert and mutation paths.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A field violated the data-model invariants (range, required text).
    #[error("validation failed: {0}")]
    Validation(String),
    /// An edge endpoint does not reference an existing node.
    #[error("referential integrity: {0}")]
    Referential(String),
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("metadata serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result returned from an edge insert.
#[derive(Debug)]
pub struct InsertedEdge {
    /// UUID of the created (or already-existing) edge.
    pub id: String,
    /// `true` if this exact (from, to, relation) triple already existed.
    pub deduplicated: bool,
}

/// Filters for [`query_nodes`].
#[derive(Debug, Clone, Default)]
pub struct NodeQuery {
    /// Only nodes with event time at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Only nodes of these kinds; `None` means all kinds.
    pub kinds: Option<Vec<NodeKind>>,
    /// Importance floor; nodes below it are excluded.
    pub min_importance: f64,
    /// Maximum number of rows returned (0 means none).
    pub limit: usize,
}

// ── Node writes ──────────────────────────────────────────────────────────────

/// Validate and insert a node. Returns the stored record with its assigned id.
pub fn insert_node(conn: &Connection, new: &NewNode) -> Result<MemoryNode, StoreError> {
    validate_node(new)?;

    let id = uuid::Uuid::now_v7().to_string();
    let now = Utc::now().to_rfc3339();
    let timestamp = new.timestamp.to_rfc3339();
    let file_paths = json_list(&new.metadata.file_paths)?;
    let tags = json_list(&new.metadata.tags)?;

    conn.execute(
        "INSERT INTO memory_nodes (id, kind, title, summary, content, source, timestamp, \
         importance, confidence, repo_name, commit_sha, language, file_paths, tags, \
         access_count, last_accessed, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 0, ?15, ?15)",
        params![
            id,
            new.kind.as_str(),
            new.title,
            new.summary,
            new.content,
            new.source.as_str(),
            timestamp,
            new.importance,
            new.confidence,
            new.metadata.repo_name,
            new.metadata.commit_sha,
            new.metadata.language,
            file_paths,
            tags,
            now,
        ],
    )?;

    Ok(MemoryNode {
        id,
        kind: new.kind,
        title: new.title.clone(),
        summary: new.summary.clone(),
        content: new.content.clone(),
        source: new.source,
        timestamp,
        importance: new.importance,
        confidence: new.confidence,
        metadata: new.metadata.clone(),
        access_count: 0,
        last_accessed: now.clone(),
        created_at: now,
    })
}

fn validate_node(new: &NewNode) -> Result<(), StoreError> {
    if new.title.trim().is_empty() {
        return Err(StoreError::Validation("title must not be empty".into()));
    }
    if new.summary.trim().is_empty() {
        return Err(StoreError::Validation("summary must not be empty".into()));
    }
    if !(0.0..=1.0).contains(&new.importance) {
        return Err(StoreError::Validation(format!(
            "importance must be within [0, 1], got {}",
            new.importance
        )));
    }
    if let Some(confidence) = new.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(StoreError::Validation(format!(
                "confidence must be within [0, 1], got {confidence}"
            )));
        }
    }
    Ok(())
}

/// Serialize a string list for a JSON text column; NULL when empty.
fn json_list(items: &[String]) -> Result<Option<String>, StoreError> {
    if items.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(items)?))
    }
}

// ── Edge writes ──────────────────────────────────────────────────────────────

/// Validate and insert an edge.
///
/// Both endpoints must already exist. Deduplicates on the
/// (from, to, relation) triple — inserting the same logical edge twice is
/// idempotent, so replaying inference over a node cannot double-link it.
pub fn insert_edge(conn: &Connection, new: &NewEdge) -> Result<InsertedEdge, StoreError> {
    if !(0.0..=1.0).contains(&new.weight) {
        return Err(StoreError::Validation(format!(
            "weight must be within [0, 1], got {}",
            new.weight
        )));
    }
    if let Some(confidence) = new.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(StoreError::Validation(format!(
                "confidence must be within [0, 1], got {confidence}"
            )));
        }
    }

    require_node(conn, &new.from, "from")?;
    require_node(conn, &new.to, "to")?;

    // Dedup on the (from, to, relation) triple
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM memory_edges WHERE from_id = ?1 AND to_id = ?2 AND relation = ?3",
            params![new.from, new.to, new.relation.as_str()],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = existing {
        return Ok(InsertedEdge {
            id,
            deduplicated: true,
        });
    }

    let id = uuid::Uuid::now_v7().to_string();
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO memory_edges (id, from_id, to_id, relation, weight, confidence, \
         inferred_by, reason, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            new.from,
            new.to,
            new.relation.as_str(),
            new.weight,
            new.confidence,
            new.inferred_by.map(|i| i.as_str()),
            new.reason,
            now,
        ],
    )?;

    Ok(InsertedEdge {
        id,
        deduplicated: false,
    })
}

fn require_node(conn: &Connection, node_id: &str, role: &str) -> Result<(), StoreError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM memory_nodes WHERE id = ?1)",
        params![node_id],
        |row| row.get(0),
    )?;
    if exists {
        Ok(())
    } else {
        Err(StoreError::Referential(format!(
            "{role} node not found: {node_id}"
        )))
    }
}

// ── Reads ────────────────────────────────────────────────────────────────────

/// Fetch a single node by id.
pub fn get_node(conn: &Connection, node_id: &str) -> Result<MemoryNode, StoreError> {
    conn.query_row(
        &format!("SELECT {NODE_COLUMNS} FROM memory_nodes WHERE id = ?1"),
        params![node_id],
        node_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::NotFound(format!("node {node_id}")))
}

/// Look up a node by commit SHA — the ingestion dedup key.
pub fn find_node_by_commit_sha(
    conn: &Connection,
    sha: &str,
) -> Result<Option<MemoryNode>, StoreError> {
    let node = conn
        .query_row(
            &format!("SELECT {NODE_COLUMNS} FROM memory_nodes WHERE commit_sha = ?1"),
            params![sha],
            node_from_row,
        )
        .optional()?;
    Ok(node)
}

/// Whether a decision node already records the given repository's creation.
pub fn repo_decision_exists(conn: &Connection, repo_name: &str) -> Result<bool, StoreError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM memory_nodes WHERE kind = 'decision' AND repo_name = ?1)",
        params![repo_name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Query nodes with optional time and kind filters, ordered by importance
/// descending then timestamp descending.
pub fn query_nodes(conn: &Connection, query: &NodeQuery) -> Result<Vec<MemoryNode>, StoreError> {
    let mut clauses = vec!["importance >= ?".to_string()];
    let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(query.min_importance)];

    if let Some(since) = query.since {
        clauses.push("timestamp >= ?".to_string());
        values.push(Box::new(since.to_rfc3339()));
    }
    if let Some(ref kinds) = query.kinds {
        if kinds.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; kinds.len()].join(", ");
        clauses.push(format!("kind IN ({placeholders})"));
        for kind in kinds {
            values.push(Box::new(kind.as_str()));
        }
    }

    let sql = format!(
        "SELECT {NODE_COLUMNS} FROM memory_nodes WHERE {} \
         ORDER BY importance DESC, timestamp DESC LIMIT ?",
        clauses.join(" AND ")
    );
    values.push(Box::new(query.limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let nodes = stmt
        .query_map(params_from_iter(values.iter().map(|v| v.as_ref())), node_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(nodes)
}

/// The most recent nodes (excluding one id) with event time at or after `since`.
/// Candidate set A for relationship inference.
pub fn recent_nodes(
    conn: &Connection,
    exclude_id: &str,
    since: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<MemoryNode>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NODE_COLUMNS} FROM memory_nodes \
         WHERE id != ?1 AND timestamp >= ?2 \
         ORDER BY timestamp DESC LIMIT ?3"
    ))?;
    let nodes = stmt
        .query_map(
            params![exclude_id, since.to_rfc3339(), limit as i64],
            node_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(nodes)
}

/// Nodes (excluding one id) that share a repository name.
/// Candidate set B for relationship inference.
pub fn nodes_in_repo(
    conn: &Connection,
    repo_name: &str,
    exclude_id: &str,
    limit: usize,
) -> Result<Vec<MemoryNode>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {NODE_COLUMNS} FROM memory_nodes \
         WHERE repo_name = ?1 AND id != ?2 \
         ORDER BY timestamp DESC LIMIT ?3"
    ))?;
    let nodes = stmt
        .query_map(params![repo_name, exclude_id, limit as i64], node_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(nodes)
}

/// Edges where both endpoints are in the given id set.
pub fn query_edges_among(
    conn: &Connection,
    node_ids: &[String],
) -> Result<Vec<MemoryEdge>, StoreError> {
    if node_ids.is_empty() {
        return Ok(Vec::new());
    }

    let placeholders = vec!["?"; node_ids.len()].join(", ");
    let sql = format!(
        "SELECT id, from_id, to_id, relation, weight, confidence, inferred_by, reason, created_at \
         FROM memory_edges \
         WHERE from_id IN ({placeholders}) AND to_id IN ({placeholders})"
    );

    let mut values: Vec<&dyn rusqlite::types::ToSql> = Vec::with_capacity(node_ids.len() * 2);
    for id in node_ids {
        values.push(id);
    }
    for id in node_ids {
        values.push(id);
    }

    let mut stmt = conn.prepare(&sql)?;
    let edges = stmt
        .query_map(params_from_iter(values), edge_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(edges)
}

// ── Mutations ────────────────────────────────────────────────────────────────

/// Atomically bump a node's access count and refresh its last-accessed time.
pub fn increment_access(conn: &Connection, node_id: &str) -> Result<(), StoreError> {
    let now = Utc::now().to_rfc3339();
    let affected = conn.execute(
        "UPDATE memory_nodes SET access_count = access_count + 1, last_accessed = ?1 WHERE id = ?2",
        params![now, node_id],
    )?;
    if affected == 0 {
        return Err(StoreError::NotFound(format!("node {node_id}")));
    }
    Ok(())
}

/// Multiply importance (nodes) and weight (edges) by `factor` for every entity
/// older than `cutoff`. Each row update is atomic; the pass as a whole is not,
/// which is fine — a concurrent reader sees pre- or post-decay values, never a
/// half-updated row.
///
/// Returns (nodes affected, edges affected).
pub fn bulk_decay_older_than(
    conn: &Connection,
    cutoff: DateTime<Utc>,
    factor: f64,
) -> Result<(usize, usize), StoreError> {
    if !(0.0..=1.0).contains(&factor) {
        return Err(StoreError::Validation(format!(
            "decay factor must be within [0, 1], got {factor}"
        )));
    }
    let cutoff = cutoff.to_rfc3339();

    let nodes = conn.execute(
        "UPDATE memory_nodes SET importance = importance * ?1 WHERE timestamp < ?2",
        params![factor, cutoff],
    )?;
    let edges = conn.execute(
        "UPDATE memory_edges SET weight = weight * ?1 WHERE created_at < ?2",
        params![factor, cutoff],
    )?;

    Ok((nodes, edges))
}

// ── Row mapping ──────────────────────────────────────────────────────────────

const NODE_COLUMNS: &str = "id, kind, title, summary, content, source, timestamp, importance, \
    confidence, repo_name, commit_sha, language, file_paths, tags, access_count, \
    last_accessed, created_at";

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryNode> {
    let kind: String = row.get(1)?;
    let source: String = row.get(5)?;
    let file_paths: Option<String> = row.get(12)?;
    let tags: Option<String> = row.get(13)?;

    Ok(MemoryNode {
        id: row.get(0)?,
        kind: parse_col(1, &kind)?,
        title: row.get(2)?,
        summary: row.get(3)?,
        content: row.get(4)?,
        source: parse_col(5, &source)?,
        timestamp: row.get(6)?,
        importance: row.get(7)?,
        confidence: row.get(8)?,
        metadata: NodeMetadata {
            repo_name: row.get(9)?,
            commit_sha: row.get(10)?,
            language: row.get(11)?,
            file_paths: parse_json_list(12, file_paths)?,
            tags: parse_json_list(13, tags)?,
        },
        access_count: row.get(14)?,
        last_accessed: row.get(15)?,
        created_at: row.get(16)?,
    })
}

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryEdge> {
    let relation: String = row.get(3)?;
    let inferred_by: Option<String> = row.get(6)?;
    Ok(MemoryEdge {
        id: row.get(0)?,
        from: row.get(1)?,
        to: row.get(2)?,
        relation: parse_col(3, &relation)?,
        weight: row.get(4)?,
        confidence: row.get(5)?,
        inferred_by: inferred_by.as_deref().map(|s| parse_col(6, s)).transpose()?,
        reason: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Parse an enum column, mapping bad stored values to a conversion failure.
fn parse_col<T: std::str::FromStr<Err = String>>(idx: usize, value: &str) -> rusqlite::Result<T> {
    value.parse().map_err(|e: String| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

fn parse_json_list(idx: usize, value: Option<String>) -> rusqlite::Result<Vec<String>> {
    match value {
        None => Ok(Vec::new()),
        Some(raw) => serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        }),
    }
}
