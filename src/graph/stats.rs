//! Aggregate counts over the stored graph.

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::graph::store::StoreError;

/// A snapshot of graph size and composition.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    /// Node counts keyed by kind string.
    pub by_kind: HashMap<String, usize>,
    /// Node counts keyed by source string.
    pub by_source: HashMap<String, usize>,
    /// Event time of the oldest stored node, if any.
    pub oldest_timestamp: Option<String>,
    /// Event time of the newest stored node, if any.
    pub newest_timestamp: Option<String>,
}

/// Compute a stats snapshot.
pub fn collect_stats(conn: &Connection) -> Result<GraphStats, StoreError> {
    let total_nodes: usize =
        conn.query_row("SELECT COUNT(*) FROM memory_nodes", [], |row| {
            row.get::<_, i64>(0)
        })? as usize;
    let total_edges: usize =
        conn.query_row("SELECT COUNT(*) FROM memory_edges", [], |row| {
            row.get::<_, i64>(0)
        })? as usize;

    let by_kind = grouped_counts(conn, "kind")?;
    let by_source = grouped_counts(conn, "source")?;

    let (oldest_timestamp, newest_timestamp) = conn.query_row(
        "SELECT MIN(timestamp), MAX(timestamp) FROM memory_nodes",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    Ok(GraphStats {
        total_nodes,
        total_edges,
        by_kind,
        by_source,
        oldest_timestamp,
        newest_timestamp,
    })
}

fn grouped_counts(conn: &Connection, column: &str) -> Result<HashMap<String, usize>, StoreError> {
    // column is one of our own identifiers, never user input
    let mut stmt = conn.prepare(&format!(
        "SELECT {column}, COUNT(*) FROM memory_nodes GROUP BY {column}"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
    })?;
    let mut counts = HashMap::new();
    for row in rows {
        let (key, count) = row?;
        counts.insert(key, count);
    }
    Ok(counts)
}
