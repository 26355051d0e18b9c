//! SQL DDL for the memory graph tables.
//!
//! Defines the `memory_nodes`, `memory_edges`, and `schema_meta` tables. All
//! DDL uses `IF NOT EXISTS` for idempotent initialization. The enum domains
//! and [0,1] score ranges are mirrored as CHECK constraints so the database
//! rejects anything the insert-path validation missed.

use rusqlite::Connection;

/// All schema DDL statements for the memory graph.
const SCHEMA_SQL: &str = r#"
-- Memory nodes
CREATE TABLE IF NOT EXISTS memory_nodes (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL CHECK(kind IN ('concept','decision','task','mistake','insight','code_event')),
    title TEXT NOT NULL,
    summary TEXT NOT NULL,
    content TEXT,
    source TEXT NOT NULL CHECK(source IN ('github','manual','agent')),
    timestamp TEXT NOT NULL,
    importance REAL NOT NULL DEFAULT 0.5 CHECK(importance >= 0.0 AND importance <= 1.0),
    confidence REAL CHECK(confidence IS NULL OR (confidence >= 0.0 AND confidence <= 1.0)),
    repo_name TEXT,
    commit_sha TEXT,
    language TEXT,
    file_paths TEXT,
    tags TEXT,
    access_count INTEGER NOT NULL DEFAULT 0,
    last_accessed TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_nodes_kind_timestamp ON memory_nodes(kind, timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_nodes_timestamp ON memory_nodes(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_nodes_importance ON memory_nodes(importance DESC);
CREATE INDEX IF NOT EXISTS idx_nodes_repo ON memory_nodes(repo_name);
CREATE INDEX IF NOT EXISTS idx_nodes_commit_sha ON memory_nodes(commit_sha);

-- Directed, typed edges between nodes
CREATE TABLE IF NOT EXISTS memory_edges (
    id TEXT PRIMARY KEY,
    from_id TEXT NOT NULL REFERENCES memory_nodes(id),
    to_id TEXT NOT NULL REFERENCES memory_nodes(id),
    relation TEXT NOT NULL CHECK(relation IN ('causes','depends_on','contradicts','refines','similar_to','leads_to')),
    weight REAL NOT NULL DEFAULT 0.5 CHECK(weight >= 0.0 AND weight <= 1.0),
    confidence REAL CHECK(confidence IS NULL OR (confidence >= 0.0 AND confidence <= 1.0)),
    inferred_by TEXT CHECK(inferred_by IS NULL OR inferred_by IN ('semantic','temporal','llm','manual')),
    reason TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_edges_from ON memory_edges(from_id);
CREATE INDEX IF NOT EXISTS idx_edges_to ON memory_edges(to_id);
CREATE INDEX IF NOT EXISTS idx_edges_relation ON memory_edges(relation);
CREATE UNIQUE INDEX IF NOT EXISTS idx_edges_triple ON memory_edges(from_id, to_id, relation);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    // Set initial schema version if not already present
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', '1')",
        [],
    )?;

    Ok(())
}
