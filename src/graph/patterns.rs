//! Pattern detection: aggregate graph state into human-readable insights.

use rusqlite::Connection;

use crate::graph::store::StoreError;

/// A kind needs strictly more nodes than this before it reads as a pattern.
const KIND_PATTERN_THRESHOLD: i64 = 10;
/// Contradiction edges sampled for inspection.
const CONTRADICTION_SAMPLE: i64 = 5;

/// Scan the stored graph for recurring structure and summarize it as strings.
///
/// Emits one line per node kind that has accumulated more than ten nodes
/// (largest group first), then one line if any `contradicts` edges exist.
pub fn find_patterns(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut insights = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT kind, COUNT(*) AS n FROM memory_nodes
         GROUP BY kind HAVING n > ?1 ORDER BY n DESC",
    )?;
    let rows = stmt.query_map([KIND_PATTERN_THRESHOLD], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (kind, count) = row?;
        insights.push(format!(
            "You have {count} {kind} memories - this might indicate a pattern."
        ));
    }

    let mut stmt = conn.prepare(
        "SELECT id FROM memory_edges WHERE relation = 'contradicts' LIMIT ?1",
    )?;
    let contradictions = stmt
        .query_map([CONTRADICTION_SAMPLE], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    if !contradictions.is_empty() {
        insights.push(format!(
            "Found {} contradicting decisions - review may be needed.",
            contradictions.len()
        ));
    }

    Ok(insights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::graph::store;
    use crate::graph::types::{NewEdge, NewNode, NodeKind, Relation, Source};

    fn add_nodes(conn: &Connection, kind: NodeKind, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                store::insert_node(
                    conn,
                    &NewNode::new(kind, format!("memory {i}"), "notes", Source::Manual),
                )
                .unwrap()
                .id
            })
            .collect()
    }

    #[test]
    fn eleven_decisions_read_as_one_pattern() {
        let conn = db::open_memory_database().unwrap();
        add_nodes(&conn, NodeKind::Decision, 11);

        let insights = find_patterns(&conn).unwrap();
        assert_eq!(insights.len(), 1);
        assert!(insights[0].contains("11 decision"));
    }

    #[test]
    fn ten_nodes_are_below_the_threshold() {
        let conn = db::open_memory_database().unwrap();
        add_nodes(&conn, NodeKind::Task, 10);

        assert!(find_patterns(&conn).unwrap().is_empty());
    }

    #[test]
    fn contradictions_are_reported_with_a_capped_count() {
        let conn = db::open_memory_database().unwrap();
        let ids = add_nodes(&conn, NodeKind::Decision, 8);
        for to in &ids[1..] {
            store::insert_edge(
                &conn,
                &NewEdge::new(ids[0].as_str(), to.as_str(), Relation::Contradicts, 0.5),
            )
            .unwrap();
        }

        let insights = find_patterns(&conn).unwrap();
        assert_eq!(insights.len(), 1);
        // 7 contradiction edges exist but the sample caps at 5
        assert!(insights[0].contains("Found 5 contradicting decisions"));
    }

    #[test]
    fn largest_kind_group_is_listed_first() {
        let conn = db::open_memory_database().unwrap();
        add_nodes(&conn, NodeKind::Insight, 12);
        add_nodes(&conn, NodeKind::Task, 20);

        let insights = find_patterns(&conn).unwrap();
        assert_eq!(insights.len(), 2);
        assert!(insights[0].contains("20 task"));
        assert!(insights[1].contains("12 insight"));
    }
}
