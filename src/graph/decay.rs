//! Time decay of importance and weight.
//!
//! A decay pass multiplies the importance of nodes and the weight of edges
//! older than the configured age by the configured factor. Passes are
//! cumulative: each run shrinks eligible scores again.

use chrono::{Duration, Utc};
use rusqlite::Connection;

use crate::config::MaintenanceConfig;
use crate::graph::store::{self, StoreError};

/// Counts from a single decay pass.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct DecayOutcome {
    pub nodes_decayed: usize,
    pub edges_decayed: usize,
}

/// Run one decay pass with the configured factor and age threshold.
pub fn apply_decay(
    conn: &Connection,
    maintenance: &MaintenanceConfig,
) -> Result<DecayOutcome, StoreError> {
    let cutoff = Utc::now() - Duration::days(maintenance.decay_age_days as i64);
    let (nodes_decayed, edges_decayed) =
        store::bulk_decay_older_than(conn, cutoff, maintenance.decay_factor)?;

    tracing::info!(
        nodes = nodes_decayed,
        edges = edges_decayed,
        factor = maintenance.decay_factor,
        "decay pass complete"
    );
    Ok(DecayOutcome {
        nodes_decayed,
        edges_decayed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::graph::types::{NewEdge, NewNode, NodeKind, Relation, Source};

    fn aged_node(conn: &Connection, importance: f64, age_days: i64) -> String {
        let new = NewNode::new(NodeKind::Insight, "old insight", "kept around", Source::Manual)
            .with_importance(importance)
            .with_timestamp(Utc::now() - Duration::days(age_days));
        store::insert_node(conn, &new).unwrap().id
    }

    #[test]
    fn decay_shrinks_only_aged_entities() {
        let conn = db::open_memory_database().unwrap();
        let maintenance = MaintenanceConfig::default();

        let old_id = aged_node(&conn, 0.8, 60);
        let fresh_id = aged_node(&conn, 0.8, 1);

        let outcome = apply_decay(&conn, &maintenance).unwrap();
        assert_eq!(outcome.nodes_decayed, 1);
        assert_eq!(outcome.edges_decayed, 0);

        let old = store::get_node(&conn, &old_id).unwrap();
        assert!((old.importance - 0.8 * 0.99).abs() < 1e-9);
        let fresh = store::get_node(&conn, &fresh_id).unwrap();
        assert!((fresh.importance - 0.8).abs() < 1e-9);
    }

    #[test]
    fn decay_is_cumulative_across_passes() {
        let conn = db::open_memory_database().unwrap();
        let maintenance = MaintenanceConfig::default();

        let id = aged_node(&conn, 0.8, 45);
        apply_decay(&conn, &maintenance).unwrap();
        apply_decay(&conn, &maintenance).unwrap();

        let node = store::get_node(&conn, &id).unwrap();
        // 0.8 -> 0.792 -> 0.78408
        assert!((node.importance - 0.78408).abs() < 1e-9);
    }

    #[test]
    fn edge_weights_decay_with_their_creation_age() {
        let conn = db::open_memory_database().unwrap();
        let maintenance = MaintenanceConfig::default();

        // Edges created now are never older than the threshold, so none decay
        // even when both endpoints are ancient.
        let a = aged_node(&conn, 0.5, 90);
        let b = aged_node(&conn, 0.5, 90);
        store::insert_edge(
            &conn,
            &NewEdge::new(a.as_str(), b.as_str(), Relation::LeadsTo, 0.9),
        )
        .unwrap();

        let outcome = apply_decay(&conn, &maintenance).unwrap();
        assert_eq!(outcome.nodes_decayed, 2);
        assert_eq!(outcome.edges_decayed, 0);

        let edges = store::query_edges_among(&conn, &[a, b]).unwrap();
        assert!((edges[0].weight - 0.9).abs() < 1e-9);
    }
}
