//! Graph query service: bounded, filtered, ranked, clustered views.
//!
//! Views are capped at 100 nodes, ranked by importance then recency, and
//! carry every persisted edge whose endpoints both made the cut. Clusters are
//! computed at query time by grouping the returned nodes by repository and by
//! kind.

use chrono::{Duration, Utc};
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::graph::store::{self, NodeQuery, StoreError};
use crate::graph::types::{MemoryNode, NodeKind, NodeMetadata, Relation};

/// Hard cap on nodes per view.
const MAX_NODES: usize = 100;

/// Time window applied to node event timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    Last7Days,
    #[default]
    Last30Days,
    All,
}

impl Focus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Last7Days => "last_7_days",
            Self::Last30Days => "last_30_days",
            Self::All => "all",
        }
    }
}

impl std::fmt::Display for Focus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Focus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last_7_days" => Ok(Self::Last7Days),
            "last_30_days" => Ok(Self::Last30Days),
            "all" => Ok(Self::All),
            _ => Err(format!("unknown focus window: {s}")),
        }
    }
}

/// Filters for [`get_graph`].
#[derive(Debug, Clone, Default)]
pub struct GraphFilter {
    pub focus: Focus,
    /// Only these kinds; `None` means all.
    pub kinds: Option<Vec<NodeKind>>,
    /// Importance floor.
    pub min_importance: f64,
}

/// Node projection for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct NodeView {
    pub id: String,
    pub kind: NodeKind,
    /// The node title, under the name visualizers expect.
    pub label: String,
    pub summary: String,
    pub importance: f64,
    pub timestamp: String,
    pub metadata: NodeMetadata,
}

impl From<MemoryNode> for NodeView {
    fn from(node: MemoryNode) -> Self {
        Self {
            id: node.id,
            kind: node.kind,
            label: node.title,
            summary: node.summary,
            importance: node.importance,
            timestamp: node.timestamp,
            metadata: node.metadata,
        }
    }
}

/// Edge projection for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct EdgeView {
    pub from: String,
    pub to: String,
    pub relation: Relation,
    pub weight: f64,
}

/// A bounded subgraph plus its query-time clusters.
#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    /// Cluster key (`repo:<name>` or `type:<kind>`) to member node ids.
    pub clusters: HashMap<String, Vec<String>>,
}

/// Build a graph view for the given filters.
pub fn get_graph(conn: &Connection, filter: &GraphFilter) -> Result<GraphView, StoreError> {
    let since = match filter.focus {
        Focus::Last7Days => Some(Utc::now() - Duration::days(7)),
        Focus::Last30Days => Some(Utc::now() - Duration::days(30)),
        Focus::All => None,
    };

    let nodes = store::query_nodes(
        conn,
        &NodeQuery {
            since,
            kinds: filter.kinds.clone(),
            min_importance: filter.min_importance,
            limit: MAX_NODES,
        },
    )?;

    let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    let edges = store::query_edges_among(conn, &ids)?
        .into_iter()
        .map(|e| EdgeView {
            from: e.from,
            to: e.to,
            relation: e.relation,
            weight: e.weight,
        })
        .collect();

    let clusters = detect_clusters(&nodes);
    let nodes = nodes.into_iter().map(NodeView::from).collect();

    Ok(GraphView {
        nodes,
        edges,
        clusters,
    })
}

/// Group nodes by repository and by kind. A node lands in both of its groups.
/// The kind group keeps the `type:` key prefix visualizers already consume.
fn detect_clusters(nodes: &[MemoryNode]) -> HashMap<String, Vec<String>> {
    let mut clusters: HashMap<String, Vec<String>> = HashMap::new();
    for node in nodes {
        if let Some(ref repo) = node.metadata.repo_name {
            clusters
                .entry(format!("repo:{repo}"))
                .or_default()
                .push(node.id.clone());
        }
        clusters
            .entry(format!("type:{}", node.kind))
            .or_default()
            .push(node.id.clone());
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::graph::types::{NewEdge, NewNode, Source};

    fn node(conn: &Connection, kind: NodeKind, importance: f64, repo: Option<&str>) -> MemoryNode {
        let mut new = NewNode::new(kind, "a memory", "about something", Source::Manual)
            .with_importance(importance);
        new.metadata.repo_name = repo.map(str::to_string);
        store::insert_node(conn, &new).unwrap()
    }

    #[test]
    fn importance_floor_excludes_default_nodes() {
        let conn = db::open_memory_database().unwrap();
        node(&conn, NodeKind::Concept, 0.5, None);
        let kept = node(&conn, NodeKind::Concept, 0.95, None);

        let view = get_graph(
            &conn,
            &GraphFilter {
                min_importance: 0.9,
                ..GraphFilter::default()
            },
        )
        .unwrap();

        assert_eq!(view.nodes.len(), 1);
        assert_eq!(view.nodes[0].id, kept.id);
    }

    #[test]
    fn views_are_capped_and_ranked() {
        let conn = db::open_memory_database().unwrap();
        for i in 0..110 {
            node(&conn, NodeKind::Task, (i as f64) / 200.0, None);
        }

        let view = get_graph(&conn, &GraphFilter::default()).unwrap();
        assert_eq!(view.nodes.len(), 100);
        for pair in view.nodes.windows(2) {
            assert!(pair[0].importance >= pair[1].importance);
        }
    }

    #[test]
    fn edges_require_both_endpoints_in_view() {
        let conn = db::open_memory_database().unwrap();
        let a = node(&conn, NodeKind::Decision, 0.9, None);
        let b = node(&conn, NodeKind::Decision, 0.9, None);
        let excluded = node(&conn, NodeKind::Decision, 0.1, None);

        store::insert_edge(
            &conn,
            &NewEdge::new(a.id.as_str(), b.id.as_str(), Relation::LeadsTo, 0.8),
        )
        .unwrap();
        store::insert_edge(
            &conn,
            &NewEdge::new(a.id.as_str(), excluded.id.as_str(), Relation::LeadsTo, 0.8),
        )
        .unwrap();

        let view = get_graph(
            &conn,
            &GraphFilter {
                min_importance: 0.5,
                ..GraphFilter::default()
            },
        )
        .unwrap();

        assert_eq!(view.edges.len(), 1);
        assert_eq!(view.edges[0].from, a.id);
        assert_eq!(view.edges[0].to, b.id);
    }

    #[test]
    fn clusters_group_by_repo_and_kind() {
        let conn = db::open_memory_database().unwrap();
        let a = node(&conn, NodeKind::CodeEvent, 0.8, Some("loom"));
        let b = node(&conn, NodeKind::CodeEvent, 0.8, Some("loom"));
        let c = node(&conn, NodeKind::Insight, 0.8, None);

        let view = get_graph(&conn, &GraphFilter::default()).unwrap();

        let repo = view.clusters.get("repo:loom").unwrap();
        assert_eq!(repo.len(), 2);
        assert!(repo.contains(&a.id) && repo.contains(&b.id));

        assert_eq!(view.clusters.get("type:code_event").unwrap().len(), 2);
        assert_eq!(view.clusters.get("type:insight").unwrap(), &vec![c.id]);
    }

    #[test]
    fn kind_filter_restricts_view() {
        let conn = db::open_memory_database().unwrap();
        node(&conn, NodeKind::Task, 0.8, None);
        let insight = node(&conn, NodeKind::Insight, 0.8, None);

        let view = get_graph(
            &conn,
            &GraphFilter {
                kinds: Some(vec![NodeKind::Insight]),
                ..GraphFilter::default()
            },
        )
        .unwrap();

        assert_eq!(view.nodes.len(), 1);
        assert_eq!(view.nodes[0].id, insight.id);
    }

    #[test]
    fn focus_parses_and_prints() {
        assert_eq!("last_7_days".parse::<Focus>().unwrap(), Focus::Last7Days);
        assert_eq!(Focus::All.to_string(), "all");
        assert!("yesterday".parse::<Focus>().is_err());
    }
}
