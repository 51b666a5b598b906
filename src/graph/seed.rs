//! Seed graph: the immutable baseline sample graph.
//!
//! The seed graph is defined in TOML. One graph is bundled into the binary
//! (`data/seed/sample_graph.toml`); an external file can replace it. Seed data
//! is never mutated at runtime: deletions are expressed as tombstones held by
//! the [`GraphStore`](super::store::GraphStore) and applied at read time.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use super::{Edge, Node};

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug, Error, Diagnostic)]
pub enum SeedError {
    #[error("failed to parse seed graph \"{id}\": {message}")]
    #[diagnostic(
        code(neurovault::seed::parse),
        help("Check the TOML syntax: a `[seed]` table followed by `[[nodes]]` and `[[edges]]` arrays.")
    )]
    Parse { id: String, message: String },

    #[error("failed to read seed file: {path}")]
    #[diagnostic(code(neurovault::seed::io), help("Ensure the file exists and is readable."))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid seed graph \"{id}\": {message}")]
    #[diagnostic(
        code(neurovault::seed::invalid),
        help("Node ids must be unique and every edge must reference declared nodes.")
    )]
    Invalid { id: String, message: String },
}

pub type SeedResult<T> = std::result::Result<T, SeedError>;

// ── TOML deserialization helpers ─────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SeedToml {
    seed: SeedMeta,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct SeedMeta {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
}

const SAMPLE_GRAPH_TOML: &str = include_str!("../../data/seed/sample_graph.toml");

// ── Seed graph ──────────────────────────────────────────────────────────

/// An immutable, validated seed graph.
#[derive(Debug, Clone, Default)]
pub struct SeedGraph {
    pub id: String,
    pub name: String,
    pub version: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_ids: HashSet<String>,
}

impl SeedGraph {
    /// The sample graph bundled into the binary.
    pub fn bundled() -> SeedResult<Self> {
        Self::from_toml(SAMPLE_GRAPH_TOML)
    }

    /// A seed graph with no nodes or edges.
    pub fn empty() -> Self {
        Self {
            id: "empty".into(),
            ..Default::default()
        }
    }

    /// Load a seed graph from an external TOML file.
    pub fn from_file(path: &Path) -> SeedResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| SeedError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a seed graph from TOML text.
    pub fn from_toml(toml_str: &str) -> SeedResult<Self> {
        let parsed: SeedToml = toml::from_str(toml_str).map_err(|e| SeedError::Parse {
            id: "(unknown)".into(),
            message: e.to_string(),
        })?;
        let mut seed = Self::new(&parsed.seed.id, parsed.nodes, parsed.edges)?;
        seed.name = parsed.seed.name;
        seed.version = parsed.seed.version;
        Ok(seed)
    }

    /// Build a seed graph from in-memory nodes and edges.
    pub fn new(id: &str, nodes: Vec<Node>, edges: Vec<Edge>) -> SeedResult<Self> {
        let mut node_ids = HashSet::with_capacity(nodes.len());
        for node in &nodes {
            if node.label.trim().is_empty() {
                return Err(SeedError::Invalid {
                    id: id.to_string(),
                    message: format!("node \"{}\" has an empty label", node.id),
                });
            }
            if !node_ids.insert(node.id.clone()) {
                return Err(SeedError::Invalid {
                    id: id.to_string(),
                    message: format!("duplicate node id \"{}\"", node.id),
                });
            }
        }

        let mut edge_ids = HashSet::with_capacity(edges.len());
        for edge in &edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(SeedError::Invalid {
                    id: id.to_string(),
                    message: format!("duplicate edge id \"{}\"", edge.id),
                });
            }
            if !node_ids.contains(&edge.source) || !node_ids.contains(&edge.target) {
                return Err(SeedError::Invalid {
                    id: id.to_string(),
                    message: format!(
                        "edge \"{}\" references unknown node ({} -> {})",
                        edge.id, edge.source, edge.target
                    ),
                });
            }
        }

        Ok(Self {
            id: id.to_string(),
            name: String::new(),
            version: String::new(),
            nodes,
            edges,
            node_ids,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Whether `id` names a seed node.
    pub fn contains_node(&self, id: &str) -> bool {
        self.node_ids.contains(id)
    }

    /// Seed nodes not suppressed by a tombstone.
    pub fn visible_nodes<'a>(
        &'a self,
        tombstones: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a Node> + 'a {
        self.nodes.iter().filter(move |n| !tombstones.contains(&n.id))
    }

    /// Seed edges whose endpoints are both non-tombstoned.
    pub fn visible_edges<'a>(
        &'a self,
        tombstones: &'a BTreeSet<String>,
    ) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges
            .iter()
            .filter(move |e| !tombstones.contains(&e.source) && !tombstones.contains(&e.target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EntityType;

    #[test]
    fn bundled_sample_graph_parses() {
        let seed = SeedGraph::bundled().unwrap();
        assert_eq!(seed.id, "sample-graph");
        assert_eq!(seed.nodes().len(), 13);
        assert_eq!(seed.edges().len(), 9);

        let apple = seed.nodes().iter().find(|n| n.id == "apple").unwrap();
        assert_eq!(apple.label, "Apple Inc");
        assert_eq!(apple.kind, EntityType::Organization);
        assert_eq!(apple.property_text("industry"), Some("Technology"));
        assert!(seed.contains_node("tim_cook"));
    }

    #[test]
    fn tombstones_hide_nodes_and_their_edges() {
        let seed = SeedGraph::bundled().unwrap();
        let tombstones: BTreeSet<String> = ["apple".to_string()].into();

        assert!(seed.visible_nodes(&tombstones).all(|n| n.id != "apple"));
        let visible: Vec<_> = seed.visible_edges(&tombstones).map(|e| e.id.as_str()).collect();
        assert!(!visible.contains(&"e1"));
        assert!(!visible.contains(&"e2"));
        assert!(visible.contains(&"e3"));
    }

    #[test]
    fn dangling_seed_edge_is_rejected() {
        let nodes = vec![Node::new("a", "Alpha", EntityType::Concept)];
        let edges = vec![Edge::new("e1", "a", "missing", "RELATED_TO")];
        let err = SeedGraph::new("bad", nodes, edges).unwrap_err();
        assert!(matches!(err, SeedError::Invalid { .. }));
    }

    #[test]
    fn duplicate_seed_node_is_rejected() {
        let nodes = vec![
            Node::new("a", "Alpha", EntityType::Concept),
            Node::new("a", "Again", EntityType::Concept),
        ];
        assert!(SeedGraph::new("dup", nodes, Vec::new()).is_err());
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        let err = SeedGraph::from_toml("[seed\nid=").unwrap_err();
        assert!(matches!(err, SeedError::Parse { .. }));
    }
}
