//! Graph store: the accumulating, deduplicated, persisted knowledge graph.
//!
//! State is held behind a single mutex. Every mutating operation performs its
//! read-modify-persist sequence under that lock, so concurrent imports, deletes
//! and sync passes serialize instead of losing updates.
//!
//! Persistence is best-effort: a failed load starts from an empty generated
//! tier, a failed save is logged and reported through `persist_warning`, and
//! the in-memory state stays authoritative until the next successful save.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use super::seed::SeedGraph;
use super::snapshot::Snapshot;
use super::{Edge, GraphView, Node};

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of [`GraphStore::merge`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeReport {
    pub nodes_added: usize,
    pub edges_added: usize,
    /// Nodes refused because their id is a seed id (live or tombstoned) or their label is blank.
    pub nodes_rejected: usize,
    /// Edges dropped because an endpoint is not in the combined view.
    pub edges_rejected: usize,
    pub duplicates_removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_warning: Option<String>,
}

/// Outcome of [`GraphStore::delete_node`] and [`GraphStore::remove_nodes_with_property`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeleteReport {
    pub nodes_removed: usize,
    pub edges_removed: usize,
    /// Whether a seed node was tombstoned.
    pub tombstoned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_warning: Option<String>,
}

/// Per-tier counts for [`ClearReport`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClearBreakdown {
    pub generated_nodes_removed: usize,
    pub generated_edges_removed: usize,
    pub seed_nodes_removed: usize,
    pub seed_edges_removed: usize,
}

/// Outcome of [`GraphStore::clear_all`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClearReport {
    pub nodes_removed: usize,
    pub edges_removed: usize,
    pub breakdown: ClearBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_warning: Option<String>,
}

/// Outcome of [`GraphStore::deduplicate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DedupReport {
    pub nodes_removed: usize,
    pub edges_removed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_warning: Option<String>,
}

/// Size summary of both tiers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphStats {
    pub seed_nodes: usize,
    pub seed_edges: usize,
    pub generated_nodes: usize,
    pub generated_edges: usize,
    pub tombstones: usize,
    pub visible_nodes: usize,
    pub visible_edges: usize,
    pub import_sequence: u64,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct GraphState {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    tombstones: BTreeSet<String>,
    import_sequence: u64,
}

/// Two-tier graph store: immutable seed graph plus owned generated graph.
pub struct GraphStore {
    path: Option<PathBuf>,
    seed: SeedGraph,
    state: Mutex<GraphState>,
}

impl GraphStore {
    /// Open a persisted store. Missing or unreadable snapshots start empty.
    pub fn open(path: impl Into<PathBuf>, seed: SeedGraph) -> Self {
        let path = path.into();
        let state = match Snapshot::load(&path) {
            Ok(Some(snapshot)) => GraphState::from_snapshot(snapshot, &seed),
            Ok(None) => {
                tracing::debug!(path = %path.display(), "no graph snapshot yet, starting empty");
                GraphState::default()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "could not load graph snapshot, starting with an empty generated graph"
                );
                GraphState::default()
            }
        };

        tracing::info!(
            path = %path.display(),
            generated_nodes = state.nodes.len(),
            generated_edges = state.edges.len(),
            tombstones = state.tombstones.len(),
            "graph store opened"
        );

        Self {
            path: Some(path),
            seed,
            state: Mutex::new(state),
        }
    }

    /// A store that never touches disk.
    pub fn in_memory(seed: SeedGraph) -> Self {
        Self {
            path: None,
            seed,
            state: Mutex::new(GraphState::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn seed(&self) -> &SeedGraph {
        &self.seed
    }

    fn lock(&self) -> MutexGuard<'_, GraphState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the current state. Returns a warning message on failure.
    fn persist(&self, state: &GraphState) -> Option<String> {
        let path = self.path.as_ref()?;
        let mut snapshot = Snapshot {
            nodes: state.nodes.clone(),
            edges: state.edges.clone(),
            deleted_sample_nodes: state.tombstones.clone(),
            last_updated: String::new(),
            import_sequence: state.import_sequence,
        };
        match snapshot.save(path) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to persist graph snapshot, in-memory state remains authoritative"
                );
                Some(e.to_string())
            }
        }
    }

    /// Reserve the next anonymous import number.
    pub fn allocate_import_sequence(&self) -> u64 {
        let mut state = self.lock();
        state.import_sequence += 1;
        state.import_sequence
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Insert nodes and edges whose ids are not yet present, then deduplicate and persist.
    ///
    /// Nodes whose id belongs to the seed graph are refused, which keeps
    /// tombstoned ids out of the combined view for good. Edges are checked
    /// against the combined view after node insertion; an edge with a missing
    /// endpoint is dropped, never backed by a phantom node.
    pub fn merge(&self, nodes: Vec<Node>, edges: Vec<Edge>) -> MergeReport {
        let mut state = self.lock();
        let mut report = MergeReport::default();

        let mut node_ids: HashSet<String> = state.nodes.iter().map(|n| n.id.clone()).collect();
        for node in nodes {
            if self.seed.contains_node(&node.id) {
                tracing::warn!(
                    node_id = %node.id,
                    tombstoned = state.tombstones.contains(&node.id),
                    "refusing generated node that reuses a seed id"
                );
                report.nodes_rejected += 1;
                continue;
            }
            if node.label.trim().is_empty() {
                tracing::warn!(node_id = %node.id, "refusing node with an empty label");
                report.nodes_rejected += 1;
                continue;
            }
            if node_ids.insert(node.id.clone()) {
                state.nodes.push(node);
                report.nodes_added += 1;
            }
        }

        let mut edge_ids: HashSet<String> = state.edges.iter().map(|e| e.id.clone()).collect();
        for edge in edges {
            let resolves = |id: &str| {
                node_ids.contains(id)
                    || (self.seed.contains_node(id) && !state.tombstones.contains(id))
            };
            if !resolves(&edge.source) || !resolves(&edge.target) {
                tracing::warn!(
                    edge_id = %edge.id,
                    source = %edge.source,
                    target = %edge.target,
                    "dropping edge with an endpoint missing from the graph"
                );
                report.edges_rejected += 1;
                continue;
            }
            if edge_ids.insert(edge.id.clone()) {
                state.edges.push(edge);
                report.edges_added += 1;
            }
        }

        let (dup_nodes, dup_edges) = state.dedup();
        report.duplicates_removed = dup_nodes + dup_edges;
        report.persist_warning = self.persist(&state);

        tracing::info!(
            nodes_added = report.nodes_added,
            edges_added = report.edges_added,
            edges_rejected = report.edges_rejected,
            "merged into generated graph"
        );
        report
    }

    /// Remove a node and every edge touching it.
    ///
    /// Generated nodes are deleted outright. A seed node is tombstoned
    /// instead, and its still-visible seed edges are counted as removed.
    pub fn delete_node(&self, node_id: &str) -> DeleteReport {
        let mut state = self.lock();
        let mut report = DeleteReport::default();

        let before = state.nodes.len();
        state.nodes.retain(|n| n.id != node_id);
        report.nodes_removed = before - state.nodes.len();

        let before = state.edges.len();
        state.edges.retain(|e| !e.touches(node_id));
        report.edges_removed = before - state.edges.len();

        if self.seed.contains_node(node_id) && !state.tombstones.contains(node_id) {
            report.edges_removed += self
                .seed
                .visible_edges(&state.tombstones)
                .filter(|e| e.touches(node_id))
                .count();
            state.tombstones.insert(node_id.to_string());
            report.nodes_removed += 1;
            report.tombstoned = true;
        }

        if report.nodes_removed == 0 && report.edges_removed == 0 {
            tracing::debug!(node_id, "delete requested for unknown node");
            return report;
        }

        report.persist_warning = self.persist(&state);
        tracing::info!(
            node_id,
            nodes_removed = report.nodes_removed,
            edges_removed = report.edges_removed,
            tombstoned = report.tombstoned,
            "deleted node"
        );
        report
    }

    /// Empty the generated tier and tombstone every seed node.
    pub fn clear_all(&self) -> ClearReport {
        let mut state = self.lock();

        let breakdown = ClearBreakdown {
            generated_nodes_removed: state.nodes.len(),
            generated_edges_removed: state.edges.len(),
            seed_nodes_removed: self.seed.visible_nodes(&state.tombstones).count(),
            seed_edges_removed: self.seed.visible_edges(&state.tombstones).count(),
        };

        state.nodes.clear();
        state.edges.clear();
        for node in self.seed.nodes() {
            state.tombstones.insert(node.id.clone());
        }

        let report = ClearReport {
            nodes_removed: breakdown.generated_nodes_removed + breakdown.seed_nodes_removed,
            edges_removed: breakdown.generated_edges_removed + breakdown.seed_edges_removed,
            breakdown,
            persist_warning: self.persist(&state),
        };
        tracing::info!(
            nodes_removed = report.nodes_removed,
            edges_removed = report.edges_removed,
            "cleared all graph data"
        );
        report
    }

    /// Drop duplicate node and edge ids (first occurrence wins). Persists only on change.
    pub fn deduplicate(&self) -> DedupReport {
        let mut state = self.lock();
        let (nodes_removed, edges_removed) = state.dedup();
        let mut report = DedupReport {
            nodes_removed,
            edges_removed,
            persist_warning: None,
        };
        if nodes_removed + edges_removed > 0 {
            report.persist_warning = self.persist(&state);
            tracing::info!(nodes_removed, edges_removed, "removed duplicate graph entries");
        }
        report
    }

    /// Remove generated nodes whose text property `key` equals `value`, with edge cascade.
    pub fn remove_nodes_with_property(&self, key: &str, value: &str) -> DeleteReport {
        let mut state = self.lock();
        let doomed: HashSet<String> = state
            .nodes
            .iter()
            .filter(|n| n.property_text(key) == Some(value))
            .map(|n| n.id.clone())
            .collect();
        if doomed.is_empty() {
            return DeleteReport::default();
        }

        let before = state.nodes.len();
        state.nodes.retain(|n| !doomed.contains(&n.id));
        let nodes_removed = before - state.nodes.len();

        let before = state.edges.len();
        state
            .edges
            .retain(|e| !doomed.contains(&e.source) && !doomed.contains(&e.target));
        let edges_removed = before - state.edges.len();

        let report = DeleteReport {
            nodes_removed,
            edges_removed,
            tombstoned: false,
            persist_warning: self.persist(&state),
        };
        tracing::info!(key, value, nodes_removed, edges_removed, "removed referencing nodes");
        report
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Visible seed data followed by generated data, first-seen id wins.
    ///
    /// Edges whose endpoints are not both in the resulting node set are left
    /// out, so the view never contains a dangling edge.
    pub fn combined_view(&self) -> GraphView {
        let state = self.lock();
        let mut view = GraphView::default();

        let mut node_ids: HashSet<&str> = HashSet::new();
        for node in self.seed.visible_nodes(&state.tombstones).chain(state.nodes.iter()) {
            if node_ids.insert(node.id.as_str()) {
                view.nodes.push(node.clone());
            }
        }

        let mut edge_ids: HashSet<&str> = HashSet::new();
        for edge in self.seed.visible_edges(&state.tombstones).chain(state.edges.iter()) {
            if !node_ids.contains(edge.source.as_str()) || !node_ids.contains(edge.target.as_str()) {
                continue;
            }
            if edge_ids.insert(edge.id.as_str()) {
                view.edges.push(edge.clone());
            }
        }
        view
    }

    /// The generated tier only.
    pub fn generated(&self) -> GraphView {
        let state = self.lock();
        GraphView {
            nodes: state.nodes.clone(),
            edges: state.edges.clone(),
        }
    }

    /// Tombstoned seed node ids, sorted.
    pub fn tombstones(&self) -> Vec<String> {
        self.lock().tombstones.iter().cloned().collect()
    }

    pub fn stats(&self) -> GraphStats {
        let view = self.combined_view();
        let state = self.lock();
        GraphStats {
            seed_nodes: self.seed.nodes().len(),
            seed_edges: self.seed.edges().len(),
            generated_nodes: state.nodes.len(),
            generated_edges: state.edges.len(),
            tombstones: state.tombstones.len(),
            visible_nodes: view.nodes.len(),
            visible_edges: view.edges.len(),
            import_sequence: state.import_sequence,
        }
    }
}

impl GraphState {
    fn from_snapshot(snapshot: Snapshot, seed: &SeedGraph) -> Self {
        let mut state = Self {
            nodes: snapshot.nodes,
            edges: snapshot.edges,
            tombstones: snapshot.deleted_sample_nodes,
            import_sequence: snapshot.import_sequence,
        };
        let (dup_nodes, dup_edges) = state.dedup();
        if dup_nodes + dup_edges > 0 {
            tracing::warn!(dup_nodes, dup_edges, "snapshot contained duplicate ids");
        }

        let node_ids: HashSet<String> = state.nodes.iter().map(|n| n.id.clone()).collect();
        let tombstones = &state.tombstones;
        let resolves =
            |id: &str| node_ids.contains(id) || (seed.contains_node(id) && !tombstones.contains(id));
        let before = state.edges.len();
        let kept: Vec<Edge> = state
            .edges
            .iter()
            .filter(|e| resolves(&e.source) && resolves(&e.target))
            .cloned()
            .collect();
        if kept.len() < before {
            tracing::warn!(dropped = before - kept.len(), "pruned dangling edges from snapshot");
        }
        state.edges = kept;
        state
    }

    fn dedup(&mut self) -> (usize, usize) {
        (
            dedup_by_id(&mut self.nodes, |n| &n.id),
            dedup_by_id(&mut self.edges, |e| &e.id),
        )
    }
}

/// Keep the first item per id. Returns how many were removed.
fn dedup_by_id<T>(items: &mut Vec<T>, id: impl Fn(&T) -> &String) -> usize {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let before = items.len();
    items.retain(|item| seen.insert(id(item).clone()));
    before - items.len()
}
