//! Engine facade: top-level API for neurovault.
//!
//! The `Engine` owns the extractor and the graph store and exposes the
//! operations used by outer layers (CLI, HTTP handlers, the sync task):
//! extraction, text import, combined-graph reads, node deletion and full
//! clear. Import runs extract → resolve → link → merge, and the caller sees
//! the combined view only after the merge has been persisted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::error::{EngineError, ResolveError, VaultResult};
use crate::extract::{Extraction, PatternExtractor};
use crate::graph::seed::SeedGraph;
use crate::graph::store::{ClearReport, DedupReport, DeleteReport, GraphStats, GraphStore};
use crate::graph::{Edge, GraphView, Node};
use crate::link::RelationshipLinker;
use crate::resolve::{EntityResolver, ImportContext};
use crate::sync::{ConversationRecord, SummaryRecord};

/// Configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Data directory for the snapshot. `None` for memory-only mode.
    pub data_dir: Option<PathBuf>,
    /// Snapshot file name inside `data_dir`.
    pub snapshot_file: String,
    /// `user_id` used when an import does not name one.
    pub default_user_id: String,
    /// Load a seed graph at all.
    pub include_seed_graph: bool,
    /// External seed graph replacing the bundled one.
    pub seed_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            snapshot_file: "generated_graph.json".into(),
            default_user_id: "local-user-1".into(),
            include_seed_graph: true,
            seed_file: None,
        }
    }
}

/// Result of [`Engine::generate_graph_from_text`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    /// Combined view after the merge.
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    /// Entities resolved from this text.
    pub entities_created: usize,
    /// Relationships linked to resolved entities.
    pub relationships_created: usize,
    /// Net new generated nodes and edges.
    pub nodes_added: usize,
    pub edges_added: usize,
    pub relationships_dropped: usize,
    pub facts: Vec<String>,
    /// Id prefix used for this import, `None` when nothing was imported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persist_warning: Option<String>,
}

/// Summary returned by [`Engine::info`].
#[derive(Debug, Clone, Serialize)]
pub struct EngineInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
    pub seed_graph: String,
    pub stats: GraphStats,
}

/// The neurovault engine.
pub struct Engine {
    config: EngineConfig,
    extractor: PatternExtractor,
    store: Arc<GraphStore>,
}

impl Engine {
    /// Create a new engine with the given configuration.
    pub fn new(config: EngineConfig) -> VaultResult<Self> {
        if config.snapshot_file.trim().is_empty() {
            return Err(EngineError::InvalidConfig {
                message: "snapshot_file must not be empty".into(),
            }
            .into());
        }
        if config.default_user_id.trim().is_empty() {
            return Err(EngineError::InvalidConfig {
                message: "default_user_id must not be empty".into(),
            }
            .into());
        }

        let seed = match (&config.seed_file, config.include_seed_graph) {
            (_, false) => SeedGraph::empty(),
            (Some(path), true) => SeedGraph::from_file(path)?,
            (None, true) => SeedGraph::bundled()?,
        };

        let store = match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir).map_err(|e| EngineError::DataDir {
                    path: dir.display().to_string(),
                    source: e,
                })?;
                GraphStore::open(dir.join(&config.snapshot_file), seed)
            }
            None => GraphStore::in_memory(seed),
        };

        tracing::info!(
            data_dir = ?config.data_dir,
            seed = %store.seed().id,
            "initializing neurovault engine"
        );

        Ok(Self {
            config,
            extractor: PatternExtractor::new(),
            store: Arc::new(store),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Shared handle to the graph store (for the sync task).
    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.store.path()
    }

    // -----------------------------------------------------------------------
    // Extraction and import
    // -----------------------------------------------------------------------

    /// Entities, relationships and facts found in `text`. Never fails.
    pub fn extract_entities_and_relationships(&self, text: &str) -> Extraction {
        self.extractor.extract(text)
    }

    /// Extract, resolve, link and merge `text` into the generated graph.
    ///
    /// With an `import_id`, node and edge ids are derived from it, so repeating
    /// the same import is a no-op. Without one, the store numbers the import.
    pub fn generate_graph_from_text(
        &self,
        text: &str,
        import_id: Option<&str>,
        user_id: Option<&str>,
    ) -> ImportReport {
        let user_id = user_id.unwrap_or(&self.config.default_user_id);
        let context = match import_id {
            Some(id) => ImportContext::transcript(id, user_id),
            None => ImportContext::text_import(self.store.allocate_import_sequence(), user_id),
        };
        self.import(text, context)
    }

    /// Import a stored conversation under `conversation_{id}`, tagging its nodes with `conversation_id`.
    pub fn import_conversation(&self, record: &ConversationRecord) -> ImportReport {
        let text = format!("{}\n{}", record.user_message, record.ai_response);
        let user_id = record.user_id.as_deref().unwrap_or(&self.config.default_user_id);
        let context = ImportContext::conversation(&record.conversation_id, user_id);
        self.import(&text, context)
    }

    /// Import a stored summary under `summary_{id}`, tagging its nodes with `summary_id`.
    pub fn import_summary(&self, record: &SummaryRecord) -> ImportReport {
        let context = ImportContext::summary(&record.id, &self.config.default_user_id);
        self.import(&record.content, context)
    }

    /// Run the import pipeline under an explicit context.
    pub fn import(&self, text: &str, context: ImportContext) -> ImportReport {
        let extraction = self.extractor.extract(text);

        let batch = match EntityResolver::new(&context).resolve(&extraction.entities) {
            Ok(batch) => batch,
            Err(ResolveError::EmptyBatch) => {
                tracing::info!(key = %context.key, "no entities found, nothing imported");
                let view = self.store.combined_view();
                return ImportReport {
                    nodes: view.nodes,
                    edges: view.edges,
                    facts: extraction.facts,
                    ..Default::default()
                };
            }
        };

        let linked = RelationshipLinker::new(&batch.index).link(&extraction.relationships, &context);
        let entities_created = batch.nodes.len();
        let relationships_created = linked.edges.len();

        let merge = self.store.merge(batch.nodes, linked.edges);
        let view = self.store.combined_view();

        tracing::info!(
            key = %context.key,
            entities = entities_created,
            relationships = relationships_created,
            nodes_added = merge.nodes_added,
            edges_added = merge.edges_added,
            "imported text into graph"
        );

        ImportReport {
            nodes: view.nodes,
            edges: view.edges,
            entities_created,
            relationships_created,
            nodes_added: merge.nodes_added,
            edges_added: merge.edges_added,
            relationships_dropped: linked.dropped + merge.edges_rejected,
            facts: extraction.facts,
            import_key: Some(context.key),
            persist_warning: merge.persist_warning,
        }
    }

    // -----------------------------------------------------------------------
    // Graph reads and mutations
    // -----------------------------------------------------------------------

    /// Seed (minus tombstones) plus generated graph.
    pub fn get_combined_graph(&self) -> GraphView {
        self.store.combined_view()
    }

    /// Delete a node and its edges. Unknown ids report zero counts.
    pub fn delete_node(&self, node_id: &str) -> DeleteReport {
        self.store.delete_node(node_id)
    }

    /// Remove all generated data and tombstone the whole seed graph.
    pub fn clear_all_graph_data(&self, user_id: Option<&str>) -> ClearReport {
        let user_id = user_id.unwrap_or(&self.config.default_user_id);
        tracing::info!(user_id, "clearing all graph data");
        self.store.clear_all()
    }

    /// Drop duplicate node and edge ids from the generated tier.
    pub fn deduplicate(&self) -> DedupReport {
        self.store.deduplicate()
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            snapshot_path: self.store.path().map(Path::to_path_buf),
            seed_graph: self.store.seed().id.clone(),
            stats: self.store.stats(),
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("data_dir", &self.config.data_dir)
            .field("seed", &self.store.seed().id)
            .finish()
    }
}
