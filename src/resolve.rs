//! Entity resolution: identifier assignment and the alias index.
//!
//! For one import batch the resolver gives every candidate a fresh node id
//! (`{import key}_{candidate index}`), collapses case-insensitive duplicate
//! names, and records aliases used later to link relationship endpoints:
//!
//! - the full lower-cased label (strong alias), and
//! - each constituent word longer than two characters (weak alias).
//!
//! A strong alias replaces a weak one; a weak alias never replaces anything.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::{ResolveError, ResolveResult};
use crate::extract::CandidateEntity;
use crate::extract::patterns::words;
use crate::graph::{Node, Properties, PropertyValue};

/// Provenance label for imports without a transcript identifier.
pub const TEXT_IMPORT_SOURCE: &str = "text_import";

// ---------------------------------------------------------------------------
// Import context
// ---------------------------------------------------------------------------

/// Identity and provenance shared by every node and edge of one import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportContext {
    /// Id prefix for this import.
    pub key: String,
    /// Value of the `source` provenance property.
    pub source: String,
    pub user_id: String,
    pub import_id: Option<String>,
    /// Extra properties stamped on every node (e.g. `conversation_id`).
    pub references: Properties,
}

impl ImportContext {
    /// Context for an import tied to a transcript or other caller-supplied id.
    ///
    /// Ids are derived from `import_id` alone, so re-importing the same text
    /// under the same id produces the same node and edge ids.
    pub fn transcript(import_id: &str, user_id: &str) -> Self {
        Self::keyed("transcript", import_id, user_id)
    }

    /// Context for a stored conversation, keyed `conversation_{id}`.
    pub fn conversation(conversation_id: &str, user_id: &str) -> Self {
        Self::keyed("conversation", conversation_id, user_id)
            .with_reference("conversation_id", conversation_id)
    }

    /// Context for a stored summary, keyed `summary_{id}`.
    pub fn summary(summary_id: &str, user_id: &str) -> Self {
        Self::keyed("summary", summary_id, user_id).with_reference("summary_id", summary_id)
    }

    fn keyed(namespace: &str, import_id: &str, user_id: &str) -> Self {
        let key = format!("{namespace}_{import_id}");
        Self {
            source: key.clone(),
            key,
            user_id: user_id.to_string(),
            import_id: Some(import_id.to_string()),
            references: Properties::new(),
        }
    }

    /// Context for an anonymous text import numbered by the store.
    pub fn text_import(sequence: u64, user_id: &str) -> Self {
        Self {
            key: format!("{TEXT_IMPORT_SOURCE}_{sequence}"),
            source: TEXT_IMPORT_SOURCE.to_string(),
            user_id: user_id.to_string(),
            import_id: None,
            references: Properties::new(),
        }
    }

    /// Stamp `key = value` on every node produced by this import.
    pub fn with_reference(mut self, key: &str, value: &str) -> Self {
        self.references.insert(key.to_string(), PropertyValue::from(value));
        self
    }

    pub fn node_id(&self, index: usize) -> String {
        format!("{}_{index}", self.key)
    }

    pub fn edge_id(&self, index: usize) -> String {
        format!("{}_rel_{index}", self.key)
    }

    /// `source`, `user_id` and, when present, `import_id`.
    pub fn provenance(&self) -> Properties {
        let mut props = Properties::new();
        props.insert("source".into(), self.source.as_str().into());
        props.insert("user_id".into(), self.user_id.as_str().into());
        if let Some(id) = &self.import_id {
            props.insert("import_id".into(), id.as_str().into());
        }
        props
    }
}

// ---------------------------------------------------------------------------
// Alias index
// ---------------------------------------------------------------------------

/// How an alias was registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasStrength {
    /// A single word of a label.
    Word,
    /// The full label.
    Label,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AliasEntry {
    pub alias: String,
    pub node_id: String,
    pub strength: AliasStrength,
}

/// Lower-cased name → node id, kept in registration order.
#[derive(Debug, Clone, Default)]
pub struct AliasIndex {
    entries: Vec<AliasEntry>,
    slots: HashMap<String, usize>,
}

impl AliasIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alias. Returns whether the index changed.
    ///
    /// An existing alias is only replaced by a strictly stronger one; a
    /// replacement keeps the original registration slot.
    pub fn insert(&mut self, alias: &str, node_id: &str, strength: AliasStrength) -> bool {
        let alias = alias.trim().to_lowercase();
        if alias.is_empty() {
            return false;
        }
        match self.slots.get(&alias) {
            Some(&slot) => {
                let entry = &mut self.entries[slot];
                if strength > entry.strength {
                    entry.node_id = node_id.to_string();
                    entry.strength = strength;
                    true
                } else {
                    false
                }
            }
            None => {
                self.slots.insert(alias.clone(), self.entries.len());
                self.entries.push(AliasEntry {
                    alias,
                    node_id: node_id.to_string(),
                    strength,
                });
                true
            }
        }
    }

    /// Exact lookup of a lower-cased alias.
    pub fn get(&self, alias: &str) -> Option<&AliasEntry> {
        self.slots
            .get(&alias.trim().to_lowercase())
            .map(|&slot| &self.entries[slot])
    }

    /// Entries in registration order.
    pub fn entries(&self) -> &[AliasEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Output of [`EntityResolver::resolve`].
#[derive(Debug, Clone, Default)]
pub struct ResolvedBatch {
    pub nodes: Vec<Node>,
    pub index: AliasIndex,
    /// Candidates skipped for a blank label or a duplicate name.
    pub skipped: usize,
}

/// Assigns node ids to candidate entities of one import batch.
pub struct EntityResolver<'a> {
    context: &'a ImportContext,
}

impl<'a> EntityResolver<'a> {
    pub fn new(context: &'a ImportContext) -> Self {
        Self { context }
    }

    /// Resolve a batch into nodes plus the alias index for linking.
    pub fn resolve(&self, candidates: &[CandidateEntity]) -> ResolveResult<ResolvedBatch> {
        if candidates.is_empty() {
            return Err(ResolveError::EmptyBatch);
        }

        let mut batch = ResolvedBatch::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (i, candidate) in candidates.iter().enumerate() {
            let label = candidate.name.trim();
            if label.is_empty() {
                tracing::warn!(index = i, "skipping entity with an empty label");
                batch.skipped += 1;
                continue;
            }
            if !seen.insert(label.to_lowercase()) {
                tracing::debug!(label, "skipping duplicate entity in batch");
                batch.skipped += 1;
                continue;
            }

            let id = self.context.node_id(i);
            batch.index.insert(label, &id, AliasStrength::Label);
            for word in words(label).filter(|w| w.chars().count() > 2) {
                batch.index.insert(&word, &id, AliasStrength::Word);
            }

            let mut node = Node::new(id, label, candidate.kind.clone());
            node.properties = self.context.provenance();
            node.properties.extend(self.context.references.clone());
            node.properties
                .insert("confidence".into(), candidate.confidence.into());
            node.properties
                .insert("position".into(), candidate.position.into());
            batch.nodes.push(node);
        }

        tracing::debug!(
            key = %self.context.key,
            nodes = batch.nodes.len(),
            aliases = batch.index.len(),
            skipped = batch.skipped,
            "resolved entity batch"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EntityType;

    fn candidate(name: &str, kind: EntityType) -> CandidateEntity {
        CandidateEntity {
            name: name.into(),
            kind,
            confidence: 0.9,
            position: 0,
        }
    }

    #[test]
    fn empty_batch_is_an_error() {
        let ctx = ImportContext::text_import(1, "u");
        assert!(matches!(
            EntityResolver::new(&ctx).resolve(&[]),
            Err(ResolveError::EmptyBatch)
        ));
    }

    #[test]
    fn ids_follow_candidate_index() {
        let ctx = ImportContext::transcript("42", "local-user-1");
        let batch = EntityResolver::new(&ctx)
            .resolve(&[
                candidate("Tim Cook", EntityType::Person),
                candidate("  ", EntityType::Person),
                candidate("Apple Inc", EntityType::Organization),
            ])
            .unwrap();

        let ids: Vec<_> = batch.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["transcript_42_0", "transcript_42_2"]);
        assert_eq!(batch.skipped, 1);

        let tim = &batch.nodes[0];
        assert_eq!(tim.property_text("source"), Some("transcript_42"));
        assert_eq!(tim.property_text("user_id"), Some("local-user-1"));
        assert_eq!(tim.property_text("import_id"), Some("42"));
        assert_eq!(tim.properties["confidence"].as_f64(), Some(0.9));
    }

    #[test]
    fn duplicate_names_collapse_case_insensitively() {
        let ctx = ImportContext::text_import(3, "u");
        let batch = EntityResolver::new(&ctx)
            .resolve(&[
                candidate("Google", EntityType::Organization),
                candidate("GOOGLE", EntityType::Organization),
            ])
            .unwrap();
        assert_eq!(batch.nodes.len(), 1);
        assert_eq!(batch.nodes[0].id, "text_import_3_0");
        assert_eq!(batch.nodes[0].property_text("source"), Some(TEXT_IMPORT_SOURCE));
    }

    #[test]
    fn word_aliases_never_override_labels() {
        let ctx = ImportContext::text_import(1, "u");
        let batch = EntityResolver::new(&ctx)
            .resolve(&[
                candidate("Apple", EntityType::Organization),
                candidate("Apple Inc", EntityType::Organization),
            ])
            .unwrap();

        let apple = batch.index.get("apple").unwrap();
        assert_eq!(apple.node_id, "text_import_1_0");
        assert_eq!(apple.strength, AliasStrength::Label);
        assert_eq!(batch.index.get("apple inc").unwrap().node_id, "text_import_1_1");
        // "inc" is only three characters, so it is registered.
        assert_eq!(batch.index.get("inc").unwrap().strength, AliasStrength::Word);
    }

    #[test]
    fn labels_replace_earlier_word_aliases_in_place() {
        let mut index = AliasIndex::new();
        index.insert("cook", "n0", AliasStrength::Word);
        index.insert("tim", "n0", AliasStrength::Word);
        assert!(index.insert("Cook", "n1", AliasStrength::Label));
        assert!(!index.insert("cook", "n2", AliasStrength::Word));

        assert_eq!(index.entries()[0].alias, "cook");
        assert_eq!(index.entries()[0].node_id, "n1");
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn short_words_are_not_aliases() {
        let ctx = ImportContext::text_import(1, "u");
        let batch = EntityResolver::new(&ctx)
            .resolve(&[candidate("Dr. Al Li", EntityType::Person)])
            .unwrap();
        assert!(batch.index.get("al").is_none());
        assert!(batch.index.get("dr").is_none());
        assert!(batch.index.get("dr. al li").is_some());
    }

    #[test]
    fn record_contexts_use_separate_namespaces() {
        let transcript = ImportContext::transcript("42", "u");
        let conversation = ImportContext::conversation("42", "u");
        let summary = ImportContext::summary("42", "u");

        assert_eq!(transcript.node_id(0), "transcript_42_0");
        assert_eq!(conversation.node_id(0), "conversation_42_0");
        assert_eq!(summary.edge_id(1), "summary_42_rel_1");
        assert_eq!(conversation.references["conversation_id"].as_text(), Some("42"));
        assert_eq!(summary.references["summary_id"].as_text(), Some("42"));
        assert!(transcript.references.is_empty());
    }

    #[test]
    fn references_are_stamped_on_nodes() {
        let ctx = ImportContext::text_import(1, "u").with_reference("conversation_id", "c-9");
        let batch = EntityResolver::new(&ctx)
            .resolve(&[candidate("Grace Hopper", EntityType::Person)])
            .unwrap();
        assert_eq!(batch.nodes[0].property_text("conversation_id"), Some("c-9"));
    }
}
