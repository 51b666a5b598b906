//! Relationship linking: free-text endpoints to node ids.
//!
//! Each endpoint is matched against the alias index independently. An alias
//! equal to the endpoint text scores its length; an alias that contains, or is
//! contained in, the text scores half its length. The highest score wins and
//! ties go to the alias registered first. A relationship with an unresolvable
//! endpoint is dropped.

use crate::extract::CandidateRelationship;
use crate::graph::Edge;
use crate::resolve::{AliasEntry, AliasIndex, ImportContext};

/// A matched alias with its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AliasMatch<'a> {
    pub entry: &'a AliasEntry,
    pub score: f64,
}

/// Output of [`RelationshipLinker::link`].
#[derive(Debug, Clone, Default)]
pub struct LinkedEdges {
    pub edges: Vec<Edge>,
    /// Relationships dropped for an unresolved endpoint or a self-loop.
    pub dropped: usize,
}

fn alias_score(alias: &str, text: &str) -> Option<f64> {
    let len = alias.chars().count() as f64;
    if alias == text {
        Some(len)
    } else if alias.contains(text) || text.contains(alias) {
        Some(len / 2.0)
    } else {
        None
    }
}

/// Links candidate relationships against one batch's alias index.
pub struct RelationshipLinker<'a> {
    index: &'a AliasIndex,
}

impl<'a> RelationshipLinker<'a> {
    pub fn new(index: &'a AliasIndex) -> Self {
        Self { index }
    }

    /// Best-scoring alias for `text`, or `None` when nothing overlaps.
    pub fn best_match(&self, text: &str) -> Option<AliasMatch<'a>> {
        let text = text.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }

        let mut best: Option<AliasMatch<'a>> = None;
        for entry in self.index.entries() {
            let Some(score) = alias_score(&entry.alias, &text) else {
                continue;
            };
            if best.is_none_or(|b| score > b.score) {
                best = Some(AliasMatch { entry, score });
            }
        }
        best
    }

    /// Turn candidates into edges with ids `{key}_rel_{index}`.
    pub fn link(&self, candidates: &[CandidateRelationship], context: &ImportContext) -> LinkedEdges {
        let mut linked = LinkedEdges::default();

        for (i, candidate) in candidates.iter().enumerate() {
            let (Some(source), Some(target)) = (
                self.best_match(&candidate.source),
                self.best_match(&candidate.target),
            ) else {
                tracing::debug!(
                    source = %candidate.source,
                    target = %candidate.target,
                    rel_type = %candidate.rel_type,
                    "dropping relationship with an unresolved endpoint"
                );
                linked.dropped += 1;
                continue;
            };

            if source.entry.node_id == target.entry.node_id {
                tracing::debug!(
                    node_id = %source.entry.node_id,
                    rel_type = %candidate.rel_type,
                    "dropping relationship that resolves to a self-loop"
                );
                linked.dropped += 1;
                continue;
            }

            let mut edge = Edge::new(
                context.edge_id(i),
                source.entry.node_id.as_str(),
                target.entry.node_id.as_str(),
                candidate.rel_type.as_str(),
            )
            .with_weight(candidate.weight);
            edge.properties = context.provenance();
            edge.properties
                .insert("confidence".into(), candidate.confidence.into());
            linked.edges.push(edge);
        }
        linked
    }
}
