//! Pattern extractor: typed entities, relationships and facts from raw text.
//!
//! Extraction is stateless and never fails. Entity extraction walks an ordered
//! strategy table, one row per entity type, each row carrying its compiled
//! patterns, a plausibility check and a confidence bonus. Every match goes
//! through the same quality filters, is scored, and the survivors are
//! deduplicated case-insensitively (first occurrence wins) above a confidence
//! floor of [`MIN_CONFIDENCE`].

pub mod facts;
pub(crate) mod patterns;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::graph::EntityType;

pub use facts::{MAX_FACTS, extract_facts};

/// Candidates scoring below this are discarded.
pub const MIN_CONFIDENCE: f64 = 0.6;

/// Confidence assigned to every pattern-matched relationship.
pub const RELATIONSHIP_CONFIDENCE: f64 = 0.7;

/// Label of the extraction method reported in [`Extraction::method`].
pub const EXTRACTION_METHOD: &str = "pattern_matching";

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// An unresolved entity: typed, positioned, scored text span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntityType,
    pub confidence: f64,
    /// Byte offset of the match start.
    pub position: usize,
}

/// An unresolved relationship between two free-text endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRelationship {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub confidence: f64,
    pub weight: f64,
    pub position: usize,
}

/// Everything extracted from one text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub entities: Vec<CandidateEntity>,
    pub relationships: Vec<CandidateRelationship>,
    pub facts: Vec<String>,
    pub text_length: usize,
    pub word_count: usize,
    pub method: String,
}

// ---------------------------------------------------------------------------
// Strategy tables
// ---------------------------------------------------------------------------

/// One row of the entity strategy table.
struct EntityStrategy {
    kind: EntityType,
    patterns: Vec<Regex>,
    plausible: fn(&str) -> bool,
    bonus: fn(&str) -> f64,
}

impl EntityStrategy {
    fn new(
        kind: EntityType,
        sources: &[&str],
        plausible: fn(&str) -> bool,
        bonus: fn(&str) -> f64,
    ) -> Self {
        Self {
            kind,
            patterns: sources
                .iter()
                .map(|p| Regex::new(p).expect("entity pattern"))
                .collect(),
            plausible,
            bonus,
        }
    }
}

static ENTITY_STRATEGIES: LazyLock<Vec<EntityStrategy>> = LazyLock::new(|| {
    vec![
        EntityStrategy::new(
            EntityType::Person,
            patterns::PERSON,
            plausible_person,
            person_bonus,
        ),
        EntityStrategy::new(
            EntityType::Organization,
            patterns::ORGANIZATION,
            plausible_organization,
            organization_bonus,
        ),
        EntityStrategy::new(
            EntityType::Location,
            patterns::LOCATION,
            has_uppercase,
            no_bonus,
        ),
        EntityStrategy::new(
            EntityType::Technology,
            patterns::TECHNOLOGY,
            plausible_technology,
            technology_bonus,
        ),
    ]
});

struct RelationshipRule {
    rel_type: &'static str,
    pattern: Regex,
}

static RELATIONSHIP_RULES: LazyLock<Vec<RelationshipRule>> = LazyLock::new(|| {
    patterns::RELATIONSHIPS
        .iter()
        .map(|&(rel_type, source, verb, target)| RelationshipRule {
            rel_type,
            pattern: Regex::new(&patterns::relationship_regex(source, verb, target))
                .expect("relationship pattern"),
        })
        .collect()
});

fn has_uppercase(text: &str) -> bool {
    text.chars().any(char::is_uppercase)
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn plausible_person(text: &str) -> bool {
    has_uppercase(text) && word_count(text) <= 3 && !patterns::has_non_person_word(text)
}

fn plausible_organization(text: &str) -> bool {
    has_uppercase(text) && (word_count(text) <= 3 || patterns::has_corporate_suffix(text))
}

fn plausible_technology(text: &str) -> bool {
    text.chars().count() >= 3
}

fn person_bonus(text: &str) -> f64 {
    if word_count(text) == 2 { 0.2 } else { 0.0 }
}

fn organization_bonus(text: &str) -> f64 {
    if patterns::has_corporate_suffix(text) { 0.3 } else { 0.0 }
}

fn technology_bonus(text: &str) -> f64 {
    if text.chars().count() >= 4 { 0.1 } else { 0.0 }
}

fn no_bonus(_: &str) -> f64 {
    0.0
}

/// Base 0.5, +0.2 when capitalised, plus the type bonus, length penalties, clamped to [0.1, 1.0].
fn score(text: &str, bonus: fn(&str) -> f64) -> f64 {
    let mut confidence = 0.5;
    if has_uppercase(text) {
        confidence += 0.2;
    }
    confidence += bonus(text);

    let len = text.chars().count();
    if len < 3 {
        confidence -= 0.2;
    } else if len > 30 {
        confidence -= 0.1;
    }
    (confidence.clamp(0.1, 1.0_f64) * 100.0).round() / 100.0
}

/// Type-independent quality filters. `lower` is the lower-cased `text`.
fn passes_quality_filters(text: &str, lower: &str) -> bool {
    text.chars().count() > 2
        && !patterns::has_function_word(text)
        && !text.chars().all(|c| c.is_ascii_digit())
        && word_count(text) <= 4
        && text.chars().any(char::is_alphabetic)
        && !["http", "www", "ftp"].iter().any(|scheme| lower.starts_with(scheme))
        && !patterns::has_invalid_shape(lower)
}

// ---------------------------------------------------------------------------
// Extractor
// ---------------------------------------------------------------------------

/// Stateless regex-driven extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternExtractor;

impl PatternExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Entities, relationships, facts and text statistics in one pass.
    pub fn extract(&self, text: &str) -> Extraction {
        let extraction = Extraction {
            entities: self.extract_entities(text),
            relationships: self.extract_relationships(text),
            facts: extract_facts(text),
            text_length: text.chars().count(),
            word_count: word_count(text),
            method: EXTRACTION_METHOD.to_string(),
        };
        tracing::debug!(
            entities = extraction.entities.len(),
            relationships = extraction.relationships.len(),
            facts = extraction.facts.len(),
            "extracted text"
        );
        extraction
    }

    /// Typed entity candidates with confidence >= [`MIN_CONFIDENCE`], unique by lower-cased name.
    pub fn extract_entities(&self, text: &str) -> Vec<CandidateEntity> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut entities = Vec::new();

        for strategy in ENTITY_STRATEGIES.iter() {
            for pattern in &strategy.patterns {
                for m in pattern.find_iter(text) {
                    let name = m.as_str().trim();
                    let lower = name.to_lowercase();

                    if !passes_quality_filters(name, &lower) || !(strategy.plausible)(name) {
                        tracing::trace!(candidate = name, kind = %strategy.kind, "rejected candidate");
                        continue;
                    }

                    let confidence = score(name, strategy.bonus);
                    if confidence < MIN_CONFIDENCE || seen.contains(&lower) {
                        continue;
                    }

                    let kind = patterns::reclassify(&lower).unwrap_or_else(|| strategy.kind.clone());
                    seen.insert(lower);
                    entities.push(CandidateEntity {
                        name: name.to_string(),
                        kind,
                        confidence,
                        position: m.start(),
                    });
                }
            }
        }
        entities
    }

    /// Relationship candidates in rule order, unique by (source, target, type).
    ///
    /// Types are adjusted by context before deduplication: see
    /// [`patterns::retype_relationship`].
    pub fn extract_relationships(&self, text: &str) -> Vec<CandidateRelationship> {
        let mut seen: HashSet<(String, String, &'static str)> = HashSet::new();
        let mut relationships = Vec::new();
        let text_lower = text.to_lowercase();

        for rule in RELATIONSHIP_RULES.iter() {
            for caps in rule.pattern.captures_iter(text) {
                let (Some(whole), Some(source), Some(target)) = (caps.get(0), caps.get(1), caps.get(2))
                else {
                    continue;
                };
                let source = source.as_str().trim();
                let target = target.as_str().trim();
                if source.chars().count() < 2 || target.chars().count() < 2 {
                    continue;
                }

                let rel_type = patterns::retype_relationship(&text_lower, source, target, rule.rel_type);
                let key = (source.to_lowercase(), target.to_lowercase(), rel_type);
                if key.0 == key.1 {
                    tracing::debug!(source, rel_type, "dropping self-referencing relationship");
                    continue;
                }
                if !seen.insert(key) {
                    continue;
                }

                relationships.push(CandidateRelationship {
                    source: source.to_string(),
                    target: target.to_string(),
                    rel_type: rel_type.to_string(),
                    confidence: RELATIONSHIP_CONFIDENCE,
                    weight: 1.0,
                    position: whole.start(),
                });
            }
        }
        relationships
    }

    /// Factual sentences, at most [`MAX_FACTS`].
    pub fn extract_facts(&self, text: &str) -> Vec<String> {
        extract_facts(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity<'a>(entities: &'a [CandidateEntity], name: &str) -> Option<&'a CandidateEntity> {
        entities.iter().find(|e| e.name == name)
    }

    #[test]
    fn ceo_sentence_yields_person_org_and_relationship() {
        let extraction = PatternExtractor::new().extract("Tim Cook is the CEO of Apple Inc.");

        let tim = entity(&extraction.entities, "Tim Cook").unwrap();
        assert_eq!(tim.kind, EntityType::Person);
        assert_eq!(tim.position, 0);
        let apple = entity(&extraction.entities, "Apple Inc").unwrap();
        assert_eq!(apple.kind, EntityType::Organization);
        assert_eq!(apple.confidence, 1.0);

        let rel = &extraction.relationships[0];
        assert_eq!(rel.source, "Tim Cook");
        assert_eq!(rel.target, "Apple Inc");
        assert_eq!(rel.rel_type, "CEO_OF");
        assert_eq!(rel.confidence, RELATIONSHIP_CONFIDENCE);
        assert_eq!(rel.weight, 1.0);
    }

    #[test]
    fn corporate_name_is_not_a_person() {
        let entities = PatternExtractor::new().extract_entities("Apple Inc shipped.");
        assert!(entities.iter().all(|e| e.kind != EntityType::Person));
    }

    #[test]
    fn lower_case_text_yields_nothing() {
        let extraction =
            PatternExtractor::new().extract("the quick brown fox works at the old mill with machine learning");
        assert!(extraction.entities.is_empty());
        assert!(extraction.relationships.is_empty());
    }

    #[test]
    fn confidence_floor_holds() {
        let text = "Dr. Jane Smith met John F. Kennedy in Austin, Texas about the React Native Framework \
                    and Python at Acme Global Solutions and Google.";
        let entities = PatternExtractor::new().extract_entities(text);
        assert!(!entities.is_empty());
        assert!(entities.iter().all(|e| e.confidence >= MIN_CONFIDENCE));
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let entities =
            PatternExtractor::new().extract_entities("Google hired Grace Hopper. Later GOOGLE and Google met.");
        let googles: Vec<_> = entities
            .iter()
            .filter(|e| e.name.eq_ignore_ascii_case("google"))
            .collect();
        assert_eq!(googles.len(), 1);
        assert_eq!(googles[0].name, "Google");
    }

    #[test]
    fn each_family_contributes() {
        let text = "Grace Hopper visited Seattle. Microsoft uses Kubernetes. Dr. Ada Byron lives in Kings County.";
        let entities = PatternExtractor::new().extract_entities(text);
        let kind_of = |name: &str| entity(&entities, name).map(|e| e.kind.clone());
        assert_eq!(kind_of("Grace Hopper"), Some(EntityType::Person));
        assert_eq!(kind_of("Seattle"), Some(EntityType::Location));
        assert_eq!(kind_of("Microsoft"), Some(EntityType::Organization));
        assert_eq!(kind_of("Kubernetes"), Some(EntityType::Technology));
        assert_eq!(kind_of("Kings County"), Some(EntityType::Location));
    }

    #[test]
    fn food_terms_are_reclassified() {
        let entities = PatternExtractor::new().extract_entities("We ordered Salt Pickle again.");
        let pickle = entity(&entities, "Salt Pickle").unwrap();
        assert_eq!(pickle.kind, EntityType::Food);
    }

    #[test]
    fn capitalised_phrase_fragments_are_not_names() {
        let entities = PatternExtractor::new()
            .extract_entities("Bring Out the cake. Leads Meta was a headline. Ada Lovelace agreed.");
        let names: Vec<_> = entities.iter().map(|e| e.name.as_str()).collect();
        assert!(!names.contains(&"Bring Out"));
        assert!(!names.contains(&"Leads Meta"));
        assert!(names.contains(&"Ada Lovelace"));
    }

    #[test]
    fn relationship_verbs_ignore_case() {
        let rels = PatternExtractor::new()
            .extract_relationships("Elon Musk FOUNDED SpaceX and Meta Owns Instagram.");
        let types: Vec<_> = rels.iter().map(|r| r.rel_type.as_str()).collect();
        assert_eq!(types, ["FOUNDED", "OWNS"]);
        assert_eq!(rels[0].target, "SpaceX");
        assert_eq!(rels[1].source, "Meta");
    }

    #[test]
    fn repeated_relationships_are_deduplicated() {
        let rels = PatternExtractor::new()
            .extract_relationships("Meta owns Instagram. META owns INSTAGRAM. Meta owns Instagram.");
        assert_eq!(rels.len(), 1);
    }

    #[test]
    fn self_references_are_dropped() {
        let rels = PatternExtractor::new().extract_relationships("Acme uses Acme.");
        assert!(rels.is_empty());
    }

    #[test]
    fn relationship_types_follow_context() {
        let extractor = PatternExtractor::new();
        let rels = extractor.extract_relationships("Pickle Brine uses Garlic. It tastes great.");
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].rel_type, "TASTES_WITH");

        let rels = extractor
            .extract_relationships("Cold Water Therapy develops Better Health. It restores energy.");
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].rel_type, "RESTORES");

        let rels = extractor.extract_relationships("Pickle Brine uses Garlic.");
        assert_eq!(rels[0].rel_type, "USES");
    }

    #[test]
    fn headquarters_relationship() {
        let rels = PatternExtractor::new()
            .extract_relationships("Apple Inc is headquartered in Cupertino, California.");
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].source, "Apple Inc");
        assert_eq!(rels[0].target, "Cupertino");
    }

    #[test]
    fn text_statistics() {
        let extraction = PatternExtractor::new().extract("two words");
        assert_eq!(extraction.word_count, 2);
        assert_eq!(extraction.text_length, 9);
        assert_eq!(extraction.method, EXTRACTION_METHOD);
    }

    #[test]
    fn empty_text_is_not_an_error() {
        let extraction = PatternExtractor::new().extract("");
        assert_eq!(extraction.text_length, 0);
        assert!(extraction.entities.is_empty() && extraction.facts.is_empty());
    }

    #[test]
    fn score_formula() {
        assert_eq!(score("Tim Cook", person_bonus), 0.9);
        assert_eq!(score("Acme Corp", organization_bonus), 1.0);
        assert_eq!(score("API", technology_bonus), 0.7);
        assert_eq!(score("Python", technology_bonus), 0.8);
        assert_eq!(score("ab", no_bonus), 0.3);
        assert_eq!(score("A Very Long Organization Name Of Things", no_bonus), 0.6);
    }
}
