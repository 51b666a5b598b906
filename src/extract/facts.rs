//! Fact sentence extraction.
//!
//! A fact is a sentence of more than [`MIN_FACT_CHARS`] characters containing
//! a factual indicator (a form of *be*/*have*, or verbs such as *develops*,
//! *headquartered*, *located*). At most [`MAX_FACTS`] are returned, in
//! sentence order.

use super::patterns::{RE_FACT_INDICATOR, RE_SENTENCE_END};

/// Upper bound on returned facts.
pub const MAX_FACTS: usize = 20;

/// Sentences must be longer than this many characters.
pub const MIN_FACT_CHARS: usize = 10;

/// Split text on runs of `.`, `!` and `?`, trimming each piece and dropping empties.
pub fn split_sentences(text: &str) -> Vec<&str> {
    RE_SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extract factual sentences from `text`.
pub fn extract_facts(text: &str) -> Vec<String> {
    split_sentences(text)
        .into_iter()
        .filter(|s| s.chars().count() > MIN_FACT_CHARS && RE_FACT_INDICATOR.is_match(s))
        .take(MAX_FACTS)
        .map(str::to_string)
        .collect()
}
