//! Context-free statement similarity
//!
//! Term-frequency vectors over lower-cased alphanumeric tokens with English
//! stop words removed, compared by cosine. A vector depends only on its own
//! statement, so scores never shift with the rest of the run.

use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "in", "into", "is", "it", "its", "itself", "just", "me",
    "more", "most", "my", "myself", "nor", "of", "off", "on", "once", "or", "other", "our",
    "ours", "ourselves", "out", "over", "own", "same", "she", "should", "so", "some", "such",
    "than", "that", "the", "their", "theirs", "them", "themselves", "then", "there", "these",
    "they", "this", "those", "through", "to", "too", "under", "until", "up", "very", "was", "we",
    "were", "what", "which", "while", "who", "whom", "why", "will", "with", "would", "you",
    "your", "yours", "yourself", "yourselves",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

/// Content tokens of a statement
pub fn content_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .filter(|t| !stop_words().contains(t.as_str()))
        .collect()
}

/// Sparse term-frequency vector
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermVector {
    counts: BTreeMap<String, f64>,
    norm: f64,
}

impl TermVector {
    /// Build the vector for one statement
    pub fn from_text(text: &str) -> Self {
        let mut counts: BTreeMap<String, f64> = BTreeMap::new();
        for token in content_tokens(text) {
            *counts.entry(token).or_insert(0.0) += 1.0;
        }
        let norm = counts.values().map(|c| c * c).sum::<f64>().sqrt();
        Self { counts, norm }
    }

    /// Whether the statement had no content tokens
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Cosine similarity in [0, 1]; an empty vector is similar to nothing
    pub fn cosine(&self, other: &TermVector) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }
        let (small, large) = if self.counts.len() <= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        let dot: f64 = small
            .counts
            .iter()
            .filter_map(|(term, a)| large.counts.get(term).map(|b| a * b))
            .sum();
        (dot / (self.norm * other.norm)).clamp(0.0, 1.0)
    }
}

/// Cosine similarity of two statements
pub fn statement_similarity(a: &str, b: &str) -> f64 {
    TermVector::from_text(a).cosine(&TermVector::from_text(b))
}
