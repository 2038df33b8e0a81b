//! Evidence module - verified snippets drawn from sources

use crate::claim::ClaimType;
use crate::ids::{EvidenceId, SourceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Maximum characters kept from an extracted snippet
pub const MAX_SNIPPET_CHARS: usize = 400;

/// How a snippet was matched against its source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMethod {
    /// Normalized snippet is a substring of the normalized text
    Exact,
    /// Best token-overlap window cleared the acceptance threshold
    Fuzzy,
}

impl VerificationMethod {
    /// Get the method name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationMethod::Exact => "exact",
            VerificationMethod::Fuzzy => "fuzzy",
        }
    }
}

/// An accepted, verified evidence card
///
/// Rejected snippets never become cards, so every card in a ledger has
/// `verified == true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceCard {
    /// Sequential id (`E1..`)
    pub id: EvidenceId,

    /// Source the snippet was taken from
    pub source_id: SourceId,

    /// Claim categories the snippet bears on
    pub claim_types: BTreeSet<ClaimType>,

    /// Quoted snippet, at most [`MAX_SNIPPET_CHARS`] characters
    pub snippet: String,

    /// Surrounding text supplied by the extractor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Reliability in [1, 5] after thin-text downweighting
    pub reliability: f64,

    /// Whether the snippet was found in the source text
    pub verified: bool,

    /// Match score in [0, 1]
    pub verification_score: f64,

    /// Exact or fuzzy match
    pub verification_method: VerificationMethod,

    /// Effective reliability `r_i` in [0, 1]
    pub weight: f64,

    /// Extractor notes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Evidence item as proposed by an extraction oracle, before verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvidence {
    /// Claim categories, as free-form labels
    #[serde(default)]
    pub claim_types: Vec<String>,

    /// Quoted snippet
    pub snippet: String,

    /// Surrounding text
    #[serde(default)]
    pub context: Option<String>,

    /// Reliability estimate in 1..=5
    #[serde(default = "default_reliability")]
    pub reliability: u8,

    /// Extractor notes
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_reliability() -> u8 {
    3
}

impl RawEvidence {
    /// Create a raw evidence item with default reliability
    pub fn new(snippet: impl Into<String>, claim_types: &[ClaimType]) -> Self {
        Self {
            claim_types: claim_types.iter().map(|t| t.as_str().to_string()).collect(),
            snippet: snippet.into(),
            context: None,
            reliability: default_reliability(),
            notes: None,
        }
    }

    /// Recognised claim types, unknown labels dropped
    pub fn parsed_claim_types(&self) -> BTreeSet<ClaimType> {
        self.claim_types
            .iter()
            .filter_map(|label| ClaimType::parse(label))
            .collect()
    }
}
