//! Trait definitions for external collaborators
//!
//! The pipeline never talks to a language model directly. Extraction, pairwise
//! relation labelling and contradiction summaries are capabilities injected
//! behind these narrow, synchronous traits; async callers drive them through
//! `spawn_blocking`. Infrastructure implementations live in other crates
//! (`ledger-llm` for model-backed oracles, `ledger-pipeline` for offline ones).

use crate::claim::{CandidateClaim, ClaimType, Polarity};
use crate::evidence::{EvidenceCard, RawEvidence};
use crate::ids::{ClaimId, EvidenceId, ResolutionId};
use crate::relationship::Relation;
use crate::source::Source;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (ledger-llm)
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Generate text completion
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Generate with structured output (if supported)
    fn generate_structured(&self, prompt: &str, schema: &str) -> Result<String, Self::Error>;
}

/// Snippet shown to an oracle alongside a claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSnippet {
    /// Evidence id
    pub id: EvidenceId,
    /// Snippet text
    pub snippet: String,
}

/// Claim as presented to relation and summary oracles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimView {
    /// Claim id
    pub id: ClaimId,
    /// Category
    pub claim_type: ClaimType,
    /// Statement text
    pub statement: String,
    /// Stance
    pub polarity: Polarity,
    /// Supporting snippets
    pub evidence: Vec<EvidenceSnippet>,
}

impl ClaimView {
    /// Whether `id` is one of this claim's evidence ids
    pub fn cites(&self, id: &EvidenceId) -> bool {
        self.evidence.iter().any(|e| &e.id == id)
    }
}

/// One pair of claims to label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRequest {
    /// First claim (becomes the edge source)
    pub first: ClaimView,
    /// Second claim (becomes the edge target)
    pub second: ClaimView,
}

/// A relation oracle's label for a pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationAnswer {
    /// Relation label
    pub relation: Relation,
    /// Explanation
    #[serde(default)]
    pub rationale: Option<String>,
    /// Cited evidence, which must belong to one of the two claims
    #[serde(default)]
    pub evidence_ids: Vec<EvidenceId>,
}

impl RelationAnswer {
    /// An `unrelated` answer with no rationale
    pub fn unrelated() -> Self {
        Self {
            relation: Relation::Unrelated,
            rationale: None,
            evidence_ids: Vec::new(),
        }
    }
}

/// Trait for labelling the relation between two claims
pub trait RelationOracle {
    /// Error type for relation calls
    type Error: std::fmt::Display;

    /// Label one pair of claims
    fn relate(&self, request: &RelationRequest) -> Result<RelationAnswer, Self::Error>;
}

/// A contradiction group to summarize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRequest {
    /// Group id
    pub group_id: ResolutionId,
    /// Member claims
    pub claims: Vec<ClaimView>,
    /// Rationales of the group's contradiction edges
    pub rationales: Vec<String>,
    /// Summed evidence weight per member
    pub weight_by_claim: BTreeMap<ClaimId, f64>,
}

/// A summary oracle's description of a disagreement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryAnswer {
    /// What the disagreement is about
    pub summary: String,
    /// Conditions under which each side holds
    #[serde(default)]
    pub conditions: Option<String>,
    /// Member the evidence leans toward
    #[serde(default)]
    pub leaning_claim_id: Option<ClaimId>,
}

/// Trait for summarizing a contradiction group
pub trait SummaryOracle {
    /// Error type for summary calls
    type Error: std::fmt::Display;

    /// Summarize one group
    fn summarize(&self, request: &SummaryRequest) -> Result<SummaryAnswer, Self::Error>;
}

/// Source text handed to an extraction oracle
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    /// Research prompt
    pub prompt: String,
    /// Canonical source
    pub source: Source,
    /// Extracted page text
    pub text: String,
}

/// Trait for extracting evidence and proposing claims
pub trait ExtractionOracle {
    /// Error type for extraction calls
    type Error: std::fmt::Display;

    /// Extract candidate evidence snippets from one source
    fn extract_evidence(&self, request: &ExtractionRequest)
        -> Result<Vec<RawEvidence>, Self::Error>;

    /// Propose candidate claims over the accepted evidence
    fn propose_claims(
        &self,
        prompt: &str,
        evidence: &[EvidenceCard],
    ) -> Result<Vec<CandidateClaim>, Self::Error>;
}
