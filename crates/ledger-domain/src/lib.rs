//! Evidence Ledger Domain Layer
//!
//! This crate contains the data model of a research run: the records the
//! post-generation pipeline produces and the trait interfaces through which it
//! reaches its external collaborators. It carries no I/O of its own.
//!
//! ## Key Concepts
//!
//! - **Source**: one canonical URL, typed and weighted
//! - **EvidenceCard**: a snippet verified against its source's text
//! - **Claim**: a canonical statement that cites evidence, scored and rated 1-5
//! - **Edge**: a typed pairwise relation between claims
//! - **ResolutionGroup**: a connected component of contradicting claims
//! - **Ledger**: the immutable record of a run, with invariant validation
//!
//! ## Architecture
//!
//! - Records are plain serde structs addressed by stable string ids
//! - The claim graph is an arena keyed by id plus an edge list
//! - Oracles (extraction, relation, summary) are traits implemented elsewhere

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod claim;
pub mod evidence;
pub mod ids;
pub mod ledger;
pub mod relationship;
pub mod resolution;
pub mod source;
pub mod traits;

// Re-exports for convenience
pub use claim::{CandidateClaim, Claim, ClaimType, Polarity, ScoreComponents};
pub use evidence::{EvidenceCard, RawEvidence, VerificationMethod, MAX_SNIPPET_CHARS};
pub use ids::{ClaimId, EvidenceId, ResolutionId, RunId, SourceId};
pub use ledger::{InvariantViolation, Ledger, RunMetrics, LEDGER_VERSION};
pub use relationship::{Edge, Relation};
pub use resolution::{ResolutionGroup, ResolutionStatus};
pub use source::{Source, SourceType};
pub use traits::{
    ClaimView, EvidenceSnippet, ExtractionOracle, ExtractionRequest, LlmProvider, RelationAnswer,
    RelationOracle, RelationRequest, SummaryAnswer, SummaryOracle, SummaryRequest,
};
