//! Ledger module - the immutable record of one research run
//!
//! The ledger is the single source of truth from which the report and graph
//! exports are derived. [`Ledger::validate`] checks the invariants
//! that must hold after assembly:
//!
//! - every evidence card cites an existing source
//! - every claim has non-empty support made of existing, accepted evidence
//! - card reliability is in [1, 5], verification score in [0, 1], and the
//!   snippet at most [`MAX_SNIPPET_CHARS`] characters
//! - claim confidence is in 1..=5
//! - every edge joins existing claims and is never `unrelated`
//! - every resolution group has at least two members and no claim sits in two groups
//! - ids are unique within their collection

use crate::claim::Claim;
use crate::evidence::{EvidenceCard, MAX_SNIPPET_CHARS};
use crate::ids::{ClaimId, EvidenceId, ResolutionId, RunId, SourceId};
use crate::relationship::{Edge, Relation};
use crate::resolution::ResolutionGroup;
use crate::source::Source;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use thiserror::Error;

/// Version string written into every ledger
pub const LEDGER_VERSION: &str = "0.1";

/// Run-level quality metrics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Fraction of claims with non-empty evidence support
    pub supported_claim_rate: f64,
    /// Claim count per claim type
    pub claim_type_coverage: BTreeMap<String, usize>,
    /// Contradiction edges per evaluated pair
    pub contradiction_density: f64,
    /// Fraction of claims with raw score below 0.4
    pub weak_evidence_rate: f64,
    /// Claim count per confidence rating
    pub confidence_distribution: BTreeMap<u8, usize>,
    /// Mean raw score
    pub avg_raw_score: f64,
    /// Expected calibration error against the proxy label
    pub ece: f64,
    /// Brier score against the proxy label
    pub brier: f64,
    /// Description of the proxy label used for ECE and Brier
    pub calibration_label: String,
    /// Number of sources
    pub source_count: usize,
    /// Number of accepted evidence cards
    pub evidence_count: usize,
    /// Number of rejected snippets
    pub rejected_evidence: usize,
    /// Number of claim pairs sent to the relation oracle
    pub evaluated_pairs: usize,
    /// Number of oracle calls that failed after retries
    pub oracle_failures: usize,
    /// Number of resolution groups
    pub resolution_count: usize,
}

/// The structured record of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Run identifier
    pub run_id: RunId,
    /// Research prompt
    pub prompt: String,
    /// Opaque research plan
    #[serde(default)]
    pub plan: serde_json::Value,
    /// Canonical sources
    pub sources: Vec<Source>,
    /// Accepted evidence cards
    pub evidence: Vec<EvidenceCard>,
    /// Canonical claims
    pub claims: Vec<Claim>,
    /// Persisted edges (never `unrelated`)
    pub edges: Vec<Edge>,
    /// Contradiction groups
    pub resolutions: Vec<ResolutionGroup>,
    /// Run metrics
    pub metrics: RunMetrics,
    /// RFC 3339 assembly timestamp
    pub created_at: String,
    /// Ledger format version
    pub version: String,
}

/// A broken ledger invariant
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvariantViolation {
    /// Two records in one collection share an id
    #[error("duplicate {collection} id {id}")]
    DuplicateId {
        /// Collection name
        collection: &'static str,
        /// Offending id
        id: String,
    },

    /// Evidence card cites a source that does not exist
    #[error("evidence {evidence_id} references unknown source {source_id}")]
    UnknownSource {
        /// Card id
        evidence_id: EvidenceId,
        /// Missing source id
        source_id: SourceId,
    },

    /// Claim has no supporting evidence
    #[error("claim {0} has no supporting evidence")]
    EmptySupport(ClaimId),

    /// Claim cites evidence that does not exist
    #[error("claim {claim_id} references unknown evidence {evidence_id}")]
    UnknownEvidence {
        /// Claim id
        claim_id: ClaimId,
        /// Missing evidence id
        evidence_id: EvidenceId,
    },

    /// Claim cites a card that never passed verification
    #[error("claim {claim_id} cites unverified evidence {evidence_id}")]
    UnverifiedEvidence {
        /// Claim id
        claim_id: ClaimId,
        /// Unverified card id
        evidence_id: EvidenceId,
    },

    /// Card reliability outside [1, 5]
    #[error("evidence {evidence_id} has reliability {reliability} outside [1, 5]")]
    ReliabilityOutOfRange {
        /// Card id
        evidence_id: EvidenceId,
        /// Offending value
        reliability: f64,
    },

    /// Card verification score outside [0, 1]
    #[error("evidence {evidence_id} has verification score {score} outside [0, 1]")]
    VerificationScoreOutOfRange {
        /// Card id
        evidence_id: EvidenceId,
        /// Offending value
        score: f64,
    },

    /// Card snippet longer than [`MAX_SNIPPET_CHARS`]
    #[error("evidence {evidence_id} snippet has {chars} characters")]
    SnippetTooLong {
        /// Card id
        evidence_id: EvidenceId,
        /// Snippet length in characters
        chars: usize,
    },

    /// Claim confidence outside 1..=5
    #[error("claim {claim_id} has confidence {confidence} outside 1..=5")]
    ConfidenceOutOfRange {
        /// Claim id
        claim_id: ClaimId,
        /// Offending value
        confidence: u8,
    },

    /// Edge endpoint does not exist
    #[error("edge {edge} references unknown claim {claim_id}")]
    UnknownEdgeClaim {
        /// Edge key
        edge: String,
        /// Missing claim id
        claim_id: ClaimId,
    },

    /// An `unrelated` edge was persisted
    #[error("edge {0} is unrelated and must not be persisted")]
    UnrelatedEdge(String),

    /// Group with fewer than two members
    #[error("resolution {0} has fewer than two members")]
    UndersizedGroup(ResolutionId),

    /// Group member does not exist
    #[error("resolution {group_id} references unknown claim {claim_id}")]
    UnknownGroupClaim {
        /// Group id
        group_id: ResolutionId,
        /// Missing claim id
        claim_id: ClaimId,
    },

    /// Claim appears in more than one group
    #[error("claim {0} appears in more than one resolution group")]
    ClaimInMultipleGroups(ClaimId),

    /// Two same-type claims are similar enough to have been merged
    ///
    /// Not produced by [`Ledger::validate`], which has no similarity measure;
    /// the pipeline reports it after canonicalization.
    #[error("claims {first} and {second} are near-duplicates")]
    NearDuplicateClaims {
        /// Earlier claim
        first: ClaimId,
        /// Later claim
        second: ClaimId,
    },
}

impl Ledger {
    /// Look up a source by id
    pub fn source(&self, id: &SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| &s.id == id)
    }

    /// Look up an evidence card by id
    pub fn evidence_card(&self, id: &EvidenceId) -> Option<&EvidenceCard> {
        self.evidence.iter().find(|e| &e.id == id)
    }

    /// Look up a claim by id
    pub fn claim(&self, id: &ClaimId) -> Option<&Claim> {
        self.claims.iter().find(|c| &c.id == id)
    }

    /// Resolution group containing `id`, if any
    pub fn group_of(&self, id: &ClaimId) -> Option<&ResolutionGroup> {
        self.resolutions.iter().find(|g| g.contains(id))
    }

    /// Check every referential invariant, collecting all violations
    pub fn validate(&self) -> Result<(), Vec<InvariantViolation>> {
        let mut violations = Vec::new();

        let source_ids = unique_ids(
            "source",
            self.sources.iter().map(|s| s.id.as_str()),
            &mut violations,
        );
        let evidence_ids = unique_ids(
            "evidence",
            self.evidence.iter().map(|e| e.id.as_str()),
            &mut violations,
        );
        let claim_ids = unique_ids(
            "claim",
            self.claims.iter().map(|c| c.id.as_str()),
            &mut violations,
        );
        unique_ids(
            "resolution",
            self.resolutions.iter().map(|r| r.id.as_str()),
            &mut violations,
        );

        for card in &self.evidence {
            if !source_ids.contains(card.source_id.as_str()) {
                violations.push(InvariantViolation::UnknownSource {
                    evidence_id: card.id.clone(),
                    source_id: card.source_id.clone(),
                });
            }
            if !(1.0..=5.0).contains(&card.reliability) {
                violations.push(InvariantViolation::ReliabilityOutOfRange {
                    evidence_id: card.id.clone(),
                    reliability: card.reliability,
                });
            }
            if !(0.0..=1.0).contains(&card.verification_score) {
                violations.push(InvariantViolation::VerificationScoreOutOfRange {
                    evidence_id: card.id.clone(),
                    score: card.verification_score,
                });
            }
            let chars = card.snippet.chars().count();
            if chars > MAX_SNIPPET_CHARS {
                violations.push(InvariantViolation::SnippetTooLong {
                    evidence_id: card.id.clone(),
                    chars,
                });
            }
        }

        let verified: HashMap<&str, bool> = self
            .evidence
            .iter()
            .map(|e| (e.id.as_str(), e.verified))
            .collect();

        for claim in &self.claims {
            if !(1..=5).contains(&claim.confidence) {
                violations.push(InvariantViolation::ConfidenceOutOfRange {
                    claim_id: claim.id.clone(),
                    confidence: claim.confidence,
                });
            }
            if claim.supported_by.is_empty() {
                violations.push(InvariantViolation::EmptySupport(claim.id.clone()));
            }
            for evidence_id in &claim.supported_by {
                match verified.get(evidence_id.as_str()) {
                    None => violations.push(InvariantViolation::UnknownEvidence {
                        claim_id: claim.id.clone(),
                        evidence_id: evidence_id.clone(),
                    }),
                    Some(false) => violations.push(InvariantViolation::UnverifiedEvidence {
                        claim_id: claim.id.clone(),
                        evidence_id: evidence_id.clone(),
                    }),
                    Some(true) => {}
                }
            }
        }

        for edge in &self.edges {
            if edge.relation == Relation::Unrelated {
                violations.push(InvariantViolation::UnrelatedEdge(edge.key()));
            }
            for endpoint in [&edge.src_claim_id, &edge.dst_claim_id] {
                if !claim_ids.contains(endpoint.as_str()) {
                    violations.push(InvariantViolation::UnknownEdgeClaim {
                        edge: edge.key(),
                        claim_id: endpoint.clone(),
                    });
                }
            }
        }

        let mut membership: HashMap<&str, usize> = HashMap::new();
        for group in &self.resolutions {
            if group.member_claim_ids.len() < 2 {
                violations.push(InvariantViolation::UndersizedGroup(group.id.clone()));
            }
            for member in &group.member_claim_ids {
                if !claim_ids.contains(member.as_str()) {
                    violations.push(InvariantViolation::UnknownGroupClaim {
                        group_id: group.id.clone(),
                        claim_id: member.clone(),
                    });
                }
                let count = membership.entry(member.as_str()).or_insert(0);
                *count += 1;
                if *count == 2 {
                    violations.push(InvariantViolation::ClaimInMultipleGroups(member.clone()));
                }
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

fn unique_ids<'a>(
    collection: &'static str,
    ids: impl Iterator<Item = &'a str>,
    violations: &mut Vec<InvariantViolation>,
) -> HashSet<&'a str> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            violations.push(InvariantViolation::DuplicateId {
                collection,
                id: id.to_string(),
            });
        }
    }
    seen
}
