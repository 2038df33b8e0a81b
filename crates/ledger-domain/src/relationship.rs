//! Relationship module - typed pairwise edges between claims
//!
//! Only pairwise relations are modelled. An edge is created once per compared
//! pair from the relation oracle's answer and never changes afterwards.

use crate::ids::{ClaimId, EvidenceId};
use serde::{Deserialize, Serialize};

/// Label a relation oracle assigns to a pair of claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// The first claim backs the second
    Supports,

    /// The claims cannot both hold
    Contradicts,

    /// The first claim narrows the second to a condition
    Refines,

    /// No meaningful relation; never persisted as an edge
    Unrelated,
}

impl Relation {
    /// Get the relation name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Supports => "supports",
            Relation::Contradicts => "contradicts",
            Relation::Refines => "refines",
            Relation::Unrelated => "unrelated",
        }
    }

    /// Parse a relation label
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "supports" | "support" => Some(Relation::Supports),
            "contradicts" | "contradict" => Some(Relation::Contradicts),
            "refines" | "refine" => Some(Relation::Refines),
            "unrelated" | "none" => Some(Relation::Unrelated),
            _ => None,
        }
    }
}

impl std::str::FromStr for Relation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid relation: {}", s))
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed edge between two claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// First claim of the compared pair
    pub src_claim_id: ClaimId,

    /// Second claim of the compared pair
    pub dst_claim_id: ClaimId,

    /// Relation label
    pub relation: Relation,

    /// Oracle's explanation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,

    /// Evidence the oracle cited, drawn from either claim
    #[serde(default)]
    pub evidence_ids: Vec<EvidenceId>,
}

impl Edge {
    /// Create a new edge
    pub fn new(
        src_claim_id: ClaimId,
        dst_claim_id: ClaimId,
        relation: Relation,
        rationale: Option<String>,
        evidence_ids: Vec<EvidenceId>,
    ) -> Self {
        Self {
            src_claim_id,
            dst_claim_id,
            relation,
            rationale,
            evidence_ids,
        }
    }

    /// Key of the form `"C1->C2"`
    pub fn key(&self) -> String {
        format!("{}->{}", self.src_claim_id, self.dst_claim_id)
    }

    /// Whether either endpoint is `id`
    pub fn touches(&self, id: &ClaimId) -> bool {
        &self.src_claim_id == id || &self.dst_claim_id == id
    }
}
