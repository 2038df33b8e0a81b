//! Resolution groups - connected components of contradicting claims

use crate::ids::{ClaimId, ResolutionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a contradiction group has been summarized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    /// No summary available
    #[default]
    Open,
    /// A summary oracle described the disagreement
    Noted,
}

impl ResolutionStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Open => "open",
            ResolutionStatus::Noted => "noted",
        }
    }
}

/// A group of two or more claims linked by `contradicts` edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionGroup {
    /// Sequential id (`R1..`)
    pub id: ResolutionId,

    /// Members, sorted by id
    pub member_claim_ids: Vec<ClaimId>,

    /// `"src->dst"` keys of the contradiction edges inside the group
    #[serde(default)]
    pub edge_keys: Vec<String>,

    /// Open or noted
    pub status: ResolutionStatus,

    /// Summary of the disagreement
    pub summary: Option<String>,

    /// Conditions under which each side holds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<String>,

    /// Member the evidence leans toward
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaning_claim_id: Option<ClaimId>,

    /// Sum of member evidence weights per claim
    #[serde(default)]
    pub weight_by_claim: BTreeMap<ClaimId, f64>,
}

impl ResolutionGroup {
    /// Create an open group without summary
    pub fn open(id: ResolutionId, member_claim_ids: Vec<ClaimId>, edge_keys: Vec<String>) -> Self {
        Self {
            id,
            member_claim_ids,
            edge_keys,
            status: ResolutionStatus::Open,
            summary: None,
            conditions: None,
            leaning_claim_id: None,
            weight_by_claim: BTreeMap::new(),
        }
    }

    /// Whether `id` is a member of this group
    pub fn contains(&self, id: &ClaimId) -> bool {
        self.member_claim_ids.contains(id)
    }
}
