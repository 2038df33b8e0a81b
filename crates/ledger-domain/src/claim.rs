//! Claim module - canonical claims and their scoring components
//!
//! A claim is a research statement backed by verified evidence cards. Claims
//! are created by canonicalization (near-duplicate merge) and afterwards only
//! the scorer touches them, filling in `confidence`, `raw_score`, `components`
//! and `needs_more_evidence`.

use crate::ids::{ClaimId, EvidenceId};
use serde::{Deserialize, Serialize};

/// Category a claim belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    /// Quality, provenance and representativeness of data
    DataQuality,
    /// Bias and fairness concerns
    Bias,
    /// Evaluation methodology and benchmark results
    Evaluation,
    /// Privacy, leakage and security
    PrivacySecurity,
    /// Operational and deployment risk
    OpsRisk,
}

impl ClaimType {
    /// Every claim type, in report order
    pub const ALL: [ClaimType; 5] = [
        ClaimType::DataQuality,
        ClaimType::Bias,
        ClaimType::Evaluation,
        ClaimType::PrivacySecurity,
        ClaimType::OpsRisk,
    ];

    /// Get the claim type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::DataQuality => "data_quality",
            ClaimType::Bias => "bias",
            ClaimType::Evaluation => "evaluation",
            ClaimType::PrivacySecurity => "privacy_security",
            ClaimType::OpsRisk => "ops_risk",
        }
    }

    /// Human-readable label used in reports
    pub fn label(&self) -> &'static str {
        match self {
            ClaimType::DataQuality => "Data quality",
            ClaimType::Bias => "Bias",
            ClaimType::Evaluation => "Evaluation",
            ClaimType::PrivacySecurity => "Privacy & security",
            ClaimType::OpsRisk => "Operational risk",
        }
    }

    /// Parse a claim type from a string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "data_quality" => Some(ClaimType::DataQuality),
            "bias" => Some(ClaimType::Bias),
            "evaluation" => Some(ClaimType::Evaluation),
            "privacy_security" => Some(ClaimType::PrivacySecurity),
            "ops_risk" => Some(ClaimType::OpsRisk),
            _ => None,
        }
    }
}

impl std::str::FromStr for ClaimType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid claim type: {}", s))
    }
}

impl std::fmt::Display for ClaimType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stance a claim takes on the research question
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Argues in favour
    Pro,
    /// Argues against
    Con,
    /// Both directions, or merged members disagreed
    Mixed,
    /// No stance
    #[default]
    Neutral,
}

impl Polarity {
    /// Get the polarity name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Polarity::Pro => "pro",
            Polarity::Con => "con",
            Polarity::Mixed => "mixed",
            Polarity::Neutral => "neutral",
        }
    }

    /// Normalize a free-form polarity label
    ///
    /// Unknown labels map to [`Polarity::Neutral`], never an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use ledger_domain::Polarity;
    ///
    /// assert_eq!(Polarity::normalize("Positive"), Polarity::Pro);
    /// assert_eq!(Polarity::normalize("neg"), Polarity::Con);
    /// assert_eq!(Polarity::normalize("both"), Polarity::Mixed);
    /// assert_eq!(Polarity::normalize("sideways"), Polarity::Neutral);
    /// ```
    pub fn normalize(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "pro" | "positive" | "pos" | "support" | "supports" => Polarity::Pro,
            "con" | "negative" | "neg" | "against" => Polarity::Con,
            "mixed" | "both" => Polarity::Mixed,
            _ => Polarity::Neutral,
        }
    }

    /// Whether two polarities take opposite pro/con stances
    pub fn opposes(&self, other: Polarity) -> bool {
        matches!(
            (self, other),
            (Polarity::Pro, Polarity::Con) | (Polarity::Con, Polarity::Pro)
        )
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpretable sub-scores behind a claim's raw score
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreComponents {
    /// Noisy-OR of the supporting cards' effective reliability
    pub evidence_strength: f64,
    /// Distinct source count relative to the diversity cap
    pub diversity: f64,
    /// Fraction of supporting cards that were verified
    pub verification_ratio: f64,
    /// Penalty from membership in a contradiction group
    pub contradiction_penalty: f64,
}

/// A canonical claim in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Stable id (`C1..`), kept from the merge representative
    pub id: ClaimId,

    /// Category
    pub claim_type: ClaimType,

    /// The statement text
    pub statement: String,

    /// Stance
    pub polarity: Polarity,

    /// Supporting evidence ids, ordered and de-duplicated
    pub supported_by: Vec<EvidenceId>,

    /// Calibrated rating in 1..=5
    pub confidence: u8,

    /// Combined score before calibration
    #[serde(default)]
    pub raw_score: f64,

    /// Sub-scores, present once the claim has been scored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<ScoreComponents>,

    /// Statements of merged-away near-duplicates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    /// Whether the claim is weakly supported or contested
    #[serde(default)]
    pub needs_more_evidence: bool,
}

impl Claim {
    /// Create an unscored claim
    ///
    /// The confidence is clamped into 1..=5.
    pub fn new(
        id: ClaimId,
        claim_type: ClaimType,
        statement: impl Into<String>,
        polarity: Polarity,
        supported_by: Vec<EvidenceId>,
        confidence: u8,
    ) -> Self {
        Self {
            id,
            claim_type,
            statement: statement.into(),
            polarity,
            supported_by,
            confidence: confidence.clamp(1, 5),
            raw_score: 0.0,
            components: None,
            aliases: Vec::new(),
            needs_more_evidence: false,
        }
    }
}

/// Claim as proposed by an extraction oracle, before canonicalization
///
/// Polarity and claim type arrive as free-form labels and are normalized by
/// the pipeline when candidates receive ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateClaim {
    /// Claim category label
    pub claim_type: String,

    /// Statement text
    pub statement: String,

    /// Free-form polarity label
    #[serde(default)]
    pub polarity: String,

    /// Cited evidence ids
    #[serde(default)]
    pub supported_by: Vec<EvidenceId>,

    /// Self-reported confidence in 1..=5
    #[serde(default = "default_confidence")]
    pub confidence: u8,
}

fn default_confidence() -> u8 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_type_parse() {
        for claim_type in ClaimType::ALL {
            assert_eq!(ClaimType::parse(claim_type.as_str()), Some(claim_type));
        }
        assert_eq!(ClaimType::parse("Ops-Risk"), Some(ClaimType::OpsRisk));
        assert_eq!(
            "privacy security".parse::<ClaimType>(),
            Ok(ClaimType::PrivacySecurity)
        );
        assert!(ClaimType::parse("marketing").is_none());
    }

    #[test]
    fn test_polarity_normalize() {
        assert_eq!(Polarity::normalize("pro"), Polarity::Pro);
        assert_eq!(Polarity::normalize(" POS "), Polarity::Pro);
        assert_eq!(Polarity::normalize("negative"), Polarity::Con);
        assert_eq!(Polarity::normalize("Mixed"), Polarity::Mixed);
        assert_eq!(Polarity::normalize(""), Polarity::Neutral);
    }

    #[test]
    fn test_polarity_opposes() {
        assert!(Polarity::Pro.opposes(Polarity::Con));
        assert!(Polarity::Con.opposes(Polarity::Pro));
        assert!(!Polarity::Pro.opposes(Polarity::Mixed));
        assert!(!Polarity::Neutral.opposes(Polarity::Neutral));
    }

    #[test]
    fn test_claim_new_clamps_confidence() {
        let claim = Claim::new(
            ClaimId::nth(1),
            ClaimType::Bias,
            "Labels skew toward majority dialects",
            Polarity::Con,
            vec![EvidenceId::nth(1)],
            9,
        );
        assert_eq!(claim.confidence, 5);

        let claim = Claim::new(
            ClaimId::nth(2),
            ClaimType::Bias,
            "x",
            Polarity::Con,
            vec![],
            0,
        );
        assert_eq!(claim.confidence, 1);
    }

    #[test]
    fn test_claim_serialization_shape() {
        let claim = Claim::new(
            ClaimId::nth(1),
            ClaimType::DataQuality,
            "Synthetic data improves generalization",
            Polarity::Pro,
            vec![EvidenceId::nth(1), EvidenceId::nth(3)],
            3,
        );
        let value = serde_json::to_value(&claim).unwrap();
        assert_eq!(value["claim_type"], "data_quality");
        assert_eq!(value["polarity"], "pro");
        assert_eq!(value["supported_by"][1], "E3");
        assert!(value.get("components").is_none());
        assert!(value.get("aliases").is_none());
    }
}
