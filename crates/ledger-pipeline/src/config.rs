//! Configuration for the pipeline

use crate::PipelineError;
use ledger_gatekeeper::VerificationConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scoring weights and the diversity cap
///
/// A weight left unset shares whatever the set weights leave of 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight of evidence strength
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_evidence: Option<f64>,

    /// Weight of source diversity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_diversity: Option<f64>,

    /// Weight of the verified-card ratio
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_verification: Option<f64>,

    /// Weight of the contradiction penalty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w_contradiction: Option<f64>,

    /// Distinct sources needed for full diversity
    pub diversity_cap: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            w_evidence: None,
            w_diversity: None,
            w_verification: None,
            w_contradiction: None,
            diversity_cap: 3,
        }
    }
}

/// Resolved, non-negative scoring weights
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    /// Evidence strength weight
    pub evidence: f64,
    /// Diversity weight
    pub diversity: f64,
    /// Verification ratio weight
    pub verification: f64,
    /// Contradiction penalty weight
    pub contradiction: f64,
}

impl ScoringConfig {
    /// Resolve configured weights, splitting the remainder among unset ones
    pub fn weights(&self) -> ScoringWeights {
        let slots = [
            self.w_evidence,
            self.w_diversity,
            self.w_verification,
            self.w_contradiction,
        ];
        let specified: f64 = slots.iter().flatten().sum();
        let unset = slots.iter().filter(|w| w.is_none()).count();
        let share = if unset == 0 {
            0.0
        } else {
            (1.0 - specified).max(0.0) / unset as f64
        };
        let resolve = |w: Option<f64>| w.unwrap_or(share);

        ScoringWeights {
            evidence: resolve(self.w_evidence),
            diversity: resolve(self.w_diversity),
            verification: resolve(self.w_verification),
            contradiction: resolve(self.w_contradiction),
        }
    }

    fn validate(&self) -> Result<(), String> {
        let named = [
            ("w_evidence", self.w_evidence),
            ("w_diversity", self.w_diversity),
            ("w_verification", self.w_verification),
            ("w_contradiction", self.w_contradiction),
        ];
        for (name, weight) in named {
            if let Some(w) = weight {
                if !w.is_finite() || w < 0.0 {
                    return Err(format!("scoring.{} must be a non-negative number", name));
                }
            }
        }
        if self.diversity_cap == 0 {
            return Err("scoring.diversity_cap must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Configuration for a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Cosine similarity at which same-type claims merge (0.0-1.0]
    pub merge_threshold: f64,

    /// Above this many claims only same-type pairs are compared
    pub contradiction_pair_cap: usize,

    /// Maximum time for a single oracle call (seconds)
    pub oracle_timeout_secs: u64,

    /// Extra attempts after a failed oracle call
    pub oracle_max_retries: u32,

    /// Oracle calls in flight at once
    pub oracle_concurrency: usize,

    /// Ask the summary oracle to describe each contradiction group
    pub summarize_resolutions: bool,

    /// Confidence scoring
    pub scoring: ScoringConfig,

    /// Evidence verification and source weighting
    pub verification: VerificationConfig,
}

impl Default for PipelineConfig {
    /// Default configuration with balanced settings
    fn default() -> Self {
        Self {
            merge_threshold: 0.8,
            contradiction_pair_cap: 12,
            oracle_timeout_secs: 30,
            oracle_max_retries: 2,
            oracle_concurrency: 4,
            summarize_resolutions: true,
            scoring: ScoringConfig::default(),
            verification: VerificationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Strict preset: tighter verification, eager merging, heavier contradiction penalty
    pub fn strict() -> Self {
        Self {
            merge_threshold: 0.75,
            contradiction_pair_cap: 8,
            oracle_max_retries: 1,
            scoring: ScoringConfig {
                w_contradiction: Some(0.35),
                ..ScoringConfig::default()
            },
            verification: VerificationConfig::strict(),
            ..Self::default()
        }
    }

    /// Lenient preset: looser verification, conservative merging, more patience with oracles
    pub fn lenient() -> Self {
        Self {
            merge_threshold: 0.9,
            contradiction_pair_cap: 20,
            oracle_timeout_secs: 60,
            oracle_max_retries: 3,
            scoring: ScoringConfig {
                w_contradiction: Some(0.1),
                ..ScoringConfig::default()
            },
            verification: VerificationConfig::lenient(),
            ..Self::default()
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "default" => Some(Self::default()),
            "strict" => Some(Self::strict()),
            "lenient" => Some(Self::lenient()),
            _ => None,
        }
    }

    /// Get the oracle timeout as a Duration
    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !(self.merge_threshold > 0.0 && self.merge_threshold <= 1.0) {
            return Err(PipelineError::Config(
                "merge_threshold must be in (0.0, 1.0]".to_string(),
            ));
        }
        if self.oracle_timeout_secs == 0 {
            return Err(PipelineError::Config(
                "oracle_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.oracle_concurrency == 0 {
            return Err(PipelineError::Config(
                "oracle_concurrency must be greater than 0".to_string(),
            ));
        }
        self.scoring.validate().map_err(PipelineError::Config)?;
        self.verification.validate()?;
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, PipelineError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, PipelineError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.merge_threshold, 0.8);
        assert_eq!(config.contradiction_pair_cap, 12);
        assert_eq!(config.oracle_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(PipelineConfig::strict().validate().is_ok());
        assert!(PipelineConfig::lenient().validate().is_ok());
        assert_eq!(PipelineConfig::preset("Strict"), Some(PipelineConfig::strict()));
        assert!(PipelineConfig::preset("reckless").is_none());
    }

    #[test]
    fn test_all_unset_weights_split_evenly() {
        let weights = ScoringConfig::default().weights();
        assert_eq!(weights.evidence, 0.25);
        assert_eq!(weights.diversity, 0.25);
        assert_eq!(weights.verification, 0.25);
        assert_eq!(weights.contradiction, 0.25);
    }

    #[test]
    fn test_unset_weights_share_remainder() {
        let scoring = ScoringConfig {
            w_evidence: Some(0.4),
            w_contradiction: Some(0.2),
            ..ScoringConfig::default()
        };
        let weights = scoring.weights();
        assert_eq!(weights.evidence, 0.4);
        assert!((weights.diversity - 0.2).abs() < 1e-12);
        assert!((weights.verification - 0.2).abs() < 1e-12);
        assert_eq!(weights.contradiction, 0.2);
    }

    #[test]
    fn test_overspent_weights_leave_nothing() {
        let scoring = ScoringConfig {
            w_evidence: Some(0.9),
            w_diversity: Some(0.5),
            ..ScoringConfig::default()
        };
        let weights = scoring.weights();
        assert_eq!(weights.verification, 0.0);
        assert_eq!(weights.contradiction, 0.0);
    }

    #[test]
    fn test_validation_rejects_out_of_range() {
        let mut config = PipelineConfig::default();
        config.merge_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.oracle_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.scoring.w_diversity = Some(-0.1);
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));

        let mut config = PipelineConfig::default();
        config.verification.acceptance_threshold = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = PipelineConfig::strict();
        let toml_str = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
merge_threshold = 0.85

[scoring]
w_evidence = 0.5
"#,
        )
        .unwrap();
        assert_eq!(config.merge_threshold, 0.85);
        assert_eq!(config.scoring.w_evidence, Some(0.5));
        assert_eq!(config.scoring.diversity_cap, 3);
        assert_eq!(config.oracle_max_retries, 2);
        assert_eq!(config.verification, VerificationConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(matches!(
            PipelineConfig::from_toml("merge_threshold = \"high\""),
            Err(PipelineError::Toml(_))
        ));
        assert!(matches!(
            PipelineConfig::from_toml("merge_threshold = 2.0"),
            Err(PipelineError::Config(_))
        ));
    }
}
