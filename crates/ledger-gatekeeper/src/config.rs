//! Gatekeeper configuration

use crate::GatekeeperError;
use ledger_domain::{SourceType, MAX_SNIPPET_CHARS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Configuration for evidence verification and source weighting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Minimum token-overlap score for a fuzzy match (0.0-1.0)
    pub acceptance_threshold: f64,

    /// Relative window size tolerance for fuzzy matching (0.2 = ±20%)
    pub window_tolerance: f64,

    /// Source texts shorter than this many characters are considered thin
    pub min_text_chars: usize,

    /// Reliability multiplier applied to cards from thin texts
    pub thin_text_factor: f64,

    /// Snippets are truncated to this many characters
    pub max_snippet_chars: usize,

    /// Per source type reliability multipliers, keyed by type name
    pub source_type_weights: BTreeMap<String, f64>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.85,
            window_tolerance: 0.2,
            min_text_chars: 1000,
            thin_text_factor: 0.5,
            max_snippet_chars: MAX_SNIPPET_CHARS,
            source_type_weights: default_source_type_weights(),
        }
    }
}

fn default_source_type_weights() -> BTreeMap<String, f64> {
    SourceType::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), default_weight(*t)))
        .collect()
}

fn default_weight(source_type: SourceType) -> f64 {
    match source_type {
        SourceType::Paper => 1.0,
        SourceType::Preprint => 0.9,
        SourceType::Report => 0.8,
        SourceType::Documentation => 0.7,
        SourceType::Blog => 0.6,
        SourceType::News => 0.6,
        SourceType::Other => 0.5,
    }
}

impl VerificationConfig {
    /// Create a lenient configuration (looser matching, milder thin-text penalty)
    pub fn lenient() -> Self {
        Self {
            acceptance_threshold: 0.75,
            window_tolerance: 0.3,
            min_text_chars: 500,
            thin_text_factor: 0.75,
            ..Self::default()
        }
    }

    /// Create a strict configuration (tighter matching, harsher thin-text penalty)
    pub fn strict() -> Self {
        Self {
            acceptance_threshold: 0.92,
            window_tolerance: 0.1,
            min_text_chars: 1500,
            thin_text_factor: 0.4,
            ..Self::default()
        }
    }

    /// Reliability multiplier for a source type
    ///
    /// Falls back to the built-in default when the map has no entry.
    pub fn weight_for(&self, source_type: SourceType) -> f64 {
        self.source_type_weights
            .get(source_type.as_str())
            .copied()
            .unwrap_or_else(|| default_weight(source_type))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), GatekeeperError> {
        if !(0.0..=1.0).contains(&self.acceptance_threshold) {
            return Err(GatekeeperError::Config(format!(
                "acceptance_threshold must be in [0.0, 1.0], got {}",
                self.acceptance_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.window_tolerance) {
            return Err(GatekeeperError::Config(format!(
                "window_tolerance must be in [0.0, 1.0), got {}",
                self.window_tolerance
            )));
        }
        if !(0.0..=1.0).contains(&self.thin_text_factor) {
            return Err(GatekeeperError::Config(format!(
                "thin_text_factor must be in [0.0, 1.0], got {}",
                self.thin_text_factor
            )));
        }
        if !(1..=MAX_SNIPPET_CHARS).contains(&self.max_snippet_chars) {
            return Err(GatekeeperError::Config(format!(
                "max_snippet_chars must be in [1, {}], got {}",
                MAX_SNIPPET_CHARS, self.max_snippet_chars
            )));
        }
        for (name, weight) in &self.source_type_weights {
            if SourceType::parse(name).is_none() {
                return Err(GatekeeperError::Config(format!(
                    "unknown source type '{}' in source_type_weights",
                    name
                )));
            }
            if !(0.0..=1.0).contains(weight) {
                return Err(GatekeeperError::Config(format!(
                    "weight for '{}' must be in [0.0, 1.0], got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}
