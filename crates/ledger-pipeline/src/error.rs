//! Error types for the pipeline

use ledger_domain::InvariantViolation;
use thiserror::Error;

/// Errors that end a run without a ledger
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No extracted snippet survived verification
    #[error("Insufficient evidence: no snippet could be verified against its source text")]
    ZeroUsableEvidence,

    /// The assembled ledger broke one or more invariants
    #[error("Ledger invariant violation: {}", join_violations(.0))]
    InvariantViolation(Vec<InvariantViolation>),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem error while reading input or writing artifacts
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON parsing or serialization error
    #[error("JSON error: {0}")]
    Json(String),

    /// TOML parsing or serialization error
    #[error("TOML error: {0}")]
    Toml(String),
}

fn join_violations(violations: &[InvariantViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for PipelineError {
    fn from(e: serde_json::Error) -> Self {
        PipelineError::Json(e.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Io(e.to_string())
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(e: toml::de::Error) -> Self {
        PipelineError::Toml(e.to_string())
    }
}

impl From<toml::ser::Error> for PipelineError {
    fn from(e: toml::ser::Error) -> Self {
        PipelineError::Toml(e.to_string())
    }
}

impl From<ledger_gatekeeper::GatekeeperError> for PipelineError {
    fn from(e: ledger_gatekeeper::GatekeeperError) -> Self {
        PipelineError::Config(e.to_string())
    }
}

impl From<Vec<InvariantViolation>> for PipelineError {
    fn from(violations: Vec<InvariantViolation>) -> Self {
        PipelineError::InvariantViolation(violations)
    }
}
