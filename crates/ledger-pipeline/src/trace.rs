//! Run trace: the ordered record of what each stage did and what it dropped
//!
//! The trace is data, not logging. Every event is also emitted through
//! `tracing` so it shows up in logs, but `trace.json` is what a reader uses to
//! audit a run after the fact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

/// Pipeline stage that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// URL deduplication and source creation
    Sources,
    /// Evidence extraction and verification
    Evidence,
    /// Claim proposal
    Claims,
    /// Near-duplicate merging
    Canonicalize,
    /// Pairwise relation labelling
    Relations,
    /// Contradiction grouping and summaries
    Resolve,
    /// Scoring and calibration
    Scoring,
    /// Ledger assembly
    Assemble,
}

impl Stage {
    /// Stage name as used in `trace.json`
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Sources => "sources",
            Stage::Evidence => "evidence",
            Stage::Claims => "claims",
            Stage::Canonicalize => "canonicalize",
            Stage::Relations => "relations",
            Stage::Resolve => "resolve",
            Stage::Scoring => "scoring",
            Stage::Assemble => "assemble",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Progress note
    Info,
    /// Input deliberately passed over (duplicate, missing text)
    Skip,
    /// Snippet not found in its source text
    VerificationFailure,
    /// Unparsable URL or schema-invalid record
    MalformedInput,
    /// Oracle error or timeout after all retries
    OracleFailure,
    /// Claim left without verified evidence
    InsufficientEvidence,
}

impl FailureKind {
    /// All kinds, in declaration order
    pub const ALL: [FailureKind; 6] = [
        FailureKind::Info,
        FailureKind::Skip,
        FailureKind::VerificationFailure,
        FailureKind::MalformedInput,
        FailureKind::OracleFailure,
        FailureKind::InsufficientEvidence,
    ];

    /// Kind name as used in `trace.json`
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Info => "info",
            FailureKind::Skip => "skip",
            FailureKind::VerificationFailure => "verification_failure",
            FailureKind::MalformedInput => "malformed_input",
            FailureKind::OracleFailure => "oracle_failure",
            FailureKind::InsufficientEvidence => "insufficient_evidence",
        }
    }

    /// Whether the event records lost or degraded input
    pub fn is_failure(&self) -> bool {
        !matches!(self, FailureKind::Info | FailureKind::Skip)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One timestamped trace entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// When the event was recorded
    pub at: DateTime<Utc>,
    /// Stage that recorded it
    pub stage: Stage,
    /// Event kind
    pub kind: FailureKind,
    /// Human-readable detail
    pub message: String,
}

/// Append-only event log for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTrace {
    events: Vec<TraceEvent>,
}

impl RunTrace {
    /// Create an empty trace
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event and log it
    pub fn record(&mut self, stage: Stage, kind: FailureKind, message: impl Into<String>) {
        let message = message.into();
        if kind.is_failure() {
            warn!("[{}] {}: {}", stage, kind, message);
        } else {
            info!("[{}] {}", stage, message);
        }
        self.events.push(TraceEvent {
            at: Utc::now(),
            stage,
            kind,
            message,
        });
    }

    /// Append a progress note
    pub fn info(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(stage, FailureKind::Info, message);
    }

    /// Events in recording order
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Number of events of one kind
    pub fn count(&self, kind: FailureKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    /// Event counts per kind; every kind is present, zero included
    pub fn health(&self) -> BTreeMap<String, usize> {
        FailureKind::ALL
            .iter()
            .map(|kind| (kind.as_str().to_string(), self.count(*kind)))
            .collect()
    }

    /// Serialize as `{events, health}`
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&serde_json::json!({
            "events": self.events,
            "health": self.health(),
        }))
    }
}
