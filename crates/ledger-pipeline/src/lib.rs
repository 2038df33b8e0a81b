//! Evidence Ledger Pipeline
//!
//! Turns the recorded outputs of a research run into a validated evidence
//! ledger.
//!
//! # Overview
//!
//! The pipeline owns everything between "search results and page text exist"
//! and "a ledger is written": source construction, snippet verification,
//! claim canonicalization, pairwise relation labelling, contradiction
//! grouping, confidence scoring and metrics. Judgement calls are delegated
//! to oracle traits so a run can be replayed offline with recorded output.
//!
//! # Architecture
//!
//! ```text
//! Search results → Sources → Evidence cards → Claims → Canonical claims
//!     → Relations → Contradiction groups → Scores → Ledger → report / graph
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use ledger_pipeline::{
//!     write_artifacts, HeuristicRelationOracle, Pipeline, PipelineConfig, RunBundle,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (input, extraction) = RunBundle::load("run.json")?.into_parts();
//! let pipeline = Pipeline::new(PipelineConfig::default(), extraction, HeuristicRelationOracle)?;
//!
//! let output = pipeline.run(input).await?;
//! write_artifacts("out", &output)?;
//!
//! println!("{} claims", output.ledger.claims.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod artifacts;
pub mod canonicalize;
mod config;
pub mod disjoint_set;
mod error;
pub mod graph;
mod input;
pub mod metrics;
pub mod oracle_pool;
mod pipeline;
pub mod relations;
pub mod render;
pub mod scoring;
pub mod similarity;
pub mod trace;

#[cfg(test)]
mod tests;

pub use artifacts::{load_ledger, write_artifacts, write_renders, ArtifactPaths};
pub use canonicalize::ClaimCanonicalizer;
pub use config::{PipelineConfig, ScoringConfig, ScoringWeights};
pub use error::PipelineError;
pub use graph::ClaimGraph;
pub use input::{Document, RecordedExtraction, RecordedExtractionOracle, RunBundle, RunInput};
pub use oracle_pool::CallPolicy;
pub use pipeline::{NoSummaryOracle, Pipeline, RunOutput};
pub use relations::HeuristicRelationOracle;
pub use render::{render_mermaid, render_report};
pub use scoring::{calibrate, ConfidenceScorer};
pub use trace::{FailureKind, RunTrace, Stage, TraceEvent};
