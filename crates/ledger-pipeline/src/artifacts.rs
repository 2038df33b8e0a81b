//! Run artifacts on disk
//!
//! A run directory holds `ledger.json` (the source of truth), `report.md` and
//! `graph.mmd` (derived from the ledger), and `trace.json`.

use crate::pipeline::RunOutput;
use crate::render::{render_mermaid, render_report};
use crate::PipelineError;
use ledger_domain::Ledger;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Ledger file name inside a run directory
pub const LEDGER_FILE: &str = "ledger.json";
/// Report file name
pub const REPORT_FILE: &str = "report.md";
/// Graph file name
pub const GRAPH_FILE: &str = "graph.mmd";
/// Trace file name
pub const TRACE_FILE: &str = "trace.json";

/// Paths written by [`write_artifacts`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Ledger JSON
    pub ledger: PathBuf,
    /// Markdown report
    pub report: PathBuf,
    /// Mermaid graph
    pub graph: PathBuf,
    /// Run trace, absent when only renders were written
    pub trace: Option<PathBuf>,
}

fn write_file(path: &Path, contents: &str) -> Result<(), PipelineError> {
    fs::write(path, contents).map_err(|e| PipelineError::Io(format!("{}: {}", path.display(), e)))
}

fn ensure_dir(dir: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(dir).map_err(|e| PipelineError::Io(format!("{}: {}", dir.display(), e)))
}

/// Write the report and graph derived from `ledger`
pub fn write_renders(out_dir: impl AsRef<Path>, ledger: &Ledger) -> Result<ArtifactPaths, PipelineError> {
    let out_dir = out_dir.as_ref();
    ensure_dir(out_dir)?;

    let report = out_dir.join(REPORT_FILE);
    write_file(&report, &render_report(ledger))?;
    let graph = out_dir.join(GRAPH_FILE);
    write_file(&graph, &render_mermaid(ledger))?;

    Ok(ArtifactPaths {
        ledger: out_dir.join(LEDGER_FILE),
        report,
        graph,
        trace: None,
    })
}

/// Validate the ledger and write all four artifacts
///
/// # Errors
///
/// Returns [`PipelineError::InvariantViolation`] without touching the
/// directory if the ledger is inconsistent.
pub fn write_artifacts(out_dir: impl AsRef<Path>, output: &RunOutput) -> Result<ArtifactPaths, PipelineError> {
    output.ledger.validate()?;
    let out_dir = out_dir.as_ref();

    let mut paths = write_renders(out_dir, &output.ledger)?;
    write_file(&paths.ledger, &serde_json::to_string_pretty(&output.ledger)?)?;

    let trace = out_dir.join(TRACE_FILE);
    write_file(&trace, &output.trace.to_json()?)?;
    paths.trace = Some(trace);

    info!("Wrote run artifacts to {}", out_dir.display());
    Ok(paths)
}

/// Read a ledger file and check its invariants
pub fn load_ledger(path: impl AsRef<Path>) -> Result<Ledger, PipelineError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .map_err(|e| PipelineError::Io(format!("{}: {}", path.display(), e)))?;
    let ledger: Ledger = serde_json::from_str(&json)?;
    ledger.validate()?;
    Ok(ledger)
}
