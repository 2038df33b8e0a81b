//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use ledger_domain::{Claim, Ledger};
use ledger_pipeline::{ArtifactPaths, FailureKind, RunTrace};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

const STATEMENT_WIDTH: usize = 60;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format the result of a pipeline run.
    pub fn format_run(
        &self,
        ledger: &Ledger,
        trace: &RunTrace,
        paths: &ArtifactPaths,
    ) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let summary = serde_json::json!({
                    "run_id": ledger.run_id.to_string(),
                    "claims": ledger.claims,
                    "resolutions": ledger.resolutions,
                    "metrics": ledger.metrics,
                    "health": trace.health(),
                    "artifacts": artifact_list(paths),
                });
                Ok(serde_json::to_string_pretty(&summary)?)
            }
            OutputFormat::Table => {
                let mut out = self.format_claims_table(ledger);
                out.push('\n');
                out.push_str(&self.health_line(trace));
                out.push('\n');
                out.push_str(&self.success(&format!(
                    "Wrote {}",
                    artifact_list(paths).join(", ")
                )));
                Ok(out)
            }
            OutputFormat::Quiet => Ok(artifact_list(paths).join("\n")),
        }
    }

    /// Format a rendered-artifacts result.
    pub fn format_render(&self, paths: &ArtifactPaths) -> Result<String> {
        let files = artifact_list(paths);
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&files)?),
            OutputFormat::Table => Ok(self.success(&format!("Wrote {}", files.join(", ")))),
            OutputFormat::Quiet => Ok(files.join("\n")),
        }
    }

    /// Format the claims of a ledger as a table.
    pub fn format_claims_table(&self, ledger: &Ledger) -> String {
        if ledger.claims.is_empty() {
            return self.colorize("No claims in ledger.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["ID", "Type", "Confidence", "Score", "Evidence", "Group", "Statement"]);

        for claim in &ledger.claims {
            let group = ledger
                .group_of(&claim.id)
                .map(|g| g.id.to_string())
                .unwrap_or_default();
            builder.push_record([
                claim.id.to_string(),
                claim.claim_type.to_string(),
                self.confidence_cell(claim),
                format!("{:.3}", claim.raw_score),
                claim.supported_by.len().to_string(),
                group,
                truncate(&claim.statement, STATEMENT_WIDTH),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    fn confidence_cell(&self, claim: &Claim) -> String {
        let mut cell = format!("{}/5", claim.confidence);
        if claim.needs_more_evidence {
            cell.push('*');
        }
        let color = match claim.confidence {
            4.. => "green",
            3 => "yellow",
            _ => "red",
        };
        self.colorize(&cell, color)
    }

    fn health_line(&self, trace: &RunTrace) -> String {
        let failures: Vec<String> = FailureKind::ALL
            .iter()
            .filter(|kind| kind.is_failure())
            .map(|kind| (kind, trace.count(*kind)))
            .filter(|(_, count)| *count > 0)
            .map(|(kind, count)| format!("{} {}", kind, count))
            .collect();
        if failures.is_empty() {
            self.info("Run health: no failures")
        } else {
            self.warning(&format!("Run health: {}", failures.join(", ")))
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

fn artifact_list(paths: &ArtifactPaths) -> Vec<String> {
    let mut files = vec![paths.report.display().to_string(), paths.graph.display().to_string()];
    if let Some(trace) = &paths.trace {
        files.insert(0, paths.ledger.display().to_string());
        files.push(trace.display().to_string());
    }
    files
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(3)).collect();
    short.push_str("...");
    short
}
