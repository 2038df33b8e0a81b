//! CLI command definitions and argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Evidence ledger: verify, relate and score the claims of a research run.
#[derive(Debug, Parser)]
#[command(name = "ledger")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
    /// Quiet format (artifact paths only)
    Quiet,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline over a recorded bundle and write artifacts
    Run(RunArgs),

    /// Re-derive the report and graph from a ledger file
    Render(RenderArgs),

    /// Check a ledger file's invariants
    Validate(ValidateArgs),

    /// Print a configuration as TOML
    Config(ConfigArgs),
}

/// Where evidence and claim proposals come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExtractionArg {
    /// Replay the bundle's recorded extraction
    Recorded,
    /// Ask a local Ollama model
    Ollama,
}

/// Who labels claim pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RelationsArg {
    /// Polarity and wording rules, offline
    Heuristic,
    /// Ask a local Ollama model
    Ollama,
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Recorded run bundle (JSON)
    #[arg(short, long)]
    pub bundle: PathBuf,

    /// Output directory for artifacts
    #[arg(short, long, default_value = "ledger-out")]
    pub out: PathBuf,

    /// Configuration file (defaults to the user config file)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Relation labelling backend
    #[arg(long, value_enum, default_value = "heuristic")]
    pub relations: RelationsArg,

    /// Evidence extraction backend
    #[arg(long, value_enum, default_value = "recorded")]
    pub extraction: ExtractionArg,

    /// Ollama endpoint
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Ollama model name
    #[arg(long, env = "LEDGER_MODEL")]
    pub model: Option<String>,

    /// Leave contradiction groups unsummarized
    #[arg(long)]
    pub no_summaries: bool,
}

/// Arguments for the render command.
#[derive(Debug, Parser)]
pub struct RenderArgs {
    /// Ledger file
    #[arg(short, long)]
    pub ledger: PathBuf,

    /// Output directory (defaults to the ledger's directory)
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

/// Arguments for the validate command.
#[derive(Debug, Parser)]
pub struct ValidateArgs {
    /// Ledger file
    #[arg(short, long)]
    pub ledger: PathBuf,
}

/// Arguments for the config command.
#[derive(Debug, Parser)]
pub struct ConfigArgs {
    /// Pipeline preset: default, strict or lenient
    #[arg(short, long)]
    pub preset: Option<String>,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
            CliFormat::Quiet => crate::config::OutputFormat::Quiet,
        }
    }
}
