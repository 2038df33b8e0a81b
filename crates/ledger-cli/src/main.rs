//! Evidence ledger CLI - turn a recorded research run into a validated ledger.

use anyhow::Context;
use clap::Parser;
use ledger_cli::commands;
use ledger_cli::{Cli, CliError, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // stdout carries command output only
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        match e.downcast_ref::<CliError>() {
            Some(cli_error) if cli_error.is_insufficient_evidence() => {
                eprintln!(
                    "Error: insufficient evidence - no extracted snippet could be verified \
                     against its source text, so no ledger was written"
                );
            }
            _ => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("Failed to load user configuration")?;

    let format = cli
        .format
        .map(Into::into)
        .unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        Command::Run(args) => commands::execute_run(args, &config, &formatter).await?,
        Command::Render(args) => commands::execute_render(args, &formatter).await?,
        Command::Validate(args) => commands::execute_validate(args, &formatter).await?,
        Command::Config(args) => commands::execute_config(args, &config).await?,
    }

    Ok(())
}
