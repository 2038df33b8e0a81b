//! Validate command implementation.

use crate::cli::ValidateArgs;
use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::Formatter;
use ledger_pipeline::load_ledger;

/// Execute the validate command.
///
/// An inconsistent ledger is reported through the returned error.
pub async fn execute_validate(args: ValidateArgs, formatter: &Formatter) -> Result<()> {
    let ledger = load_ledger(&args.ledger)?;
    let message = format!(
        "{} is valid: {} sources, {} evidence, {} claims, {} edges, {} resolutions",
        args.ledger.display(),
        ledger.sources.len(),
        ledger.evidence.len(),
        ledger.claims.len(),
        ledger.edges.len(),
        ledger.resolutions.len()
    );
    match formatter.format() {
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({"valid": true, "run_id": ledger.run_id.to_string()})
        ),
        OutputFormat::Table => println!("{}", formatter.success(&message)),
        OutputFormat::Quiet => {}
    }
    Ok(())
}
