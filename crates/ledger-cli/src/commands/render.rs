//! Render command implementation.

use crate::cli::RenderArgs;
use crate::error::Result;
use crate::output::Formatter;
use ledger_pipeline::{load_ledger, write_renders};
use std::path::PathBuf;

/// Execute the render command.
pub async fn execute_render(args: RenderArgs, formatter: &Formatter) -> Result<()> {
    let ledger = load_ledger(&args.ledger)?;
    let out = args.out.unwrap_or_else(|| {
        args.ledger
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let paths = write_renders(&out, &ledger)?;
    println!("{}", formatter.format_render(&paths)?);
    Ok(())
}
