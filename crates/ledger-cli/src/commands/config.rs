//! Config command implementation.

use crate::cli::ConfigArgs;
use crate::config::Config;
use crate::error::Result;

/// Execute the config command.
///
/// Prints the named preset, or the effective configuration when none is given.
pub async fn execute_config(args: ConfigArgs, config: &Config) -> Result<()> {
    let config = match args.preset {
        Some(name) => Config::with_preset(&name)?,
        None => config.clone(),
    };
    print!("{}", config.to_toml()?);
    Ok(())
}
