//! Config command.

use anyhow::{Context, Result};
use colored::Colorize;
use mnemos_core::MemoryConfiguration;

use crate::cli::ConfigCommand;
use crate::config::ConfigSource;

/// Execute config command.
///
/// Loading already validated the configuration, so reaching this point
/// with `--check` means it is valid.
pub fn execute(
    cmd: ConfigCommand,
    config: &MemoryConfiguration,
    source: &ConfigSource,
) -> Result<()> {
    if cmd.check {
        println!("{} Configuration valid ({})", "✓".green(), source.to_string().cyan());
        return Ok(());
    }

    let toml = config.to_toml_string().context("Failed to serialize configuration")?;
    println!("# Source: {}", source);
    print!("{}", toml);
    Ok(())
}
