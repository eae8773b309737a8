//! Ingest command.

use anyhow::Result;
use colored::Colorize;
use mnemos_core::MemoryConfiguration;

use crate::cli::IngestCommand;

use super::stats::{print_json, print_statistics};
use super::{build_coordinator, ingest_file, run_ticks};

/// Execute ingest command.
pub async fn execute(cmd: IngestCommand, config: MemoryConfiguration) -> Result<()> {
    let coordinator = build_coordinator(config)?;

    let summary = ingest_file(&coordinator, &cmd.input, cmd.procedural).await?;
    let ticks = run_ticks(&coordinator, cmd.ticks).await;

    let stats = coordinator.get_statistics().await;
    coordinator.shutdown().await;

    if cmd.json {
        return print_json(&stats);
    }

    println!(
        "{} Ingested {} records ({} working, {} procedural)",
        "✓".green(),
        summary.total(),
        summary.working,
        summary.procedural
    );
    if ticks > 0 {
        println!("{} Ran {} maintenance ticks", "✓".green(), ticks);
    }
    println!();
    print_statistics(&stats);

    Ok(())
}
