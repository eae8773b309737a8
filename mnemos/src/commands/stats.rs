//! Statistics command.

use anyhow::{Context, Result};
use colored::Colorize;
use mnemos_core::{MemoryConfiguration, MemoryStatistics, MemoryTier};

use crate::cli::StatsCommand;

use super::{build_coordinator, ingest_file};

/// Execute stats command.
pub async fn execute(cmd: StatsCommand, config: MemoryConfiguration) -> Result<()> {
    let coordinator = build_coordinator(config)?;

    if let Some(input) = &cmd.input {
        ingest_file(&coordinator, input, false).await?;
    }

    let stats = coordinator.get_statistics().await;
    coordinator.shutdown().await;

    if cmd.json {
        print_json(&stats)
    } else {
        print_statistics(&stats);
        Ok(())
    }
}

pub fn print_json(stats: &MemoryStatistics) -> Result<()> {
    let json = serde_json::to_string_pretty(stats).context("Failed to serialize statistics")?;
    println!("{}", json);
    Ok(())
}

/// Print statistics as a table
pub fn print_statistics(stats: &MemoryStatistics) {
    println!("{} Memory Statistics", "📊".cyan());
    println!();
    println!("  Total memories: {}", stats.total.to_string().bold());
    println!(
        "  Short-term:     {}/{}",
        stats.short_term_count.to_string().yellow(),
        stats.max_short_term
    );
    println!();
    println!("  {:<12} {:>8} {:>10} {:>10}", "Tier", "Count", "Capacity", "Avg imp.");
    for tier in MemoryTier::ALL {
        let tier_stats = stats.tier(tier);
        println!(
            "  {:<12} {:>8} {:>10} {:>10.3}",
            tier_label(tier),
            tier_stats.count,
            tier_stats.capacity,
            tier_stats.average_importance
        );
    }
    println!();
    println!("  Ticks completed: {}", stats.ticks_completed);
    if let Some(at) = stats.last_tick_at {
        println!("  Last tick:       {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("  Forgotten:       {}", stats.forgotten.to_string().red());
    println!("  Evicted:         {}", stats.evicted.to_string().red());
    println!("  Promoted:        {}", stats.promoted.to_string().green());
}

/// Colored tier name
pub fn tier_label(tier: MemoryTier) -> String {
    let name = tier.as_str();
    match tier {
        MemoryTier::Working => name.yellow().to_string(),
        MemoryTier::Episodic => name.cyan().to_string(),
        MemoryTier::Semantic => name.green().to_string(),
        MemoryTier::Procedural => name.magenta().to_string(),
    }
}
