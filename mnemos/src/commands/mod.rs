//! Command implementations for the mnemos CLI.
//!
//! Each command builds its own coordinator from the effective
//! configuration and shuts it down before returning.

pub mod config;
pub mod ingest;
pub mod query;
pub mod simulate;
pub mod stats;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use mnemos_core::{MemoryConfiguration, MemoryCoordinator, TickOutcome};
use tracing::debug;

use crate::input::{read_records, MemoryRecord};

/// Totals from feeding records into a coordinator
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub working: usize,
    pub procedural: usize,
}

impl IngestSummary {
    pub fn total(&self) -> usize {
        self.working + self.procedural
    }
}

/// Create a coordinator for one command run
pub fn build_coordinator(config: MemoryConfiguration) -> Result<Arc<MemoryCoordinator>> {
    let coordinator = MemoryCoordinator::new(config).context("Invalid memory configuration")?;
    Ok(Arc::new(coordinator))
}

/// Load a JSON-lines file and ingest every record
pub async fn ingest_file(
    coordinator: &MemoryCoordinator,
    path: &Path,
    force_procedural: bool,
) -> Result<IngestSummary> {
    let records = read_records(path).with_context(|| format!("Failed to read {}", path.display()))?;
    ingest_records(coordinator, records, force_procedural).await
}

pub async fn ingest_records(
    coordinator: &MemoryCoordinator,
    records: Vec<MemoryRecord>,
    force_procedural: bool,
) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();

    for record in records {
        if force_procedural || record.procedural {
            coordinator
                .ingest_procedural(record.content, record.embedding)
                .await
                .context("Failed to ingest procedural record")?;
            summary.procedural += 1;
        } else {
            coordinator
                .ingest(record.content, record.embedding)
                .await
                .context("Failed to ingest record")?;
            summary.working += 1;
        }
    }

    debug!(
        working = summary.working,
        procedural = summary.procedural,
        "Records ingested"
    );
    Ok(summary)
}

/// Run maintenance ticks synchronously; returns how many completed
pub async fn run_ticks(coordinator: &MemoryCoordinator, ticks: u32) -> usize {
    let mut completed = 0;
    for _ in 0..ticks {
        if let TickOutcome::Completed(report) = coordinator.tick().await {
            completed += 1;
            for error in &report.consolidation.errors {
                eprintln!("{} {}", "⚠".yellow(), error);
            }
        }
    }
    completed
}
