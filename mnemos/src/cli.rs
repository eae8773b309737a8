//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mnemos_core::MemoryTier;

/// Mnemos memory CLI
///
/// Feeds content into a tiered memory, runs maintenance ticks and
/// inspects what was kept.
#[derive(Parser, Debug)]
#[command(name = "mnemos")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "MNEMOS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show memory statistics
    Stats(StatsCommand),

    /// Ingest JSON-lines records and show the resulting statistics
    Ingest(IngestCommand),

    /// Ingest records, then run a retrieval query against them
    Query(QueryCommand),

    /// Run synthetic load through ingest, retrieval and maintenance ticks
    Simulate(SimulateCommand),

    /// Print or validate the effective configuration
    Config(ConfigCommand),
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct StatsCommand {
    /// JSON-lines file to ingest first
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct IngestCommand {
    /// JSON-lines file of {"content": ..., "embedding": [...]} records
    #[arg(short, long)]
    pub input: PathBuf,

    /// Store every record as procedural knowledge
    #[arg(long)]
    pub procedural: bool,

    /// Maintenance ticks to run after ingest
    #[arg(short, long, default_value = "0")]
    pub ticks: u32,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct QueryCommand {
    /// JSON-lines file to ingest before querying
    #[arg(short, long)]
    pub input: PathBuf,

    /// Query embedding as comma-separated floats
    #[arg(short, long, allow_hyphen_values = true)]
    pub embedding: String,

    /// Use context injection instead of active retrieval
    #[arg(long, conflicts_with_all = ["tier", "limit"])]
    pub context: bool,

    /// Restrict the query to these tiers (working, episodic, semantic, procedural)
    #[arg(long, value_delimiter = ',')]
    pub tier: Vec<MemoryTier>,

    /// Maximum results (defaults to the configured retrieval limit)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Maintenance ticks to run between ingest and query
    #[arg(short, long, default_value = "0")]
    pub ticks: u32,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// Items to ingest
    #[arg(short = 'n', long, default_value = "1000")]
    pub items: usize,

    /// Maintenance ticks, spread evenly over the ingest
    #[arg(short, long, default_value = "24")]
    pub ticks: u32,

    /// Embedding dimensions
    #[arg(short, long, default_value = "32")]
    pub dimensions: usize,

    /// Random seed for reproducible runs
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConfigCommand {
    /// Only validate; exit non-zero if the configuration is invalid
    #[arg(long)]
    pub check: bool,
}
