//! Query command.
//!
//! Without `--tier` or `--limit` the query goes through the gated entry
//! points (active retrieval, or context injection with `--context`), so a
//! disabled flag in the configuration yields no results.

use anyhow::{Context, Result};
use colored::Colorize;
use mnemos_core::memory::{cosine_similarity, RetrievalHit};
use mnemos_core::{MemoryConfiguration, MemoryCoordinator, MemoryId, MemoryTier, TierScope};
use serde::Serialize;

use crate::cli::QueryCommand;
use crate::input::parse_embedding;

use super::stats::tier_label;
use super::{build_coordinator, ingest_file, run_ticks};

#[derive(Debug, Serialize)]
struct QueryResult {
    id: MemoryId,
    tier: MemoryTier,
    similarity: f64,
    importance: f64,
    access_count: u32,
    content: String,
}

impl From<RetrievalHit> for QueryResult {
    fn from(hit: RetrievalHit) -> Self {
        Self {
            id: hit.item.id,
            tier: hit.item.tier,
            similarity: hit.similarity,
            importance: hit.item.importance,
            access_count: hit.item.access_count,
            content: hit.item.content,
        }
    }
}

/// Execute query command.
pub async fn execute(cmd: QueryCommand, config: MemoryConfiguration) -> Result<()> {
    let query = parse_embedding(&cmd.embedding).context("Invalid --embedding")?;
    let coordinator = build_coordinator(config)?;

    ingest_file(&coordinator, &cmd.input, false).await?;
    run_ticks(&coordinator, cmd.ticks).await;

    let hits = search(&coordinator, &query, &cmd).await;
    coordinator.shutdown().await;

    let results: Vec<QueryResult> = hits.into_iter().map(QueryResult::from).collect();

    if cmd.json {
        let json = serde_json::to_string_pretty(&results).context("Failed to serialize results")?;
        println!("{}", json);
        return Ok(());
    }

    if results.is_empty() {
        println!("{}", "No memories found".yellow());
        return Ok(());
    }

    println!("{} Found {} memories", "🔍".cyan(), results.len());
    println!();
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{:>3}. [{}] sim {:.3}  imp {:.3}  hits {}",
            rank + 1,
            tier_label(result.tier),
            result.similarity,
            result.importance,
            result.access_count
        );
        println!("     {}", result.content);
        println!("     {}", result.id.to_string().dimmed());
    }

    Ok(())
}

async fn search(
    coordinator: &MemoryCoordinator,
    query: &[f32],
    cmd: &QueryCommand,
) -> Vec<RetrievalHit> {
    if cmd.tier.is_empty() && cmd.limit.is_none() {
        let items = if cmd.context {
            coordinator.retrieve_for_context(query).await
        } else {
            coordinator.retrieve_active(query).await
        };
        return items
            .into_iter()
            .map(|item| RetrievalHit {
                similarity: cosine_similarity(query, &item.embedding),
                item,
            })
            .collect();
    }

    let scope = if cmd.tier.is_empty() {
        TierScope::All
    } else {
        TierScope::tiers(cmd.tier.iter().copied())
    };
    let limit = match cmd.limit {
        Some(limit) => limit,
        None => coordinator.get_configuration().await.retrieval_limit,
    };
    coordinator.retrieve_scored(query, limit, &scope).await
}
