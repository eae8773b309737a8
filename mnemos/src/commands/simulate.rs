//! Simulate command.
//!
//! Generates clustered random embeddings so that queries near a topic
//! center hit related items repeatedly, which drives repetition-based
//! promotion alongside keyword and length-based importance.

use anyhow::{bail, Result};
use colored::Colorize;
use mnemos_core::{MemoryConfiguration, MemoryCoordinator, TickOutcome};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::info;

use crate::cli::SimulateCommand;

use super::build_coordinator;
use super::stats::print_statistics;

const TOPICS: usize = 8;
const QUERY_PROBABILITY: f64 = 0.25;
const KEYWORD_PROBABILITY: f64 = 0.1;
const NOISE: f32 = 0.35;

const VOCABULARY: &[&str] = &[
    "meeting", "project", "deadline", "coffee", "report", "flight", "dentist", "invoice", "garden",
    "recipe", "budget", "server", "backup", "birthday", "train", "library", "password", "doctor",
    "weather", "review", "groceries", "contract", "holiday", "lecture",
];

/// Totals for a simulation run
#[derive(Debug, Default, Clone, Serialize)]
pub struct SimulationSummary {
    pub seed: u64,
    pub ingested: usize,
    pub queries: usize,
    pub hits: usize,
    pub ticks_completed: usize,
    pub ticks_skipped: usize,
    pub promoted: usize,
    pub forgotten: usize,
}

/// Execute simulate command.
pub async fn execute(cmd: SimulateCommand, config: MemoryConfiguration) -> Result<()> {
    if cmd.dimensions == 0 {
        bail!("--dimensions must be at least 1");
    }

    let coordinator = build_coordinator(config)?;
    let seed = cmd.seed.unwrap_or_else(rand::random);
    let summary = simulate(&coordinator, cmd.items, cmd.ticks, cmd.dimensions, seed).await?;

    let stats = coordinator.get_statistics().await;
    coordinator.shutdown().await;

    if cmd.json {
        let output = serde_json::json!({ "summary": summary, "statistics": stats });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{} Simulation (seed {})", "🧪".cyan(), summary.seed.to_string().bold());
    println!();
    println!("  Ingested:        {}", summary.ingested);
    println!("  Queries:         {} ({} hits)", summary.queries, summary.hits);
    println!(
        "  Ticks:           {} completed, {} skipped",
        summary.ticks_completed, summary.ticks_skipped
    );
    println!("  Promoted:        {}", summary.promoted.to_string().green());
    println!("  Forgotten:       {}", summary.forgotten.to_string().red());
    println!();
    print_statistics(&stats);

    Ok(())
}

/// Drive synthetic load through a coordinator
pub async fn simulate(
    coordinator: &MemoryCoordinator,
    items: usize,
    ticks: u32,
    dimensions: usize,
    seed: u64,
) -> Result<SimulationSummary> {
    let mut rng = StdRng::seed_from_u64(seed);
    let keywords: Vec<String> = coordinator
        .get_configuration()
        .await
        .important_keywords
        .into_iter()
        .collect();

    let centers: Vec<Vec<f32>> = (0..TOPICS).map(|_| random_unit(&mut rng, dimensions)).collect();
    let tick_every = if ticks == 0 { usize::MAX } else { (items / ticks as usize).max(1) };

    let mut summary = SimulationSummary {
        seed,
        ..Default::default()
    };
    let mut ticks_run = 0u32;

    for i in 0..items {
        let center = &centers[rng.gen_range(0..TOPICS)];
        let embedding = jitter(&mut rng, center);
        let content = random_content(&mut rng, &keywords);
        coordinator.ingest(content, embedding).await?;
        summary.ingested += 1;

        if rng.gen_bool(QUERY_PROBABILITY) {
            let topic = rng.gen_range(0..TOPICS);
            let query = jitter(&mut rng, &centers[topic]);
            summary.queries += 1;
            summary.hits += coordinator.retrieve_active(&query).await.len();
        }

        if (i + 1) % tick_every == 0 && ticks_run < ticks {
            ticks_run += 1;
            record_tick(&mut summary, coordinator.tick().await);
        }
    }

    while ticks_run < ticks {
        ticks_run += 1;
        record_tick(&mut summary, coordinator.tick().await);
    }

    info!(
        seed = seed,
        ingested = summary.ingested,
        ticks = summary.ticks_completed,
        "Simulation finished"
    );
    Ok(summary)
}

fn record_tick(summary: &mut SimulationSummary, outcome: TickOutcome) {
    match outcome {
        TickOutcome::Completed(report) => {
            summary.ticks_completed += 1;
            let consolidation = &report.consolidation;
            summary.promoted +=
                consolidation.promoted_to_episodic + consolidation.promoted_to_semantic;
            summary.forgotten += report.decay.forgotten() + consolidation.dropped;
        }
        TickOutcome::Skipped(_) => summary.ticks_skipped += 1,
    }
}

fn random_unit(rng: &mut StdRng, dimensions: usize) -> Vec<f32> {
    let mut vector: Vec<f32> = (0..dimensions).map(|_| rng.gen_range(-1.0..1.0)).collect();
    normalize(&mut vector);
    vector
}

fn jitter(rng: &mut StdRng, center: &[f32]) -> Vec<f32> {
    let mut vector: Vec<f32> = center
        .iter()
        .map(|x| x + rng.gen_range(-NOISE..NOISE))
        .collect();
    normalize(&mut vector);
    vector
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

fn random_content(rng: &mut StdRng, keywords: &[String]) -> String {
    let length = rng.gen_range(3..30);
    let mut words: Vec<&str> = (0..length)
        .filter_map(|_| VOCABULARY.choose(rng).copied())
        .collect();

    if rng.gen_bool(KEYWORD_PROBABILITY) {
        if let Some(keyword) = keywords.choose(rng) {
            words.insert(0, keyword.as_str());
        }
    }

    words.join(" ")
}
