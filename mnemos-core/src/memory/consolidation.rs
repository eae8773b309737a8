//! Memory consolidation.
//!
//! Decides tier transitions once per consolidation interval:
//!
//! ```text
//! ┌───────────┐ repeated / durable ┌───────────┐ stable N cycles ┌───────────┐
//! │  Working  │───────────────────▶│ Episodic  │────────────────▶│ Semantic  │
//! └───────────┘                    └───────────┘                 └───────────┘
//!
//! ┌────────────┐
//! │ Procedural │  populated independently, never promoted into
//! └────────────┘
//! ```
//!
//! A candidate is only promoted if the destination has room, or if it is
//! more important than the destination's weakest item. Otherwise it is
//! dropped, treated as naturally forgotten.

use tracing::{debug, warn};

use crate::config::{ConsolidationPolicy, MemoryConfiguration};
use crate::types::{MemoryId, MemoryItem, MemoryTier};

use super::store::{MemoryStore, MemoryTiers};

/// Result of a consolidation cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidationReport {
    /// Items moved from Working to Episodic.
    pub promoted_to_episodic: usize,
    /// Items moved from Episodic to Semantic.
    pub promoted_to_semantic: usize,
    /// Candidates dropped because the destination was full of stronger items.
    pub dropped: usize,
    /// Destination items evicted to make room for a stronger candidate.
    pub evicted: usize,
    /// Ids promoted this cycle, with their new tier.
    pub promoted: Vec<(MemoryId, MemoryTier)>,
    /// Per-item failures; the rest of the cycle still ran.
    pub errors: Vec<String>,
}

impl ConsolidationReport {
    /// Check if any work was done.
    pub fn has_changes(&self) -> bool {
        self.total_affected() > 0
    }

    /// Total entries affected.
    pub fn total_affected(&self) -> usize {
        self.promoted_to_episodic + self.promoted_to_semantic + self.dropped + self.evicted
    }
}

/// What happened to a single promotion candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionOutcome {
    /// Moved into the destination without displacing anything.
    Promoted,
    /// Moved into the destination, evicting its weakest item.
    PromotedWithEviction,
    /// Destination full of stronger items; candidate forgotten.
    Dropped,
}

/// Applies the consolidation policy to the tier set
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolidationScheduler;

impl ConsolidationScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Run one consolidation cycle.
    ///
    /// Working, Episodic and Semantic are write-locked in tier order for the
    /// whole cycle. Episodic is processed before Working so that items
    /// promoted this cycle only start counting stable cycles on the next one.
    pub async fn run_cycle(
        &self,
        tiers: &MemoryTiers,
        config: &MemoryConfiguration,
    ) -> ConsolidationReport {
        let policy = &config.consolidation;
        let mut report = ConsolidationReport::default();

        let mut working = tiers.write(MemoryTier::Working).await;
        let mut episodic = tiers.write(MemoryTier::Episodic).await;
        let mut semantic = tiers.write(MemoryTier::Semantic).await;

        // 1. Episodic -> Semantic after enough stable cycles
        let candidates = semantic_candidates(&mut episodic, policy);
        for id in candidates {
            match promote_one(&mut episodic, &mut semantic, &id) {
                Ok(outcome) => record(&mut report, id, MemoryTier::Semantic, outcome),
                Err(e) => {
                    warn!(id = %id, error = %e, "Episodic promotion failed");
                    report.errors.push(e);
                }
            }
        }

        // 2. Working -> Episodic for repeated or durable items
        let candidates = episodic_candidates(&working, policy);
        for id in candidates {
            match promote_one(&mut working, &mut episodic, &id) {
                Ok(outcome) => record(&mut report, id, MemoryTier::Episodic, outcome),
                Err(e) => {
                    warn!(id = %id, error = %e, "Working promotion failed");
                    report.errors.push(e);
                }
            }
        }

        if report.has_changes() {
            debug!(
                to_episodic = report.promoted_to_episodic,
                to_semantic = report.promoted_to_semantic,
                dropped = report.dropped,
                evicted = report.evicted,
                "Consolidation cycle moved items"
            );
        }

        report
    }
}

/// Whether a Working item qualifies for Episodic
pub fn qualifies_for_episodic(item: &MemoryItem, policy: &ConsolidationPolicy) -> bool {
    item.access_count > policy.repetition_threshold || item.importance > policy.durable_importance
}

fn episodic_candidates(working: &MemoryStore, policy: &ConsolidationPolicy) -> Vec<MemoryId> {
    working
        .iter()
        .filter(|item| qualifies_for_episodic(item, policy))
        .map(|item| item.id)
        .collect()
}

/// Update stable-cycle counters and collect Episodic items ready for Semantic
fn semantic_candidates(episodic: &mut MemoryStore, policy: &ConsolidationPolicy) -> Vec<MemoryId> {
    let mut ready = Vec::new();
    for item in episodic.iter_mut() {
        if item.importance > policy.semantic_durability {
            item.stable_cycles = item.stable_cycles.saturating_add(1);
        } else {
            item.stable_cycles = 0;
        }
        if item.stable_cycles >= policy.semantic_min_cycles {
            ready.push(item.id);
        }
    }
    ready
}

/// Move one item from `source` into `destination`.
///
/// If the destination is full and the item is not more important than the
/// destination's weakest item, the item is removed from `source` and
/// dropped instead of displacing a stronger memory.
pub fn promote_one(
    source: &mut MemoryStore,
    destination: &mut MemoryStore,
    id: &MemoryId,
) -> Result<PromotionOutcome, String> {
    let mut item = source
        .remove(id)
        .ok_or_else(|| format!("{} vanished from {} before promotion", id, source.tier()))?;

    if destination.is_full() {
        let floor = destination.min_importance().unwrap_or(f64::NEG_INFINITY);
        if item.importance <= floor {
            debug!(
                id = %item.id,
                importance = item.importance,
                floor = floor,
                destination = %destination.tier(),
                "Promotion candidate dropped, destination full of stronger items"
            );
            return Ok(PromotionOutcome::Dropped);
        }
    }

    item.stable_cycles = 0;
    match destination.insert(item) {
        Some(_) => Ok(PromotionOutcome::PromotedWithEviction),
        None => Ok(PromotionOutcome::Promoted),
    }
}

fn record(
    report: &mut ConsolidationReport,
    id: MemoryId,
    tier: MemoryTier,
    outcome: PromotionOutcome,
) {
    match outcome {
        PromotionOutcome::Dropped => {
            report.dropped += 1;
            return;
        }
        PromotionOutcome::PromotedWithEviction => report.evicted += 1,
        PromotionOutcome::Promoted => {}
    }

    match tier {
        MemoryTier::Episodic => report.promoted_to_episodic += 1,
        MemoryTier::Semantic => report.promoted_to_semantic += 1,
        MemoryTier::Working | MemoryTier::Procedural => {}
    }
    report.promoted.push((id, tier));
}
