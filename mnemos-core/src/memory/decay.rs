//! Importance decay and forgetting.
//!
//! Each tick multiplies every item's importance by `decay_rate` and then
//! permanently removes items that fell below `min_importance`. A rate of
//! 1.0 disables decay; the floor is still enforced.

use tracing::debug;

use crate::config::MemoryConfiguration;
use crate::types::{MemoryItem, MemoryTier};

use super::store::{MemoryStore, MemoryTiers};

/// Result of a decay tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecayReport {
    /// Items whose importance was multiplied
    pub decayed: usize,
    /// Items forgotten per tier, indexed in `MemoryTier::ALL` order
    pub forgotten_per_tier: [usize; 4],
}

impl DecayReport {
    /// Total items forgotten across tiers
    pub fn forgotten(&self) -> usize {
        self.forgotten_per_tier.iter().sum()
    }

    /// Items forgotten in one tier
    pub fn forgotten_in(&self, tier: MemoryTier) -> usize {
        self.forgotten_per_tier[tier.index()]
    }
}

/// Applies decay to the tier set
#[derive(Debug, Clone, Copy, Default)]
pub struct DecayEngine;

impl DecayEngine {
    pub fn new() -> Self {
        Self
    }

    /// Decay every tier, one write lock at a time
    pub async fn tick(&self, tiers: &MemoryTiers, config: &MemoryConfiguration) -> DecayReport {
        let mut report = DecayReport::default();

        for tier in MemoryTier::ALL {
            let mut store = tiers.write(tier).await;
            report.decayed += store.count();
            let forgotten = decay_store(&mut store, config.decay_rate, config.min_importance);
            report.forgotten_per_tier[tier.index()] = forgotten.len();
        }

        if report.forgotten() > 0 {
            debug!(
                decayed = report.decayed,
                forgotten = report.forgotten(),
                "Decay tick forgot items below the importance floor"
            );
        }

        report
    }
}

/// Decay one store and remove items below `min_importance`.
///
/// Returns the forgotten items.
pub fn decay_store(
    store: &mut MemoryStore,
    decay_rate: f64,
    min_importance: f64,
) -> Vec<MemoryItem> {
    if decay_rate < 1.0 {
        for item in store.iter_mut() {
            item.decay(decay_rate);
        }
    }

    store.retain(|item| item.importance >= min_importance)
}
