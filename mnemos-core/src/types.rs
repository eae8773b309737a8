//! Core data types for the memory subsystem.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a memory item
pub type MemoryId = Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Tiers
// ─────────────────────────────────────────────────────────────────────────────

/// Memory tier, ordered by persistence.
///
/// The derived ordering doubles as the lock acquisition order used when an
/// operation needs more than one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryTier {
    Working,
    Episodic,
    Semantic,
    Procedural,
}

impl MemoryTier {
    /// All tiers in lock order
    pub const ALL: [MemoryTier; 4] = [
        MemoryTier::Working,
        MemoryTier::Episodic,
        MemoryTier::Semantic,
        MemoryTier::Procedural,
    ];

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Working => "working",
            Self::Episodic => "episodic",
            Self::Semantic => "semantic",
            Self::Procedural => "procedural",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Self::Working => 0,
            Self::Episodic => 1,
            Self::Semantic => 2,
            Self::Procedural => 3,
        }
    }
}

impl std::fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MemoryTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "working" | "short_term" | "short" => Ok(Self::Working),
            "episodic" => Ok(Self::Episodic),
            "semantic" => Ok(Self::Semantic),
            "procedural" => Ok(Self::Procedural),
            other => Err(format!(
                "invalid tier: {}. Use: working, episodic, semantic, or procedural",
                other
            )),
        }
    }
}

/// Which tiers a retrieval query scans
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TierScope {
    #[default]
    All,
    Only(BTreeSet<MemoryTier>),
}

impl TierScope {
    /// Scope covering a single tier
    pub fn tier(tier: MemoryTier) -> Self {
        Self::Only(BTreeSet::from([tier]))
    }

    /// Scope covering the given tiers
    pub fn tiers(tiers: impl IntoIterator<Item = MemoryTier>) -> Self {
        Self::Only(tiers.into_iter().collect())
    }

    /// Whether the scope includes `tier`
    pub fn includes(&self, tier: MemoryTier) -> bool {
        match self {
            Self::All => true,
            Self::Only(tiers) => tiers.contains(&tier),
        }
    }

    /// Tiers covered by this scope, in lock order
    pub fn resolve(&self) -> Vec<MemoryTier> {
        MemoryTier::ALL
            .into_iter()
            .filter(|t| self.includes(*t))
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Items
// ─────────────────────────────────────────────────────────────────────────────

/// A single memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: MemoryId,
    pub tier: MemoryTier,
    pub content: String,
    pub embedding: Vec<f32>,
    pub importance: f64,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub access_count: u32,
    /// Consecutive consolidation cycles spent above the semantic cutoff
    #[serde(default)]
    pub stable_cycles: u32,
}

impl MemoryItem {
    /// Create a fresh item; importance is clamped into [0, 1]
    pub fn new(
        tier: MemoryTier,
        content: impl Into<String>,
        embedding: Vec<f32>,
        importance: f64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tier,
            content: content.into(),
            embedding,
            importance: clamp_importance(importance),
            created_at: now,
            last_accessed_at: now,
            access_count: 0,
            stable_cycles: 0,
        }
    }

    /// Record a retrieval hit
    pub fn record_access(&mut self, at: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed_at = at;
    }

    /// Multiply importance by `factor`; never raises it
    pub fn decay(&mut self, factor: f64) {
        self.importance = clamp_importance(self.importance * factor.min(1.0));
    }
}

pub(crate) fn clamp_importance(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

// ─────────────────────────────────────────────────────────────────────────────
// Statistics
// ─────────────────────────────────────────────────────────────────────────────

/// Per-tier statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TierStatistics {
    pub count: usize,
    pub capacity: usize,
    pub average_importance: f64,
}

/// Read-only snapshot for display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryStatistics {
    /// Working tier item count
    pub short_term_count: usize,
    /// Working tier capacity
    pub max_short_term: usize,
    pub working: TierStatistics,
    pub episodic: TierStatistics,
    pub semantic: TierStatistics,
    pub procedural: TierStatistics,
    /// Items across all tiers
    pub total: usize,
    pub ticks_completed: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    /// Cumulative items removed by decay
    pub forgotten: u64,
    /// Cumulative items removed by capacity pressure
    pub evicted: u64,
    /// Cumulative tier promotions
    pub promoted: u64,
}

impl MemoryStatistics {
    /// Statistics of one tier
    pub fn tier(&self, tier: MemoryTier) -> &TierStatistics {
        match tier {
            MemoryTier::Working => &self.working,
            MemoryTier::Episodic => &self.episodic,
            MemoryTier::Semantic => &self.semantic,
            MemoryTier::Procedural => &self.procedural,
        }
    }
}
