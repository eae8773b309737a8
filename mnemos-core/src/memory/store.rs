//! Capacity-bounded storage for a single tier.
//!
//! One `MemoryStore` type serves all four tiers. It is NOT internally
//! synchronized: `MemoryTiers` wraps each store in its own `RwLock` so that
//! mutations of a tier are serialized and no caller can observe a tier over
//! capacity.

use std::cmp::Ordering;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::config::MemoryConfiguration;
use crate::types::{MemoryId, MemoryItem, MemoryTier, TierStatistics};

/// Ordering used for eviction: `Less` means `a` is evicted before `b`.
///
/// Lowest importance goes first, then the least recently accessed, then the
/// least accessed. Remaining ties fall back to id so the victim is
/// deterministic.
pub fn eviction_order(a: &MemoryItem, b: &MemoryItem) -> Ordering {
    a.importance
        .total_cmp(&b.importance)
        .then_with(|| a.last_accessed_at.cmp(&b.last_accessed_at))
        .then_with(|| a.access_count.cmp(&b.access_count))
        .then_with(|| b.id.cmp(&a.id))
}

/// Items of one tier, bounded by `capacity`
#[derive(Debug, Clone)]
pub struct MemoryStore {
    tier: MemoryTier,
    capacity: usize,
    items: Vec<MemoryItem>,
}

impl MemoryStore {
    /// Create an empty store. A capacity of 0 is treated as 1.
    pub fn new(tier: MemoryTier, capacity: usize) -> Self {
        Self {
            tier,
            capacity: capacity.max(1),
            items: Vec::new(),
        }
    }

    /// Tier this store holds
    pub fn tier(&self) -> MemoryTier {
        self.tier
    }

    /// Maximum number of items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of items
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Insert an item, evicting the weakest existing item first if the store
    /// is at capacity. The incoming item is never the victim, even when it is
    /// weaker than everything already held: ingest must always keep the new
    /// item, and decay and consolidation decide later whether it stays.
    ///
    /// The item's tier is reassigned to this store's tier. Re-inserting an
    /// id that is already present replaces it in place.
    pub fn insert(&mut self, mut item: MemoryItem) -> Option<MemoryItem> {
        item.tier = self.tier;

        if let Some(existing) = self.items.iter_mut().find(|i| i.id == item.id) {
            *existing = item;
            return None;
        }

        let evicted = if self.is_full() { self.evict_weakest() } else { None };
        self.items.push(item);
        evicted
    }

    /// Remove an item by id. Absent ids are a no-op.
    pub fn remove(&mut self, id: &MemoryId) -> Option<MemoryItem> {
        let pos = self.items.iter().position(|i| &i.id == id)?;
        Some(self.items.remove(pos))
    }

    /// Look up an item by id
    pub fn get(&self, id: &MemoryId) -> Option<&MemoryItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    /// Look up an item by id for mutation
    pub fn get_mut(&mut self, id: &MemoryId) -> Option<&mut MemoryItem> {
        self.items.iter_mut().find(|i| &i.id == id)
    }

    pub fn contains(&self, id: &MemoryId) -> bool {
        self.get(id).is_some()
    }

    /// Snapshot of all items in insertion order
    pub fn all(&self) -> Vec<MemoryItem> {
        self.items.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemoryItem> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut MemoryItem> {
        self.items.iter_mut()
    }

    /// Keep only items matching the predicate; returns the removed items
    pub fn retain<F>(&mut self, mut keep: F) -> Vec<MemoryItem>
    where
        F: FnMut(&MemoryItem) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());
        for item in self.items.drain(..) {
            if keep(&item) {
                kept.push(item);
            } else {
                removed.push(item);
            }
        }
        self.items = kept;
        removed
    }

    /// Remove every item; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        count
    }

    /// Lowest importance currently held, if any
    pub fn min_importance(&self) -> Option<f64> {
        self.items
            .iter()
            .map(|i| i.importance)
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Change capacity, evicting the weakest items if the store shrank
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<MemoryItem> {
        self.capacity = capacity.max(1);
        let mut evicted = Vec::new();
        while self.items.len() > self.capacity {
            match self.evict_weakest() {
                Some(item) => evicted.push(item),
                None => break,
            }
        }
        if !evicted.is_empty() {
            debug!(
                tier = %self.tier,
                capacity = self.capacity,
                evicted = evicted.len(),
                "Store shrank, evicted weakest items"
            );
        }
        evicted
    }

    /// Count, capacity and average importance
    pub fn statistics(&self) -> TierStatistics {
        let average_importance = if self.items.is_empty() {
            0.0
        } else {
            self.items.iter().map(|i| i.importance).sum::<f64>() / self.items.len() as f64
        };

        TierStatistics {
            count: self.items.len(),
            capacity: self.capacity,
            average_importance,
        }
    }

    fn evict_weakest(&mut self) -> Option<MemoryItem> {
        let pos = self
            .items
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| eviction_order(a, b))
            .map(|(pos, _)| pos)?;
        let evicted = self.items.remove(pos);
        debug!(
            tier = %self.tier,
            id = %evicted.id,
            importance = evicted.importance,
            "Evicted weakest item at capacity"
        );
        Some(evicted)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tier set
// ─────────────────────────────────────────────────────────────────────────────

/// The four tier stores, each behind its own lock.
///
/// Operations that touch several tiers must acquire locks in
/// `MemoryTier` order (Working, Episodic, Semantic, Procedural).
#[derive(Debug)]
pub struct MemoryTiers {
    stores: [RwLock<MemoryStore>; 4],
}

impl MemoryTiers {
    /// Create empty stores sized from the configuration
    pub fn new(config: &MemoryConfiguration) -> Self {
        Self {
            stores: MemoryTier::ALL
                .map(|tier| RwLock::new(MemoryStore::new(tier, capacity_for(config, tier)))),
        }
    }

    /// Lock of one tier
    pub fn store(&self, tier: MemoryTier) -> &RwLock<MemoryStore> {
        &self.stores[tier.index()]
    }

    pub async fn read(&self, tier: MemoryTier) -> RwLockReadGuard<'_, MemoryStore> {
        self.store(tier).read().await
    }

    pub async fn write(&self, tier: MemoryTier) -> RwLockWriteGuard<'_, MemoryStore> {
        self.store(tier).write().await
    }

    /// Apply configured capacities to every store; returns items evicted by shrinking
    pub async fn apply_capacities(&self, config: &MemoryConfiguration) -> Vec<MemoryItem> {
        let mut evicted = Vec::new();
        for tier in MemoryTier::ALL {
            let mut store = self.write(tier).await;
            let capacity = capacity_for(config, tier);
            if store.capacity() != capacity {
                evicted.extend(store.set_capacity(capacity));
            }
        }
        evicted
    }

    /// Find which tier holds `id`
    pub async fn locate(&self, id: &MemoryId) -> Option<MemoryTier> {
        for tier in MemoryTier::ALL {
            if self.read(tier).await.contains(id) {
                return Some(tier);
            }
        }
        None
    }

    /// Total number of items across tiers
    pub async fn total(&self) -> usize {
        let mut total = 0;
        for tier in MemoryTier::ALL {
            total += self.read(tier).await.count();
        }
        total
    }
}

/// Configured capacity of a tier
pub fn capacity_for(config: &MemoryConfiguration, tier: MemoryTier) -> usize {
    match tier {
        MemoryTier::Working => config.working_capacity,
        MemoryTier::Episodic => config.episodic_capacity,
        MemoryTier::Semantic => config.semantic_capacity,
        MemoryTier::Procedural => config.procedural_capacity,
    }
}
