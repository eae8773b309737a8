//! Similarity-ranked retrieval across tiers.
//!
//! A query write-locks every tier in scope, in `MemoryTier` order, and holds
//! them while scoring, ranking and recording access. Consolidation moves
//! items between tiers under the same locks, so a query sees each item in
//! exactly one tier.

use std::cmp::Ordering;

use chrono::{Duration, Utc};
use tokio::sync::RwLockWriteGuard;
use tracing::debug;

use crate::types::{MemoryItem, TierScope};

use super::store::{MemoryStore, MemoryTiers};

/// A retrieved item with its similarity to the query
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalHit {
    pub item: MemoryItem,
    pub similarity: f64,
}

/// Ranking used for results: `Less` means `a` ranks before `b`.
///
/// Similarity first, then importance, then most recent access, then access
/// count, then id so equal scores always produce the same order.
pub fn rank_order(a: &RetrievalHit, b: &RetrievalHit) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| b.item.importance.total_cmp(&a.item.importance))
        .then_with(|| b.item.last_accessed_at.cmp(&a.item.last_accessed_at))
        .then_with(|| b.item.access_count.cmp(&a.item.access_count))
        .then_with(|| a.item.id.cmp(&b.item.id))
}

/// Compute cosine similarity between two vectors
///
/// Returns a value between -1.0 and 1.0. Vectors of different length, zero
/// vectors and non-finite input score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Ranks stored items against a query embedding
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrievalEngine;

impl RetrievalEngine {
    pub fn new() -> Self {
        Self
    }

    /// Top `limit` items with similarity at or above `threshold`, most relevant first.
    ///
    /// Records an access on every returned item.
    pub async fn retrieve(
        &self,
        tiers: &MemoryTiers,
        query: &[f32],
        limit: usize,
        scope: &TierScope,
        threshold: f64,
    ) -> Vec<MemoryItem> {
        self.retrieve_scored(tiers, query, limit, scope, threshold)
            .await
            .into_iter()
            .map(|hit| hit.item)
            .collect()
    }

    /// Like `retrieve`, keeping the similarity of each hit
    pub async fn retrieve_scored(
        &self,
        tiers: &MemoryTiers,
        query: &[f32],
        limit: usize,
        scope: &TierScope,
        threshold: f64,
    ) -> Vec<RetrievalHit> {
        if limit == 0 || query.is_empty() {
            return Vec::new();
        }

        let mut stores = Vec::new();
        for tier in scope.resolve() {
            stores.push(tiers.write(tier).await);
        }

        let mut hits = Vec::new();
        for store in &stores {
            for item in store.iter() {
                let similarity = cosine_similarity(query, &item.embedding);
                if similarity >= threshold {
                    hits.push(RetrievalHit {
                        item: item.clone(),
                        similarity,
                    });
                }
            }
        }

        hits.sort_by(rank_order);
        hits.truncate(limit);
        record_access(&mut stores, &mut hits);
        drop(stores);

        debug!(
            results = hits.len(),
            threshold = threshold,
            "Retrieval completed"
        );
        hits
    }
}

/// Bump access metadata of the hits and refresh them from the stores.
///
/// Hits get timestamps staggered by rank, top result most recent, so the
/// recency key agrees with the order just returned and a repeated query
/// against an unchanged store yields the same order.
fn record_access(stores: &mut [RwLockWriteGuard<'_, MemoryStore>], hits: &mut [RetrievalHit]) {
    let now = Utc::now();

    for (rank, hit) in hits.iter_mut().enumerate() {
        let item = stores
            .iter_mut()
            .find(|store| store.tier() == hit.item.tier)
            .and_then(|store| store.get_mut(&hit.item.id));
        if let Some(item) = item {
            item.record_access(now - Duration::microseconds(rank as i64));
            hit.item = item.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfiguration;
    use crate::types::{MemoryId, MemoryTier};

    fn unit(angle_cos: f32) -> Vec<f32> {
        vec![angle_cos, (1.0 - angle_cos * angle_cos).sqrt()]
    }

    async fn insert(
        tiers: &MemoryTiers,
        tier: MemoryTier,
        embedding: Vec<f32>,
        importance: f64,
    ) -> MemoryId {
        let item = MemoryItem::new(tier, "memory", embedding, importance);
        let id = item.id;
        tiers.write(tier).await.insert(item);
        id
    }

    fn tiers() -> MemoryTiers {
        MemoryTiers::new(&MemoryConfiguration::default())
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[f32::INFINITY, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_scenario_c_threshold_boundary() {
        let tiers = tiers();
        let id = insert(&tiers, MemoryTier::Working, vec![1.0, 0.0], 0.5).await;
        let engine = RetrievalEngine::new();

        let below = engine
            .retrieve(&tiers, &unit(0.79), 10, &TierScope::All, 0.8)
            .await;
        assert!(below.is_empty());

        let above = engine
            .retrieve(&tiers, &unit(0.81), 10, &TierScope::All, 0.8)
            .await;
        assert_eq!(above.len(), 1);
        assert_eq!(above[0].id, id);
    }

    #[tokio::test]
    async fn test_ranking_similarity_then_importance() {
        let tiers = tiers();
        let close = insert(&tiers, MemoryTier::Episodic, unit(0.99), 0.2).await;
        let far_strong = insert(&tiers, MemoryTier::Working, unit(0.9), 0.9).await;
        let far_weak = insert(&tiers, MemoryTier::Semantic, unit(0.9), 0.3).await;

        let results = RetrievalEngine::new()
            .retrieve(&tiers, &[1.0, 0.0], 10, &TierScope::All, 0.5)
            .await;

        let ids: Vec<MemoryId> = results.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![close, far_strong, far_weak]);
    }

    #[tokio::test]
    async fn test_limit_and_access_recorded() {
        let tiers = tiers();
        for importance in [0.1, 0.2, 0.3, 0.4] {
            insert(&tiers, MemoryTier::Working, vec![1.0, 0.0], importance).await;
        }

        let results = RetrievalEngine::new()
            .retrieve(&tiers, &[1.0, 0.0], 2, &TierScope::All, 0.5)
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].importance, 0.4);
        assert_eq!(results[1].importance, 0.3);
        assert!(results.iter().all(|i| i.access_count == 1));

        let store = tiers.read(MemoryTier::Working).await;
        let untouched = store.iter().filter(|i| i.access_count == 0).count();
        assert_eq!(untouched, 2);
        assert!(results[0].last_accessed_at > results[1].last_accessed_at);
    }

    #[tokio::test]
    async fn test_repeated_query_is_deterministic_under_ties() {
        let tiers = tiers();
        for _ in 0..6 {
            insert(&tiers, MemoryTier::Working, vec![0.5, 0.5], 0.5).await;
            insert(&tiers, MemoryTier::Episodic, vec![0.5, 0.5], 0.5).await;
        }
        let engine = RetrievalEngine::new();

        let first: Vec<MemoryId> = engine
            .retrieve(&tiers, &[1.0, 1.0], 12, &TierScope::All, 0.5)
            .await
            .iter()
            .map(|i| i.id)
            .collect();
        let second: Vec<MemoryId> = engine
            .retrieve(&tiers, &[1.0, 1.0], 12, &TierScope::All, 0.5)
            .await
            .iter()
            .map(|i| i.id)
            .collect();

        assert_eq!(first.len(), 12);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_scope_restricts_tiers() {
        let tiers = tiers();
        let working = insert(&tiers, MemoryTier::Working, vec![1.0, 0.0], 0.5).await;
        let episodic = insert(&tiers, MemoryTier::Episodic, vec![1.0, 0.0], 0.5).await;
        let engine = RetrievalEngine::new();

        let results = engine
            .retrieve(&tiers, &[1.0, 0.0], 10, &TierScope::tier(MemoryTier::Episodic), 0.5)
            .await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, episodic);

        let results = engine
            .retrieve(&tiers, &[1.0, 0.0], 10, &TierScope::tier(MemoryTier::Working), 0.5)
            .await;
        assert_eq!(results[0].id, working);
    }

    #[tokio::test]
    async fn test_empty_query_or_zero_limit_returns_nothing() {
        let tiers = tiers();
        insert(&tiers, MemoryTier::Working, vec![1.0, 0.0], 0.5).await;
        let engine = RetrievalEngine::new();

        assert!(engine.retrieve(&tiers, &[], 10, &TierScope::All, 0.1).await.is_empty());
        assert!(
            engine
                .retrieve(&tiers, &[1.0, 0.0], 0, &TierScope::All, 0.1)
                .await
                .is_empty()
        );

        let store = tiers.read(MemoryTier::Working).await;
        assert_eq!(store.iter().next().unwrap().access_count, 0);
    }

    #[tokio::test]
    async fn test_scored_hits_carry_similarity() {
        let tiers = tiers();
        insert(&tiers, MemoryTier::Semantic, unit(0.85), 0.5).await;

        let hits = RetrievalEngine::new()
            .retrieve_scored(&tiers, &[1.0, 0.0], 5, &TierScope::All, 0.1)
            .await;

        assert_eq!(hits.len(), 1);
        assert!((hits[0].similarity - 0.85).abs() < 1e-5);
    }
}
