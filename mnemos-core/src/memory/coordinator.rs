//! Memory coordinator.
//!
//! The root of the memory subsystem and its only public entry point. Owns
//! the tier stores, the scorer and engines, the active configuration and
//! the background maintenance task.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::MemoryConfiguration;
use crate::error::{Error, Result};
use crate::types::{MemoryId, MemoryItem, MemoryStatistics, MemoryTier, TierScope};

use super::consolidation::{ConsolidationReport, ConsolidationScheduler};
use super::decay::{DecayEngine, DecayReport};
use super::maintenance::MaintenanceHandle;
use super::retrieval::{RetrievalEngine, RetrievalHit};
use super::scorer::ImportanceScorer;
use super::store::MemoryTiers;

/// Result of one completed maintenance tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub decay: DecayReport,
    pub consolidation: ConsolidationReport,
    /// Items evicted because a configuration update shrank a tier
    pub capacity_evicted: usize,
    pub completed_at: DateTime<Utc>,
}

impl TickReport {
    /// Check if the tick changed any tier
    pub fn has_changes(&self) -> bool {
        self.decay.forgotten() > 0 || self.consolidation.has_changes() || self.capacity_evicted > 0
    }
}

/// Why a tick did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another tick still holds the tick guard
    InProgress,
    /// Shutdown has begun
    ShuttingDown,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InProgress => write!(f, "previous tick still running"),
            Self::ShuttingDown => write!(f, "shutting down"),
        }
    }
}

/// Outcome of `MemoryCoordinator::tick`
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Completed(TickReport),
    Skipped(SkipReason),
}

impl TickOutcome {
    /// The report, if the tick ran
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped(_) => None,
        }
    }
}

/// Cumulative counters surfaced through statistics
#[derive(Debug, Default)]
struct Counters {
    ticks: AtomicU64,
    forgotten: AtomicU64,
    evicted: AtomicU64,
    promoted: AtomicU64,
}

impl Counters {
    fn add(counter: &AtomicU64, amount: usize) {
        counter.fetch_add(amount as u64, Ordering::Relaxed);
    }
}

/// Tiered memory with decay, consolidation and similarity retrieval.
///
/// Construct one per process and share it as `Arc<MemoryCoordinator>`.
pub struct MemoryCoordinator {
    config: RwLock<Arc<MemoryConfiguration>>,
    tiers: MemoryTiers,
    scorer: ImportanceScorer,
    decay: DecayEngine,
    consolidation: ConsolidationScheduler,
    retrieval: RetrievalEngine,
    /// Held for the duration of a tick
    tick_guard: Mutex<()>,
    shutting_down: AtomicBool,
    counters: Counters,
    last_tick_at: RwLock<Option<DateTime<Utc>>>,
    /// Publishes the tick cadence to the maintenance task
    interval_tx: watch::Sender<Duration>,
    maintenance: Mutex<Option<MaintenanceHandle>>,
}

impl std::fmt::Debug for MemoryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCoordinator")
            .field("shutting_down", &self.shutting_down.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl MemoryCoordinator {
    /// Create a coordinator with empty tiers
    pub fn new(config: MemoryConfiguration) -> Result<Self> {
        config.validate()?;

        let (interval_tx, _) = watch::channel(config.consolidation_interval());
        let tiers = MemoryTiers::new(&config);

        info!(
            working_capacity = config.working_capacity,
            decay_rate = config.decay_rate,
            interval_seconds = config.consolidation_interval_seconds,
            "Memory coordinator created"
        );

        Ok(Self {
            config: RwLock::new(Arc::new(config)),
            tiers,
            scorer: ImportanceScorer::default(),
            decay: DecayEngine::new(),
            consolidation: ConsolidationScheduler::new(),
            retrieval: RetrievalEngine::new(),
            tick_guard: Mutex::new(()),
            shutting_down: AtomicBool::new(false),
            counters: Counters::default(),
            last_tick_at: RwLock::new(None),
            interval_tx,
            maintenance: Mutex::new(None),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingest
    // ─────────────────────────────────────────────────────────────────────────

    /// Score content and store it in the Working tier.
    ///
    /// Only an empty embedding is rejected. A full Working tier evicts its
    /// weakest existing item; the new item is always stored.
    pub async fn ingest(
        &self,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Result<MemoryItem> {
        self.ingest_into(MemoryTier::Working, content.into(), embedding).await
    }

    /// Score content and store it in the Procedural tier
    pub async fn ingest_procedural(
        &self,
        content: impl Into<String>,
        embedding: Vec<f32>,
    ) -> Result<MemoryItem> {
        self.ingest_into(MemoryTier::Procedural, content.into(), embedding).await
    }

    async fn ingest_into(
        &self,
        tier: MemoryTier,
        content: String,
        embedding: Vec<f32>,
    ) -> Result<MemoryItem> {
        if embedding.is_empty() {
            return Err(Error::invalid_input("embedding must not be empty"));
        }

        let config = self.config_snapshot().await;
        let importance = self.scorer.score(&content, &embedding, &config.important_keywords);
        let item = MemoryItem::new(tier, content, embedding, importance);

        let evicted = self.tiers.write(tier).await.insert(item.clone());
        if let Some(victim) = evicted {
            Counters::add(&self.counters.evicted, 1);
            debug!(
                tier = %tier,
                evicted_id = %victim.id,
                evicted_importance = victim.importance,
                "Tier at capacity, evicted weakest item"
            );
        }

        debug!(
            id = %item.id,
            tier = %tier,
            importance = item.importance,
            "Memory ingested"
        );
        Ok(item)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Retrieval
    // ─────────────────────────────────────────────────────────────────────────

    /// Explicit query across all tiers, gated by `enable_active_retrieval`
    pub async fn retrieve_active(&self, query: &[f32]) -> Vec<MemoryItem> {
        let config = self.config_snapshot().await;
        if !config.enable_active_retrieval {
            debug!("Active retrieval disabled");
            return Vec::new();
        }
        self.retrieval
            .retrieve(
                &self.tiers,
                query,
                config.retrieval_limit,
                &TierScope::All,
                config.similarity_threshold,
            )
            .await
    }

    /// Automatic context lookup across all tiers, gated by `enable_context_injection`
    pub async fn retrieve_for_context(&self, query: &[f32]) -> Vec<MemoryItem> {
        let config = self.config_snapshot().await;
        if !config.enable_context_injection {
            debug!("Context injection disabled");
            return Vec::new();
        }
        self.retrieval
            .retrieve(
                &self.tiers,
                query,
                config.retrieval_limit,
                &TierScope::All,
                config.similarity_threshold,
            )
            .await
    }

    /// Ungated query with an explicit limit and scope
    pub async fn retrieve(
        &self,
        query: &[f32],
        limit: usize,
        scope: &TierScope,
    ) -> Vec<MemoryItem> {
        let threshold = self.config_snapshot().await.similarity_threshold;
        self.retrieval
            .retrieve(&self.tiers, query, limit, scope, threshold)
            .await
    }

    /// Like `retrieve`, keeping the similarity of each hit
    pub async fn retrieve_scored(
        &self,
        query: &[f32],
        limit: usize,
        scope: &TierScope,
    ) -> Vec<RetrievalHit> {
        let threshold = self.config_snapshot().await.similarity_threshold;
        self.retrieval
            .retrieve_scored(&self.tiers, query, limit, scope, threshold)
            .await
    }

    /// Copy of one tier's items. Does not record access.
    pub async fn snapshot(&self, tier: MemoryTier) -> Vec<MemoryItem> {
        self.tiers.read(tier).await.all()
    }

    /// Tier currently holding `id`
    pub async fn locate(&self, id: &MemoryId) -> Option<MemoryTier> {
        self.tiers.locate(id).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statistics & removal
    // ─────────────────────────────────────────────────────────────────────────

    /// Snapshot of counts, capacities and counters
    pub async fn get_statistics(&self) -> MemoryStatistics {
        let working = self.tiers.read(MemoryTier::Working).await.statistics();
        let episodic = self.tiers.read(MemoryTier::Episodic).await.statistics();
        let semantic = self.tiers.read(MemoryTier::Semantic).await.statistics();
        let procedural = self.tiers.read(MemoryTier::Procedural).await.statistics();

        MemoryStatistics {
            short_term_count: working.count,
            max_short_term: working.capacity,
            total: working.count + episodic.count + semantic.count + procedural.count,
            working,
            episodic,
            semantic,
            procedural,
            ticks_completed: self.counters.ticks.load(Ordering::Relaxed),
            last_tick_at: *self.last_tick_at.read().await,
            forgotten: self.counters.forgotten.load(Ordering::Relaxed),
            evicted: self.counters.evicted.load(Ordering::Relaxed),
            promoted: self.counters.promoted.load(Ordering::Relaxed),
        }
    }

    /// Empty the Working tier; other tiers are untouched
    pub async fn clear_short_term_memory(&self) -> usize {
        let cleared = self.tiers.write(MemoryTier::Working).await.clear();
        info!(cleared = cleared, "Short-term memory cleared");
        cleared
    }

    /// Empty every tier
    pub async fn clear_all(&self) -> usize {
        let mut working = self.tiers.write(MemoryTier::Working).await;
        let mut episodic = self.tiers.write(MemoryTier::Episodic).await;
        let mut semantic = self.tiers.write(MemoryTier::Semantic).await;
        let mut procedural = self.tiers.write(MemoryTier::Procedural).await;

        let cleared = working.clear() + episodic.clear() + semantic.clear() + procedural.clear();
        info!(cleared = cleared, "All memory tiers cleared");
        cleared
    }

    /// Remove an item from whichever tier holds it. Unknown ids return false.
    pub async fn forget(&self, id: &MemoryId) -> bool {
        for tier in MemoryTier::ALL {
            if self.tiers.write(tier).await.remove(id).is_some() {
                debug!(id = %id, tier = %tier, "Memory forgotten on request");
                return true;
            }
        }
        false
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the configuration.
    ///
    /// Invalid configurations are rejected and the current one stays
    /// active. Capacity changes are applied on the next tick. The new
    /// interval is published while the configuration lock is held, so the
    /// maintenance timer always follows the active configuration.
    pub async fn update_configuration(&self, config: MemoryConfiguration) -> Result<()> {
        if let Err(e) = config.validate() {
            warn!(field = %e.field(), error = %e, "Rejected configuration update");
            return Err(e.into());
        }

        let interval = config.consolidation_interval();
        let mut active = self.config.write().await;
        *active = Arc::new(config);
        self.interval_tx.send_if_modified(|current| {
            if *current == interval {
                return false;
            }
            *current = interval;
            true
        });
        drop(active);

        info!(interval_seconds = interval.as_secs_f64(), "Configuration updated");
        Ok(())
    }

    /// Copy of the active configuration
    pub async fn get_configuration(&self) -> MemoryConfiguration {
        self.config_snapshot().await.as_ref().clone()
    }

    async fn config_snapshot(&self) -> Arc<MemoryConfiguration> {
        Arc::clone(&*self.config.read().await)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────────

    /// Run one decay and consolidation cycle now.
    ///
    /// Skipped if shutdown has begun or another tick is still running.
    pub async fn tick(&self) -> TickOutcome {
        if self.is_shutting_down() {
            warn!(reason = %SkipReason::ShuttingDown, "Tick skipped");
            return TickOutcome::Skipped(SkipReason::ShuttingDown);
        }

        let Ok(_guard) = self.tick_guard.try_lock() else {
            warn!(reason = %SkipReason::InProgress, "Tick skipped");
            return TickOutcome::Skipped(SkipReason::InProgress);
        };

        let config = self.config_snapshot().await;

        let capacity_evicted = self.tiers.apply_capacities(&config).await.len();
        let decay = self.decay.tick(&self.tiers, &config).await;
        let consolidation = self.consolidation.run_cycle(&self.tiers, &config).await;
        let completed_at = Utc::now();

        Counters::add(&self.counters.ticks, 1);
        Counters::add(&self.counters.forgotten, decay.forgotten() + consolidation.dropped);
        Counters::add(&self.counters.evicted, capacity_evicted + consolidation.evicted);
        Counters::add(
            &self.counters.promoted,
            consolidation.promoted_to_episodic + consolidation.promoted_to_semantic,
        );
        *self.last_tick_at.write().await = Some(completed_at);

        info!(
            forgotten = decay.forgotten(),
            promoted_to_episodic = consolidation.promoted_to_episodic,
            promoted_to_semantic = consolidation.promoted_to_semantic,
            dropped = consolidation.dropped,
            evicted = capacity_evicted + consolidation.evicted,
            errors = consolidation.errors.len(),
            "Maintenance tick completed"
        );

        TickOutcome::Completed(TickReport {
            decay,
            consolidation,
            capacity_evicted,
            completed_at,
        })
    }

    /// Start the background maintenance task. Starting twice is a no-op.
    pub async fn start_maintenance(self: &Arc<Self>) -> Result<()> {
        if self.is_shutting_down() {
            return Err(Error::ShuttingDown);
        }

        let mut maintenance = self.maintenance.lock().await;
        if maintenance.is_some() {
            debug!("Maintenance task already running");
            return Ok(());
        }

        *maintenance = Some(MaintenanceHandle::spawn(
            Arc::downgrade(self),
            self.interval_tx.subscribe(),
        ));
        Ok(())
    }

    /// Whether the background task is running
    pub async fn is_maintenance_running(&self) -> bool {
        self.maintenance
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop background work.
    ///
    /// A tick in progress finishes, no new tick starts and the background
    /// task is joined before this returns.
    pub async fn shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            debug!("Shutdown already requested");
        }

        let handle = self.maintenance.lock().await.take();
        if let Some(handle) = handle {
            handle.stop().await;
        }

        // Wait out a tick started through `tick()` directly
        let _guard = self.tick_guard.lock().await;
        info!("Memory coordinator shut down");
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use tokio::task::JoinSet;

    use crate::memory::retrieval::rank_order;
    use crate::memory::store::eviction_order;

    fn coordinator() -> MemoryCoordinator {
        MemoryCoordinator::new(MemoryConfiguration::default()).unwrap()
    }

    fn words(n: usize) -> String {
        vec!["note"; n].join(" ")
    }

    /// Unit vector at `seed` degrees
    fn embedding(seed: usize) -> Vec<f32> {
        let angle = (seed % 360) as f32 * std::f32::consts::PI / 180.0;
        vec![angle.cos(), angle.sin()]
    }

    async fn join_all(mut tasks: JoinSet<()>) {
        let all = async {
            while let Some(result) = tasks.join_next().await {
                result.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(60), all)
            .await
            .expect("concurrent operations did not finish");
    }

    #[tokio::test]
    async fn test_new_rejects_invalid_configuration() {
        let config = MemoryConfiguration::default().with_decay(0.5, 0.1);
        let err = MemoryCoordinator::new(config).unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_ingest_rejects_empty_embedding() {
        let coordinator = coordinator();
        let err = coordinator.ingest("hello", Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(coordinator.get_statistics().await.total, 0);
    }

    #[tokio::test]
    async fn test_scenario_a_capacity_500_evicts_lowest_originals() {
        let config = MemoryConfiguration::default().with_capacities(500, 10_000, 50_000, 1_000);
        let coordinator = MemoryCoordinator::new(config).unwrap();

        let mut originals = Vec::new();
        for i in 0..500 {
            let item = coordinator.ingest(words(1 + i % 39), vec![1.0, 0.0]).await.unwrap();
            originals.push(item);
        }
        originals.sort_by(eviction_order);
        let mut expected: Vec<MemoryId> = originals.iter().take(100).map(|i| i.id).collect();

        for _ in 0..100 {
            let item = coordinator
                .ingest(format!("urgent {}", words(40)), vec![0.0, 1.0])
                .await
                .unwrap();
            assert!(item.importance > originals[499].importance);
        }

        let stats = coordinator.get_statistics().await;
        assert_eq!(stats.short_term_count, 500);
        assert_eq!(stats.evicted, 100);

        let remaining = coordinator.snapshot(MemoryTier::Working).await;
        let mut evicted: Vec<MemoryId> = originals
            .iter()
            .map(|i| i.id)
            .filter(|id| !remaining.iter().any(|r| &r.id == id))
            .collect();
        evicted.sort();
        expected.sort();
        assert_eq!(evicted, expected);
    }

    #[tokio::test]
    async fn test_scenario_d_context_injection_disabled() {
        let mut config = MemoryConfiguration::default();
        config.enable_context_injection = false;
        let coordinator = MemoryCoordinator::new(config).unwrap();
        coordinator.ingest("stored fact", vec![1.0, 0.0]).await.unwrap();

        assert!(coordinator.retrieve_for_context(&[1.0, 0.0]).await.is_empty());
        let untouched = coordinator.snapshot(MemoryTier::Working).await;
        assert_eq!(untouched[0].access_count, 0);

        assert_eq!(coordinator.retrieve_active(&[1.0, 0.0]).await.len(), 1);
    }

    #[tokio::test]
    async fn test_active_retrieval_disabled() {
        let mut config = MemoryConfiguration::default();
        config.enable_active_retrieval = false;
        let coordinator = MemoryCoordinator::new(config).unwrap();
        coordinator.ingest("stored fact", vec![1.0, 0.0]).await.unwrap();

        assert!(coordinator.retrieve_active(&[1.0, 0.0]).await.is_empty());
        assert_eq!(coordinator.retrieve_for_context(&[1.0, 0.0]).await.len(), 1);
    }

    #[tokio::test]
    async fn test_scenario_e_keyword_scores_higher() {
        let coordinator = coordinator();
        let plain = coordinator.ingest("buy milk on the way home", vec![0.2, 0.7]).await.unwrap();
        let keyword = coordinator
            .ingest("remember to buy milk on the way home", vec![0.2, 0.7])
            .await
            .unwrap();

        assert!(keyword.importance > plain.importance);
    }

    #[tokio::test]
    async fn test_clear_short_term_leaves_other_tiers() {
        let coordinator = coordinator();
        coordinator.ingest("a", vec![1.0]).await.unwrap();
        coordinator.ingest("b", vec![1.0]).await.unwrap();
        coordinator.ingest_procedural("how to deploy", vec![1.0]).await.unwrap();

        assert_eq!(coordinator.clear_short_term_memory().await, 2);

        let stats = coordinator.get_statistics().await;
        assert_eq!(stats.short_term_count, 0);
        assert_eq!(stats.procedural.count, 1);
        assert_eq!(stats.total, 1);

        assert_eq!(coordinator.clear_all().await, 1);
        assert_eq!(coordinator.get_statistics().await.total, 0);
    }

    #[tokio::test]
    async fn test_promoted_item_found_in_new_tier_only() {
        let coordinator = coordinator();
        let durable = coordinator
            .ingest(format!("urgent {}", words(40)), vec![1.0, 0.0])
            .await
            .unwrap();

        let outcome = coordinator.tick().await;
        let report = outcome.report().unwrap();
        assert_eq!(report.consolidation.promoted_to_episodic, 1);
        assert_eq!(coordinator.locate(&durable.id).await, Some(MemoryTier::Episodic));

        let episodic = coordinator
            .retrieve(&[1.0, 0.0], 5, &TierScope::tier(MemoryTier::Episodic))
            .await;
        assert_eq!(episodic.len(), 1);
        assert_eq!(episodic[0].id, durable.id);
        assert_eq!(episodic[0].tier, MemoryTier::Episodic);

        let working = coordinator
            .retrieve(&[1.0, 0.0], 5, &TierScope::tier(MemoryTier::Working))
            .await;
        assert!(working.is_empty());

        let stats = coordinator.get_statistics().await;
        assert_eq!(stats.promoted, 1);
        assert_eq!(stats.ticks_completed, 1);
        assert!(stats.last_tick_at.is_some());
    }

    #[tokio::test]
    async fn test_rejected_update_keeps_prior_configuration() {
        let coordinator = coordinator();
        let before = coordinator.get_configuration().await;

        let mut invalid = before.clone();
        invalid.similarity_threshold = 0.95;
        let err = coordinator.update_configuration(invalid).await.unwrap_err();

        assert!(err.is_config());
        assert_eq!(coordinator.get_configuration().await, before);
    }

    #[tokio::test]
    async fn test_capacity_change_applies_on_next_tick() {
        let coordinator = coordinator();
        for i in 0..20 {
            coordinator.ingest(format!("note {i}"), vec![1.0, 0.0]).await.unwrap();
        }

        let shrunk = MemoryConfiguration::default().with_capacities(10, 10_000, 50_000, 1_000);
        coordinator.update_configuration(shrunk).await.unwrap();
        assert_eq!(coordinator.get_statistics().await.short_term_count, 20);

        let outcome = coordinator.tick().await;
        assert_eq!(outcome.report().unwrap().capacity_evicted, 10);

        let stats = coordinator.get_statistics().await;
        assert_eq!(stats.short_term_count, 10);
        assert_eq!(stats.max_short_term, 10);
    }

    #[tokio::test]
    async fn test_forget_is_idempotent() {
        let coordinator = coordinator();
        let item = coordinator.ingest("temporary", vec![1.0]).await.unwrap();

        assert!(coordinator.forget(&item.id).await);
        assert!(!coordinator.forget(&item.id).await);
        assert!(coordinator.locate(&item.id).await.is_none());
    }

    #[tokio::test]
    async fn test_tick_skipped_while_another_runs() {
        let coordinator = coordinator();
        let _held = coordinator.tick_guard.lock().await;

        assert_eq!(coordinator.tick().await, TickOutcome::Skipped(SkipReason::InProgress));
        assert_eq!(coordinator.get_statistics().await.ticks_completed, 0);
    }

    #[tokio::test]
    async fn test_shutdown_skips_ticks_and_blocks_restart() {
        let coordinator = Arc::new(coordinator());
        coordinator.start_maintenance().await.unwrap();
        assert!(coordinator.is_maintenance_running().await);

        coordinator.shutdown().await;

        assert!(!coordinator.is_maintenance_running().await);
        assert_eq!(coordinator.tick().await, TickOutcome::Skipped(SkipReason::ShuttingDown));
        assert!(matches!(
            coordinator.start_maintenance().await,
            Err(Error::ShuttingDown)
        ));
    }

    #[tokio::test]
    async fn test_retrieval_during_promotion_sees_each_item_once() {
        let coordinator = Arc::new(coordinator());
        let durable = coordinator
            .ingest(format!("urgent {}", words(40)), vec![1.0, 0.0])
            .await
            .unwrap();
        let plain = coordinator.ingest("plain note", vec![1.0, 0.05]).await.unwrap();
        coordinator.ingest("unrelated", vec![0.0, 1.0]).await.unwrap();

        // Park the query behind a held Episodic lock, then queue a tick
        // that wants to move `durable` out of Working.
        let episodic = coordinator.tiers.write(MemoryTier::Episodic).await;

        let reader = Arc::clone(&coordinator);
        let query =
            tokio::spawn(async move { reader.retrieve(&[1.0, 0.0], 2, &TierScope::All).await });
        while coordinator.tiers.store(MemoryTier::Working).try_read().is_ok() {
            tokio::task::yield_now().await;
        }

        let ticker = Arc::clone(&coordinator);
        let tick = tokio::spawn(async move { ticker.tick().await });
        tokio::task::yield_now().await;
        drop(episodic);

        let results = query.await.unwrap();
        let outcome = tick.await.unwrap();

        let ids: Vec<MemoryId> = results.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![durable.id, plain.id]);
        assert!(results.iter().all(|i| i.tier == MemoryTier::Working));

        let report = outcome.report().unwrap();
        assert!(report.consolidation.promoted.contains(&(durable.id, MemoryTier::Episodic)));
        assert_eq!(coordinator.locate(&durable.id).await, Some(MemoryTier::Episodic));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_operations_keep_invariants() {
        let config = MemoryConfiguration::default().with_capacities(20, 1_000, 1_000, 100);
        let coordinator = Arc::new(MemoryCoordinator::new(config).unwrap());
        let mut tasks = JoinSet::new();

        for writer in 0..4 {
            let memory = Arc::clone(&coordinator);
            tasks.spawn(async move {
                for i in 0..200 {
                    let seed = writer * 1000 + i;
                    let content = if i % 5 == 0 {
                        format!("urgent {}", words(40))
                    } else {
                        format!("note {seed}")
                    };
                    let item = if i % 7 == 0 {
                        memory.ingest_procedural(content, embedding(seed)).await
                    } else {
                        memory.ingest(content, embedding(seed)).await
                    }
                    .unwrap();
                    if i % 11 == 0 {
                        memory.forget(&item.id).await;
                    }
                }
            });
        }

        for reader in 0..3 {
            let memory = Arc::clone(&coordinator);
            tasks.spawn(async move {
                for i in 0..200 {
                    let hits = memory
                        .retrieve_scored(&embedding(reader * 7 + i), 5, &TierScope::All)
                        .await;
                    assert!(hits.len() <= 5);

                    let unique: HashSet<MemoryId> = hits.iter().map(|h| h.item.id).collect();
                    assert_eq!(unique.len(), hits.len(), "item returned twice");
                    assert!(hits
                        .windows(2)
                        .all(|pair| rank_order(&pair[0], &pair[1]) != std::cmp::Ordering::Greater));

                    memory.retrieve_active(&embedding(i)).await;
                }
            });
        }

        let memory = Arc::clone(&coordinator);
        tasks.spawn(async move {
            for _ in 0..50 {
                memory.tick().await;
                tokio::task::yield_now().await;
            }
        });

        let memory = Arc::clone(&coordinator);
        tasks.spawn(async move {
            for i in 0..30 {
                if i % 10 == 9 {
                    memory.clear_all().await;
                } else {
                    memory.clear_short_term_memory().await;
                }
                tokio::task::yield_now().await;
            }
        });

        let memory = Arc::clone(&coordinator);
        tasks.spawn(async move {
            for _ in 0..100 {
                let stats = memory.get_statistics().await;
                for tier in [&stats.working, &stats.episodic, &stats.semantic, &stats.procedural] {
                    assert!(tier.count <= tier.capacity);
                }
                tokio::task::yield_now().await;
            }
        });

        join_all(tasks).await;

        let stats = coordinator.get_statistics().await;
        assert!(stats.working.count <= 20);
        assert!(stats.procedural.count <= 100);
        let counted = stats.working.count
            + stats.episodic.count
            + stats.semantic.count
            + stats.procedural.count;
        assert_eq!(stats.total, counted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cleared_items_do_not_reappear() {
        let coordinator = Arc::new(coordinator());
        let mut before = HashSet::new();
        for i in 0..100 {
            let item = coordinator.ingest(format!("note {i}"), embedding(i)).await.unwrap();
            before.insert(item.id);
        }

        let mut tasks = JoinSet::new();
        for writer in 0..3 {
            let memory = Arc::clone(&coordinator);
            tasks.spawn(async move {
                for i in 0..100 {
                    let seed = 1000 + writer * 100 + i;
                    memory.ingest(format!("note {seed}"), embedding(seed)).await.unwrap();
                }
            });
        }

        let memory = Arc::clone(&coordinator);
        tasks.spawn(async move {
            for i in 0..100 {
                memory.retrieve(&embedding(i), 10, &TierScope::All).await;
            }
        });

        let memory = Arc::clone(&coordinator);
        tasks.spawn(async move {
            for _ in 0..20 {
                memory.tick().await;
                tokio::task::yield_now().await;
            }
        });

        coordinator.clear_short_term_memory().await;

        for _ in 0..20 {
            let working = coordinator.snapshot(MemoryTier::Working).await;
            assert!(working.iter().all(|item| !before.contains(&item.id)));
            tokio::task::yield_now().await;
        }

        join_all(tasks).await;

        let working = coordinator.snapshot(MemoryTier::Working).await;
        assert!(working.iter().all(|item| !before.contains(&item.id)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_interval_follows_active_configuration_under_concurrent_updates() {
        let coordinator = Arc::new(coordinator());
        let mut tasks = JoinSet::new();

        for i in 0..16 {
            let memory = Arc::clone(&coordinator);
            tasks.spawn(async move {
                let mut config = MemoryConfiguration::default();
                config.consolidation_interval_seconds = 300.0 + 60.0 * i as f64;
                memory.update_configuration(config).await.unwrap();
            });
        }

        join_all(tasks).await;

        let active = coordinator.get_configuration().await.consolidation_interval();
        assert_eq!(*coordinator.interval_tx.borrow(), active);
    }
}
