//! Tiered memory for a personal assistant.
//!
//! Four tiers of increasing persistence, maintained by periodic decay and
//! consolidation:
//!
//! - **Working**: recent content, small and fast to turn over
//! - **Episodic**: items that were repeated or stayed important
//! - **Semantic**: items that stayed important across several cycles
//! - **Procedural**: how-to knowledge, ingested directly
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        MemoryCoordinator                         │
//! │                                                                  │
//! │  ingest ──▶ ImportanceScorer ──▶ Working                         │
//! │                                                                  │
//! │  ┌─────────┐     ┌──────────┐     ┌──────────┐   ┌────────────┐  │
//! │  │ Working │────▶│ Episodic │────▶│ Semantic │   │ Procedural │  │
//! │  └─────────┘     └──────────┘     └──────────┘   └────────────┘  │
//! │        ▲   ConsolidationScheduler                                │
//! │        │   DecayEngine (all tiers)                               │
//! │   maintenance task ── tick every consolidation interval          │
//! │                                                                  │
//! │  retrieve* ──▶ RetrievalEngine (cosine similarity, top-K)        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use mnemos_core::memory::MemoryCoordinator;
//! use mnemos_core::MemoryConfiguration;
//!
//! # async fn example() -> mnemos_core::Result<()> {
//! let memory = Arc::new(MemoryCoordinator::new(MemoryConfiguration::default())?);
//! memory.start_maintenance().await?;
//!
//! memory.ingest("Remember: the user prefers metric units", vec![0.1, 0.7, 0.2]).await?;
//! let relevant = memory.retrieve_for_context(&[0.1, 0.6, 0.3]).await;
//!
//! memory.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod consolidation;
mod coordinator;
mod decay;
mod maintenance;
mod retrieval;
mod scorer;
mod store;

pub use consolidation::{
    promote_one, qualifies_for_episodic, ConsolidationReport, ConsolidationScheduler,
    PromotionOutcome,
};
pub use coordinator::{MemoryCoordinator, SkipReason, TickOutcome, TickReport};
pub use decay::{decay_store, DecayEngine, DecayReport};
pub use maintenance::MaintenanceHandle;
pub use retrieval::{cosine_similarity, rank_order, RetrievalEngine, RetrievalHit};
pub use scorer::{ImportanceScorer, DEFAULT_KEYWORD_BONUS, DEFAULT_SCORE};
pub use store::{capacity_for, eviction_order, MemoryStore, MemoryTiers};
