//! mnemos-core - Tiered memory subsystem
//!
//! This crate provides the memory engine used by the mnemos CLI and by any
//! assistant that embeds it:
//!
//! - **config**: Configuration surface, TOML loading and validation
//! - **memory**: Tier stores, decay, consolidation, retrieval and the coordinator
//! - **types**: Memory items, tiers and statistics
//! - **error**: Error types

pub mod config;
pub mod error;
pub mod memory;
pub mod types;

// Re-export commonly used types
pub use config::{ConfigValidationError, ConsolidationPolicy, MemoryConfiguration};
pub use error::{Error, Result};
pub use memory::{MemoryCoordinator, TickOutcome};
pub use types::{MemoryId, MemoryItem, MemoryStatistics, MemoryTier, TierScope};
