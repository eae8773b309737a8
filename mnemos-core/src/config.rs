//! Memory Configuration
//!
//! Defines the configuration surface of the memory subsystem. A single
//! `MemoryConfiguration` is loaded at startup and passed to the
//! coordinator; updates go through `MemoryCoordinator::update_configuration`
//! which validates before swapping.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// Memory subsystem configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfiguration {
    /// Working (short-term) tier capacity (10..=500, default: 100)
    pub working_capacity: usize,

    /// Episodic tier capacity (1000..=50000, default: 10000)
    pub episodic_capacity: usize,

    /// Semantic tier capacity (1000..=100000, default: 50000)
    pub semantic_capacity: usize,

    /// Procedural tier capacity (100..=5000, default: 1000)
    pub procedural_capacity: usize,

    /// Per-tick multiplicative decay factor, (0.9, 1.0] (default: 0.95)
    pub decay_rate: f64,

    /// Items below this importance after decay are forgotten, [0, 0.5] (default: 0.1)
    pub min_importance: f64,

    /// Cadence of the decay/consolidation tick, [300, 7200] (default: 3600)
    pub consolidation_interval_seconds: f64,

    /// Default max result count for retrieval, [1, 50] (default: 10)
    pub retrieval_limit: usize,

    /// Minimum cosine similarity for retrieval, [0.1, 0.9] (default: 0.7)
    pub similarity_threshold: f64,

    /// Gate for explicit queries (default: true)
    pub enable_active_retrieval: bool,

    /// Gate for automatic context injection (default: true)
    pub enable_context_injection: bool,

    /// Content containing any of these receives an importance boost
    #[serde(deserialize_with = "deserialize_keywords")]
    pub important_keywords: BTreeSet<String>,

    /// Promotion thresholds between tiers
    pub consolidation: ConsolidationPolicy,
}

impl Default for MemoryConfiguration {
    fn default() -> Self {
        Self {
            working_capacity: 100,
            episodic_capacity: 10_000,
            semantic_capacity: 50_000,
            procedural_capacity: 1_000,
            decay_rate: 0.95,
            min_importance: 0.1,
            consolidation_interval_seconds: 3600.0,
            retrieval_limit: 10,
            similarity_threshold: 0.7,
            enable_active_retrieval: true,
            enable_context_injection: true,
            important_keywords: normalize_keywords([
                "important",
                "remember",
                "urgent",
                "always",
                "never",
            ]),
            consolidation: ConsolidationPolicy::default(),
        }
    }
}

/// Thresholds that drive tier promotion during consolidation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationPolicy {
    /// Working items accessed more than this many times are promoted (default: 2)
    pub repetition_threshold: u32,

    /// Working items whose importance stays above this after decay are promoted (default: 0.6)
    pub durable_importance: f64,

    /// Episodic items above this importance count a stable cycle (default: 0.5)
    pub semantic_durability: f64,

    /// Stable cycles an Episodic item needs before moving to Semantic (default: 3)
    pub semantic_min_cycles: u32,
}

impl Default for ConsolidationPolicy {
    fn default() -> Self {
        Self {
            repetition_threshold: 2,
            durable_importance: 0.6,
            semantic_durability: 0.5,
            semantic_min_cycles: 3,
        }
    }
}

impl MemoryConfiguration {
    /// Parse a configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Parse(e.to_string()))
    }

    /// Set the capacity of all four tiers
    pub fn with_capacities(
        mut self,
        working: usize,
        episodic: usize,
        semantic: usize,
        procedural: usize,
    ) -> Self {
        self.working_capacity = working;
        self.episodic_capacity = episodic;
        self.semantic_capacity = semantic;
        self.procedural_capacity = procedural;
        self
    }

    /// Set decay rate and forgetting floor
    pub fn with_decay(mut self, decay_rate: f64, min_importance: f64) -> Self {
        self.decay_rate = decay_rate;
        self.min_importance = min_importance;
        self
    }

    /// Set retrieval limit and similarity threshold
    pub fn with_retrieval(mut self, limit: usize, similarity_threshold: f64) -> Self {
        self.retrieval_limit = limit;
        self.similarity_threshold = similarity_threshold;
        self
    }

    /// Replace the keyword allow-list (normalized to lowercase)
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.important_keywords = normalize_keywords(keywords);
        self
    }

    /// Set the consolidation policy
    pub fn with_consolidation(mut self, policy: ConsolidationPolicy) -> Self {
        self.consolidation = policy;
        self
    }

    /// Tick cadence as a `Duration`
    pub fn consolidation_interval(&self) -> Duration {
        Duration::from_secs_f64(self.consolidation_interval_seconds)
    }

    /// Validate the configuration.
    ///
    /// Out-of-range values are rejected, never clamped.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        check_range("working_capacity", self.working_capacity, 10, 500)?;
        check_range("episodic_capacity", self.episodic_capacity, 1_000, 50_000)?;
        check_range("semantic_capacity", self.semantic_capacity, 1_000, 100_000)?;
        check_range("procedural_capacity", self.procedural_capacity, 100, 5_000)?;
        check_range("retrieval_limit", self.retrieval_limit, 1, 50)?;

        if !(self.decay_rate.is_finite() && self.decay_rate > 0.9 && self.decay_rate <= 1.0) {
            return Err(ConfigValidationError::out_of_range(
                "decay_rate",
                self.decay_rate,
                "(0.9, 1.0]",
            ));
        }
        check_unit_range("min_importance", self.min_importance, 0.0, 0.5)?;
        check_unit_range(
            "consolidation_interval_seconds",
            self.consolidation_interval_seconds,
            300.0,
            7200.0,
        )?;
        check_unit_range("similarity_threshold", self.similarity_threshold, 0.1, 0.9)?;

        if self.important_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ConfigValidationError::InvalidValue {
                field: "important_keywords".into(),
                message: "keywords must not be blank".into(),
            });
        }

        self.consolidation.validate()
    }
}

impl ConsolidationPolicy {
    /// Validate the policy thresholds
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        check_unit_range("consolidation.durable_importance", self.durable_importance, 0.0, 1.0)?;
        check_unit_range(
            "consolidation.semantic_durability",
            self.semantic_durability,
            0.0,
            1.0,
        )?;
        if self.semantic_min_cycles == 0 {
            return Err(ConfigValidationError::InvalidValue {
                field: "consolidation.semantic_min_cycles".into(),
                message: "must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("{field} = {value} is out of range, expected {expected}")]
    OutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigValidationError {
    fn out_of_range(field: &str, value: impl ToString, expected: &str) -> Self {
        Self::OutOfRange {
            field: field.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Name of the offending field
    pub fn field(&self) -> &str {
        match self {
            Self::OutOfRange { field, .. } | Self::InvalidValue { field, .. } => field,
        }
    }
}

fn check_range(
    field: &str,
    value: usize,
    min: usize,
    max: usize,
) -> std::result::Result<(), ConfigValidationError> {
    if value < min || value > max {
        return Err(ConfigValidationError::out_of_range(
            field,
            value,
            &format!("[{}, {}]", min, max),
        ));
    }
    Ok(())
}

fn check_unit_range(
    field: &str,
    value: f64,
    min: f64,
    max: f64,
) -> std::result::Result<(), ConfigValidationError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ConfigValidationError::out_of_range(
            field,
            value,
            &format!("[{}, {}]", min, max),
        ));
    }
    Ok(())
}

/// Trim, lowercase and drop empty keywords
pub fn normalize_keywords<I, S>(keywords: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    keywords
        .into_iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn deserialize_keywords<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(normalize_keywords(raw))
}
