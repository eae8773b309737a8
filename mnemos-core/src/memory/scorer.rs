//! Initial importance scoring.
//!
//! The scorer is a pure function over its inputs. It never errors: content
//! with no extractable signal receives a conservative default so ingest is
//! never blocked.

use std::collections::BTreeSet;

/// Fixed additive bonus for content containing an important keyword.
pub const DEFAULT_KEYWORD_BONUS: f64 = 0.25;

/// Score used when no signal can be extracted.
pub const DEFAULT_SCORE: f64 = 0.3;

/// Word count at which the length signal saturates.
const LENGTH_SATURATION_WORDS: f64 = 40.0;

const LENGTH_BASE: f64 = 0.2;
const LENGTH_WEIGHT: f64 = 0.4;
const EMBEDDING_SIGNAL_BONUS: f64 = 0.05;

/// Computes the importance of new content
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportanceScorer {
    keyword_bonus: f64,
    default_score: f64,
}

impl Default for ImportanceScorer {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORD_BONUS, DEFAULT_SCORE)
    }
}

impl ImportanceScorer {
    /// Create a scorer with a custom keyword bonus and fallback score
    pub fn new(keyword_bonus: f64, default_score: f64) -> Self {
        Self {
            keyword_bonus: keyword_bonus.clamp(0.0, 1.0),
            default_score: default_score.clamp(0.0, 1.0),
        }
    }

    /// Score content for ingest. Result is always in [0, 1].
    pub fn score(&self, content: &str, embedding: &[f32], keywords: &BTreeSet<String>) -> f64 {
        let mut score = self.base_score(content, embedding);

        if Self::contains_keyword(content, keywords) {
            score += self.keyword_bonus;
        }

        score.clamp(0.0, 1.0)
    }

    /// Base score from content features, before any keyword bonus
    pub fn base_score(&self, content: &str, embedding: &[f32]) -> f64 {
        let words = content.split_whitespace().count();
        if words == 0 {
            return self.default_score;
        }

        let length_signal = (words as f64 / LENGTH_SATURATION_WORDS).min(1.0);
        let mut score = LENGTH_BASE + LENGTH_WEIGHT * length_signal;

        if has_semantic_signal(embedding) {
            score += EMBEDDING_SIGNAL_BONUS;
        }

        score
    }

    /// Case-insensitive substring match against the keyword allow-list
    pub fn contains_keyword(content: &str, keywords: &BTreeSet<String>) -> bool {
        if keywords.is_empty() {
            return false;
        }
        let lowered = content.to_lowercase();
        keywords
            .iter()
            .filter(|k| !k.is_empty())
            .any(|k| lowered.contains(&k.to_lowercase()))
    }
}

fn has_semantic_signal(embedding: &[f32]) -> bool {
    !embedding.is_empty()
        && embedding.iter().all(|x| x.is_finite())
        && embedding.iter().any(|x| *x != 0.0)
}
