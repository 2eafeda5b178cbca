//! Filter to drop low predicted scores.
//!
//! Optional stage; useful when callers would rather return fewer than K
//! items than recommend something the model expects the user to dislike.

use crate::traits::Filter;
use crate::types::{ScoredItem, UserHistory};
use anyhow::{Result, bail};

/// Keeps candidates whose score is at least `min_score`.
///
/// Non-finite scores never pass.
pub struct MinimumScoreFilter {
    min_score: f64,
}

impl MinimumScoreFilter {
    pub fn new(min_score: f64) -> Result<Self> {
        if !min_score.is_finite() {
            bail!("Minimum score must be finite, got {}", min_score);
        }
        Ok(Self { min_score })
    }
}

impl Filter for MinimumScoreFilter {
    fn name(&self) -> &str {
        "MinimumScoreFilter"
    }

    fn apply(&self, candidates: Vec<ScoredItem>, _history: &UserHistory) -> Result<Vec<ScoredItem>> {
        Ok(candidates
            .into_iter()
            .filter(|candidate| candidate.score.is_finite() && candidate.score >= self.min_score)
            .collect())
    }
}
