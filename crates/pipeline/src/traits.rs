//! Core traits for the recommendation pipeline.

use crate::types::{ScoredItem, UserHistory};
use anyhow::Result;

/// A stage that removes scored candidates before top-K selection.
///
/// Filters take ownership of the candidates and return the survivors in
/// their original order.
pub trait Filter: Send + Sync {
    /// Returns the name of this filter (for logging/debugging)
    fn name(&self) -> &str;

    fn apply(&self, candidates: Vec<ScoredItem>, history: &UserHistory) -> Result<Vec<ScoredItem>>;
}
