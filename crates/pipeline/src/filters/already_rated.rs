//! Filter to remove items the user already rated in training.
//!
//! Always the first stage of the Recommender's pipeline.

use crate::traits::Filter;
use crate::types::{ScoredItem, UserHistory};
use anyhow::Result;

/// Removes candidates present in `UserHistory::rated_items`.
pub struct AlreadyRatedFilter;

impl Filter for AlreadyRatedFilter {
    fn name(&self) -> &str {
        "AlreadyRatedFilter"
    }

    fn apply(&self, candidates: Vec<ScoredItem>, history: &UserHistory) -> Result<Vec<ScoredItem>> {
        Ok(candidates
            .into_iter()
            .filter(|candidate| !history.rated_items.contains(&candidate.item_id))
            .collect())
    }
}
