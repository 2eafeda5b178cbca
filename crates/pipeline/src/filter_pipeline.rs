//! Ordered chain of filters applied to one user's scored candidates.

use crate::filters::AlreadyRatedFilter;
use crate::traits::Filter;
use crate::types::{ScoredItem, UserHistory};
use anyhow::{Context, Result};

/// Chains filters together, builder style.
///
/// ```ignore
/// let pipeline = FilterPipeline::new()
///     .add_filter(AlreadyRatedFilter)
///     .add_filter(MinimumScoreFilter::new(3.0)?);
///
/// let kept = pipeline.apply(candidates, &history)?;
/// ```
pub struct FilterPipeline {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// The pipeline every Recommender starts from: already-rated exclusion only
    pub fn standard() -> Self {
        Self::new().add_filter(AlreadyRatedFilter)
    }

    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Apply every filter in insertion order
    pub fn apply(&self, candidates: Vec<ScoredItem>, history: &UserHistory) -> Result<Vec<ScoredItem>> {
        let mut current = candidates;
        for filter in &self.filters {
            let before = current.len();
            current = filter
                .apply(current, history)
                .with_context(|| format!("{} failed for user {}", filter.name(), history.user_id))?;
            tracing::trace!(
                filter = filter.name(),
                user_id = history.user_id,
                before,
                after = current.len(),
                "Filter applied"
            );
        }
        Ok(current)
    }
}

impl Default for FilterPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::MinimumScoreFilter;

    #[test]
    fn test_empty_pipeline() {
        let pipeline = FilterPipeline::new();
        let history = UserHistory::new(1);

        let candidates = vec![ScoredItem::new(1, 0.9), ScoredItem::new(2, 0.8)];

        let filtered = pipeline.apply(candidates, &history).unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(pipeline.is_empty());
    }

    #[test]
    fn test_standard_pipeline_excludes_rated() {
        let mut history = UserHistory::new(1);
        history.rated_items.insert(1);

        let candidates = vec![ScoredItem::new(1, 0.9), ScoredItem::new(2, 0.8)];

        let filtered = FilterPipeline::standard().apply(candidates, &history).unwrap();
        assert_eq!(filtered, vec![ScoredItem::new(2, 0.8)]);
    }

    #[test]
    fn test_filters_compose_in_order() {
        let mut history = UserHistory::new(1);
        history.rated_items.insert(3);

        let pipeline = FilterPipeline::standard().add_filter(MinimumScoreFilter::new(2.0).unwrap());
        assert_eq!(pipeline.len(), 2);

        let candidates = vec![
            ScoredItem::new(1, 1.5),
            ScoredItem::new(2, 2.5),
            ScoredItem::new(3, 4.0),
        ];
        let filtered = pipeline.apply(candidates, &history).unwrap();
        assert_eq!(filtered, vec![ScoredItem::new(2, 2.5)]);
    }
}
