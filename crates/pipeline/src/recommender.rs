//! Recommender: top-K unseen items per user.
//!
//! ## Algorithm
//! 1. Score every trained item with `dot(U[u], V[i])`
//! 2. Run the filter pipeline (already-rated exclusion first)
//! 3. Order by score descending, lower item id first on exact ties
//! 4. Keep the first K
//!
//! Users without a trained factor vector get no recommendations.

use crate::filter_pipeline::FilterPipeline;
use crate::traits::Filter;
use crate::types::{Recommendation, ScoredItem, UserHistory};
use als::Model;
use anyhow::Result;
use data_loader::{InteractionStore, UserId};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct Recommender {
    model: Arc<Model>,
    training: Arc<InteractionStore>,
    filters: FilterPipeline,
}

impl Recommender {
    /// `training` must be the store the model was fit on; its interactions
    /// define what each user has already rated.
    pub fn new(model: Arc<Model>, training: Arc<InteractionStore>) -> Self {
        Self {
            model,
            training,
            filters: FilterPipeline::standard(),
        }
    }

    /// Append a filter after the already-rated exclusion
    pub fn with_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filters = self.filters.add_filter(filter);
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    #[instrument(skip(self))]
    pub fn recommend_for_user(&self, user_id: UserId, k: usize) -> Result<Vec<Recommendation>> {
        let Some(scores) = self.model.score_all_items(user_id) else {
            debug!("User not in trained factors, no recommendations");
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let history = UserHistory {
            user_id,
            rated_items: self.training.rated_items(user_id),
        };
        let candidates: Vec<ScoredItem> = scores
            .into_iter()
            .map(|(item_id, score)| ScoredItem::new(item_id, score))
            .collect();

        let mut kept = self.filters.apply(candidates, &history)?;
        kept.retain(|candidate| candidate.score.is_finite());
        top_k(&mut kept, k);

        Ok(kept
            .into_iter()
            .map(|candidate| Recommendation {
                user_id,
                item_id: candidate.item_id,
                predicted_score: candidate.score,
            })
            .collect())
    }

    /// Recommendations for every trained user, ordered by user id then rank
    #[instrument(skip(self))]
    pub fn recommend_for_all(&self, k: usize) -> Result<Vec<Recommendation>> {
        let per_user: Vec<Vec<Recommendation>> = self
            .model
            .user_factors()
            .ids()
            .par_iter()
            .map(|&user_id| self.recommend_for_user(user_id, k))
            .collect::<Result<_>>()?;

        let recommendations: Vec<Recommendation> = per_user.into_iter().flatten().collect();
        info!(
            users = self.model.user_factors().len(),
            recommendations = recommendations.len(),
            "Generated recommendations"
        );
        Ok(recommendations)
    }
}

/// Score descending, then item id ascending
fn rank_order(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.item_id.cmp(&b.item_id))
}

/// Leave the best `k` candidates in `candidates`, in rank order
fn top_k(candidates: &mut Vec<ScoredItem>, k: usize) {
    if k == 0 {
        candidates.clear();
        return;
    }
    if candidates.len() > k {
        candidates.select_nth_unstable_by(k - 1, rank_order);
        candidates.truncate(k);
    }
    candidates.sort_by(rank_order);
}
