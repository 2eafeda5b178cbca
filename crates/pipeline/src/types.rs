//! Candidate and output types shared by the filters, Evaluator and Recommender.

use data_loader::{ItemId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An item scored for one user, before filtering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem {
    pub item_id: ItemId,
    pub score: f64,
}

impl ScoredItem {
    pub fn new(item_id: ItemId, score: f64) -> Self {
        Self { item_id, score }
    }
}

/// What a filter may know about the user it is filtering for
#[derive(Debug, Clone, Default)]
pub struct UserHistory {
    pub user_id: UserId,
    /// Items rated in the training data
    pub rated_items: HashSet<ItemId>,
}

impl UserHistory {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            rated_items: HashSet::new(),
        }
    }
}

/// One `(userId, itemId, predictedScore)` output record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub predicted_score: f64,
}

/// A held-out triple with its model prediction.
///
/// `predicted` is NaN for cold pairs under the `nan` policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: f64,
    pub predicted: f64,
}
