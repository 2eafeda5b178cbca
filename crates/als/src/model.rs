//! Trained model: user factors, item factors and the hyperparameters that
//! produced them. Immutable once training returns.

use crate::config::{AlsConfig, ColdStartStrategy};
use crate::convergence::TrainingReport;
use crate::factors::FactorMatrix;
use data_loader::{ItemId, UserId};
use ndarray::ArrayView1;

#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    user_factors: FactorMatrix,
    item_factors: FactorMatrix,
    config: AlsConfig,
}

impl Model {
    pub(crate) fn new(user_factors: FactorMatrix, item_factors: FactorMatrix, config: AlsConfig) -> Self {
        Self {
            user_factors,
            item_factors,
            config,
        }
    }

    pub fn user_factors(&self) -> &FactorMatrix {
        &self.user_factors
    }

    pub fn item_factors(&self) -> &FactorMatrix {
        &self.item_factors
    }

    pub fn config(&self) -> &AlsConfig {
        &self.config
    }

    pub fn rank(&self) -> usize {
        self.config.rank
    }

    pub fn cold_start_strategy(&self) -> ColdStartStrategy {
        self.config.cold_start_strategy
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.user_factors.contains(user_id)
    }

    pub fn contains_item(&self, item_id: ItemId) -> bool {
        self.item_factors.contains(item_id)
    }

    pub fn user_vector(&self, user_id: UserId) -> Option<ArrayView1<'_, f64>> {
        self.user_factors.vector(user_id)
    }

    pub fn item_vector(&self, item_id: ItemId) -> Option<ArrayView1<'_, f64>> {
        self.item_factors.vector(item_id)
    }

    /// `dot(U[u], V[i])`, or `None` when either side is cold
    pub fn predict(&self, user_id: UserId, item_id: ItemId) -> Option<f64> {
        let user = self.user_vector(user_id)?;
        let item = self.item_vector(item_id)?;
        Some(user.dot(&item))
    }

    /// Scores of every trained item for a user, in item id order.
    ///
    /// `None` when the user was never seen in training.
    pub fn score_all_items(&self, user_id: UserId) -> Option<Vec<(ItemId, f64)>> {
        let user = self.user_vector(user_id)?;
        let scores = self.item_factors.values().dot(&user);
        Some(
            self.item_factors
                .ids()
                .iter()
                .copied()
                .zip(scores.iter().copied())
                .collect(),
        )
    }
}

/// What `AlsSolver::fit` returns
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: Model,
    pub report: TrainingReport,
}
