//! # Recommendation Orchestrator
//!
//! Runs the batch workflow end to end:
//! 1. Split the interactions into training and held-out sets
//! 2. Train ALS on the training set (blocking pool, cancellable, time-limited)
//! 3. Evaluate RMSE on the held-out set
//! 4. Recommend top-K unseen items for every trained user
//! 5. Enrich the output with item titles when a catalog is available
//!
//! All CPU-bound stages run under `spawn_blocking` so the async caller is
//! never stalled by rayon work.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, instrument, warn};

use als::{AlsSolver, CancellationToken, Model, StopReason, TrainingOutcome, TrainingReport};
use data_loader::{InteractionStore, ItemCatalog, ItemId, UserId};
use pipeline::filters::MinimumScoreFilter;
use pipeline::{EvaluationReport, Evaluator, Recommendation, Recommender};

use crate::config::WorkflowConfig;

/// A recommendation with its display title, when one is known
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecommendation {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub predicted_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Training plus held-out evaluation, without recommendations
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRun {
    pub training_interactions: usize,
    pub evaluation_interactions: usize,
    pub training: TrainingReport,
    pub evaluation: EvaluationReport,
}

/// Everything a full workflow run produces
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowReport {
    pub training_interactions: usize,
    pub evaluation_interactions: usize,
    pub training: TrainingReport,
    pub evaluation: EvaluationReport,
    pub recommendations: Vec<EnrichedRecommendation>,
}

/// Recommendations for one user from a model trained on every interaction
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecommendations {
    pub user_id: UserId,
    pub training: TrainingReport,
    pub recommendations: Vec<EnrichedRecommendation>,
}

#[derive(Clone)]
pub struct RecommendationOrchestrator {
    store: Arc<InteractionStore>,
    catalog: Option<Arc<ItemCatalog>>,
    config: WorkflowConfig,
    cancellation: CancellationToken,
}

impl RecommendationOrchestrator {
    /// Fails if `config` is invalid
    pub fn new(store: Arc<InteractionStore>, config: WorkflowConfig) -> Result<Self> {
        config.validate().context("Invalid workflow configuration")?;
        Ok(Self {
            store,
            catalog: None,
            config,
            cancellation: CancellationToken::new(),
        })
    }

    pub fn with_catalog(mut self, catalog: Arc<ItemCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Cancelling this token stops training at the next iteration boundary.
    ///
    /// The token is shared by clones of this orchestrator and stays cancelled,
    /// so every later training run also stops before its first iteration until
    /// `reset_cancellation` is called.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Allow training again after a cancellation
    pub fn reset_cancellation(&self) {
        self.cancellation.reset();
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Fit ALS on `training` on the blocking pool
    pub async fn train(&self, training: Arc<InteractionStore>) -> Result<TrainingOutcome> {
        let mut solver = AlsSolver::new(self.config.als.clone())?
            .with_cancellation(self.cancellation.clone());
        if let Some(limit) = self.config.time_limit() {
            solver = solver.with_time_limit(limit);
        }

        let outcome = tokio::task::spawn_blocking(move || solver.fit(&training))
            .await
            .context("Training task panicked")?
            .context("Training failed")?;

        if matches!(
            outcome.report.stop_reason,
            StopReason::Cancelled | StopReason::TimedOut
        ) {
            warn!(
                reason = ?outcome.report.stop_reason,
                iterations = outcome.report.iterations,
                "Continuing with factors from the last completed iteration"
            );
        }
        Ok(outcome)
    }

    /// Split, train and evaluate
    #[instrument(skip(self))]
    pub async fn evaluate(&self) -> Result<EvaluationRun> {
        let (training, evaluation_set, outcome) = self.split_and_train().await?;
        let model = Arc::new(outcome.model);

        let evaluation = tokio::task::spawn_blocking({
            let model = model.clone();
            let evaluation_set = evaluation_set.clone();
            move || Evaluator::new(model).evaluate(evaluation_set.interactions())
        })
        .await
        .context("Evaluation task panicked")?;

        Ok(EvaluationRun {
            training_interactions: training.len(),
            evaluation_interactions: evaluation_set.len(),
            training: outcome.report,
            evaluation,
        })
    }

    /// The full workflow: split, train, evaluate, recommend for all users
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<WorkflowReport> {
        let start_time = Instant::now();

        let (training, evaluation_set, outcome) = self.split_and_train().await?;
        let model = Arc::new(outcome.model);
        let top_k = self.config.top_k;
        let recommender = self.recommender(model.clone(), training.clone())?;

        let (evaluation, recommendations) = tokio::task::spawn_blocking({
            let evaluation_set = evaluation_set.clone();
            move || -> Result<(EvaluationReport, Vec<Recommendation>)> {
                let evaluation = Evaluator::new(model).evaluate(evaluation_set.interactions());
                let recommendations = recommender
                    .recommend_for_all(top_k)
                    .context("Failed to generate recommendations")?;
                Ok((evaluation, recommendations))
            }
        })
        .await
        .context("Scoring task panicked")??;

        let recommendations = self.enrich(recommendations);
        info!(
            rmse = ?evaluation.rmse,
            recommendations = recommendations.len(),
            elapsed = ?start_time.elapsed(),
            "Workflow complete"
        );

        Ok(WorkflowReport {
            training_interactions: training.len(),
            evaluation_interactions: evaluation_set.len(),
            training: outcome.report,
            evaluation,
            recommendations,
        })
    }

    /// Train on every interaction and recommend for a single user.
    ///
    /// An unseen user gets an empty list, not an error.
    #[instrument(skip(self))]
    pub async fn recommend_for_user(&self, user_id: UserId, k: usize) -> Result<UserRecommendations> {
        let outcome = self.train(self.store.clone()).await?;
        let model = Arc::new(outcome.model);

        if !model.contains_user(user_id) {
            warn!(user_id, "User has no training interactions, no recommendations produced");
        }

        let recommender = self.recommender(model, self.store.clone())?;
        let recommendations =
            tokio::task::spawn_blocking(move || recommender.recommend_for_user(user_id, k))
                .await
                .context("Recommendation task panicked")??;

        Ok(UserRecommendations {
            user_id,
            training: outcome.report,
            recommendations: self.enrich(recommendations),
        })
    }

    async fn split_and_train(
        &self,
    ) -> Result<(Arc<InteractionStore>, Arc<InteractionStore>, TrainingOutcome)> {
        let split = self
            .store
            .split(self.config.train_fraction, self.config.als.seed)
            .context("Failed to split interactions")?;
        info!(
            training = split.training.len(),
            evaluation = split.evaluation.len(),
            "Split interactions"
        );

        let training = Arc::new(split.training);
        let evaluation = Arc::new(split.evaluation);
        let outcome = self.train(training.clone()).await?;
        Ok((training, evaluation, outcome))
    }

    /// Already-rated exclusion plus the configured minimum score, if any
    fn recommender(
        &self,
        model: Arc<Model>,
        training: Arc<InteractionStore>,
    ) -> Result<Recommender> {
        let recommender = Recommender::new(model, training);
        match self.config.min_score {
            Some(min_score) => Ok(recommender.with_filter(MinimumScoreFilter::new(min_score)?)),
            None => Ok(recommender),
        }
    }

    fn enrich(&self, recommendations: Vec<Recommendation>) -> Vec<EnrichedRecommendation> {
        recommendations
            .into_iter()
            .map(|rec| EnrichedRecommendation {
                user_id: rec.user_id,
                item_id: rec.item_id,
                predicted_score: rec.predicted_score,
                title: self
                    .catalog
                    .as_ref()
                    .and_then(|catalog| catalog.get_title(rec.item_id))
                    .map(str::to_string),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use als::AlsConfig;
    use data_loader::Interaction;
    use std::collections::HashSet;

    fn scenario_store() -> Arc<InteractionStore> {
        Arc::new(
            InteractionStore::new(
                [(1, 1, 5.0), (1, 2, 3.0), (2, 1, 4.0), (2, 3, 2.0), (3, 2, 5.0)]
                    .into_iter()
                    .map(|(u, i, r)| Interaction::new(u, i, r))
                    .collect(),
            )
            .unwrap(),
        )
    }

    fn dense_store() -> Arc<InteractionStore> {
        let mut interactions = Vec::new();
        for user in 1..=15u32 {
            for item in 1..=8u32 {
                if (user * 7 + item) % 4 != 0 {
                    interactions.push(Interaction::new(user, item, f64::from((user + item) % 5 + 1)));
                }
            }
        }
        Arc::new(InteractionStore::new(interactions).unwrap())
    }

    fn catalog() -> Arc<ItemCatalog> {
        Arc::new(
            [(1, "Toy Story (1995)"), (3, "Heat (1995)")]
                .into_iter()
                .map(|(id, title)| (id, title.to_string()))
                .collect(),
        )
    }

    fn scenario_config() -> WorkflowConfig {
        WorkflowConfig {
            als: AlsConfig::default()
                .with_rank(2)
                .with_max_iterations(10)
                .with_regularization(0.1)
                .with_seed(42),
            ..WorkflowConfig::default()
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = WorkflowConfig::default();
        config.train_fraction = 1.5;
        assert!(RecommendationOrchestrator::new(scenario_store(), config).is_err());
    }

    #[tokio::test]
    async fn test_recommend_for_user_with_titles() {
        let orchestrator = RecommendationOrchestrator::new(scenario_store(), scenario_config())
            .unwrap()
            .with_catalog(catalog());

        let result = orchestrator.recommend_for_user(3, 2).await.unwrap();
        let items: HashSet<_> = result.recommendations.iter().map(|r| r.item_id).collect();

        assert_eq!(items, HashSet::from([1, 3]));
        for rec in &result.recommendations {
            assert!(rec.title.is_some());
        }
    }

    #[tokio::test]
    async fn test_unseen_user_gets_empty_list() {
        let orchestrator = RecommendationOrchestrator::new(scenario_store(), scenario_config()).unwrap();
        let result = orchestrator.recommend_for_user(4, 3).await.unwrap();
        assert!(result.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_full_run() {
        let mut config = scenario_config();
        config.als.rank = 3;
        let orchestrator = RecommendationOrchestrator::new(dense_store(), config).unwrap();

        let report = orchestrator.run().await.unwrap();

        assert_eq!(
            report.training_interactions + report.evaluation_interactions,
            dense_store().len()
        );
        assert_eq!(
            report.evaluation.scored + report.evaluation.skipped,
            report.evaluation_interactions
        );
        assert!(report.training.iterations > 0);
        assert!(!report.recommendations.is_empty());

        let mut per_user = std::collections::HashMap::new();
        for rec in &report.recommendations {
            *per_user.entry(rec.user_id).or_insert(0) += 1;
            assert!(rec.title.is_none());
        }
        assert!(per_user.values().all(|&count| count <= 3));
    }

    #[tokio::test]
    async fn test_run_is_reproducible() {
        let first = RecommendationOrchestrator::new(dense_store(), scenario_config())
            .unwrap()
            .run()
            .await
            .unwrap();
        let second = RecommendationOrchestrator::new(dense_store(), scenario_config())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(first.recommendations, second.recommendations);
        assert_eq!(first.evaluation.rmse, second.evaluation.rmse);
    }

    #[tokio::test]
    async fn test_cancelled_run_still_reports() {
        let orchestrator = RecommendationOrchestrator::new(dense_store(), scenario_config()).unwrap();
        orchestrator.cancellation_token().cancel();

        let run = orchestrator.evaluate().await.unwrap();

        assert_eq!(run.training.stop_reason, StopReason::Cancelled);
        assert_eq!(run.training.iterations, 0);
        assert!(!run.training.converged);
    }

    #[tokio::test]
    async fn test_reset_cancellation_allows_training_again() {
        let orchestrator = RecommendationOrchestrator::new(dense_store(), scenario_config()).unwrap();
        let clone = orchestrator.clone();
        orchestrator.cancellation_token().cancel();
        assert_eq!(clone.evaluate().await.unwrap().training.iterations, 0);

        orchestrator.reset_cancellation();

        let run = clone.evaluate().await.unwrap();
        assert_ne!(run.training.stop_reason, StopReason::Cancelled);
        assert!(run.training.iterations > 0);
    }

    #[tokio::test]
    async fn test_min_score_limits_recommendations() {
        let mut config = scenario_config();
        config.min_score = Some(1e9);
        let orchestrator = RecommendationOrchestrator::new(dense_store(), config).unwrap();
        assert!(orchestrator.run().await.unwrap().recommendations.is_empty());

        let mut config = scenario_config();
        config.min_score = Some(3.0);
        let orchestrator = RecommendationOrchestrator::new(scenario_store(), config).unwrap();
        let result = orchestrator.recommend_for_user(3, 2).await.unwrap();
        assert!(result.recommendations.iter().all(|r| r.predicted_score >= 3.0));
        assert!(result.recommendations.len() < 2);
    }

    #[tokio::test]
    async fn test_time_limit_applies() {
        let mut config = scenario_config();
        config.time_limit_secs = Some(0);
        let orchestrator = RecommendationOrchestrator::new(scenario_store(), config).unwrap();

        let model_run = orchestrator.recommend_for_user(1, 3).await.unwrap();
        assert_eq!(model_run.training.stop_reason, StopReason::TimedOut);
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let orchestrator = RecommendationOrchestrator::new(scenario_store(), scenario_config())
            .unwrap()
            .with_catalog(catalog());
        let result = orchestrator.recommend_for_user(3, 2).await.unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["userId"], 3);
        assert!(json["recommendations"][0]["predictedScore"].is_number());
        assert!(json["recommendations"][0]["title"].is_string());
    }
}
