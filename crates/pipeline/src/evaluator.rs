//! Evaluator: prediction error of a trained model on held-out interactions.
//!
//! Cold pairs (user or item never seen in training) are never scored:
//! - `drop` leaves them out of the predictions entirely
//! - `nan` emits them with a NaN prediction
//!
//! Under both policies they are excluded from the RMSE and counted in
//! `EvaluationReport::skipped`.

use crate::types::Prediction;
use als::{ColdStartStrategy, Model};
use data_loader::Interaction;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    /// `None` when no held-out pair could be scored
    pub rmse: Option<f64>,
    /// Pairs included in the RMSE
    pub scored: usize,
    /// Cold pairs left out of the RMSE
    pub skipped: usize,
    pub strategy: ColdStartStrategy,
}

pub struct Evaluator {
    model: Arc<Model>,
    strategy: ColdStartStrategy,
}

impl Evaluator {
    /// Uses the cold start policy the model was trained with
    pub fn new(model: Arc<Model>) -> Self {
        let strategy = model.cold_start_strategy();
        Self { model, strategy }
    }

    pub fn with_cold_start_strategy(mut self, strategy: ColdStartStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn strategy(&self) -> ColdStartStrategy {
        self.strategy
    }

    /// Per-triple predictions, in input order
    pub fn predict(&self, interactions: &[Interaction]) -> Vec<Prediction> {
        interactions
            .par_iter()
            .filter_map(|interaction| {
                let predicted = match self.model.predict(interaction.user_id, interaction.item_id) {
                    Some(score) => score,
                    None => match self.strategy {
                        ColdStartStrategy::Drop => return None,
                        ColdStartStrategy::Nan => f64::NAN,
                    },
                };
                Some(Prediction {
                    user_id: interaction.user_id,
                    item_id: interaction.item_id,
                    rating: interaction.rating,
                    predicted,
                })
            })
            .collect()
    }

    #[instrument(skip_all, fields(held_out = interactions.len(), strategy = %self.strategy))]
    pub fn evaluate(&self, interactions: &[Interaction]) -> EvaluationReport {
        let predictions: Vec<Option<f64>> = interactions
            .par_iter()
            .map(|interaction| self.model.predict(interaction.user_id, interaction.item_id))
            .collect();

        let mut squared_error = 0.0;
        let mut scored = 0;
        for (interaction, predicted) in interactions.iter().zip(&predictions) {
            if let Some(predicted) = predicted {
                let error = interaction.rating - predicted;
                squared_error += error * error;
                scored += 1;
            }
        }
        let skipped = interactions.len() - scored;

        let report = EvaluationReport {
            rmse: (scored > 0).then(|| (squared_error / scored as f64).sqrt()),
            scored,
            skipped,
            strategy: self.strategy,
        };
        info!(rmse = ?report.rmse, scored, skipped, "Evaluation complete");
        report
    }
}

/// RMSE over predictions with a finite predicted value
pub fn rmse(predictions: &[Prediction]) -> Option<f64> {
    let (sum, count) = predictions
        .iter()
        .filter(|p| p.predicted.is_finite())
        .fold((0.0, 0usize), |(sum, count), p| {
            let error = p.rating - p.predicted;
            (sum + error * error, count + 1)
        });
    (count > 0).then(|| (sum / count as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use als::{AlsConfig, AlsSolver};
    use data_loader::InteractionStore;

    fn trained_model(strategy: ColdStartStrategy) -> Arc<Model> {
        let store = InteractionStore::new(vec![
            Interaction::new(1, 1, 5.0),
            Interaction::new(1, 2, 3.0),
            Interaction::new(2, 1, 4.0),
            Interaction::new(2, 2, 2.0),
        ])
        .unwrap();
        let config = AlsConfig::default()
            .with_rank(2)
            .with_cold_start_strategy(strategy);
        Arc::new(AlsSolver::new(config).unwrap().fit(&store).unwrap().model)
    }

    fn held_out() -> Vec<Interaction> {
        vec![
            Interaction::new(1, 2, 3.5),
            Interaction::new(9, 1, 4.0),
            Interaction::new(2, 9, 1.0),
            Interaction::new(2, 1, 4.5),
        ]
    }

    #[test]
    fn test_drop_omits_cold_pairs() {
        let evaluator = Evaluator::new(trained_model(ColdStartStrategy::Drop));
        let predictions = evaluator.predict(&held_out());

        assert_eq!(predictions.len(), 2);
        assert!(predictions.iter().all(|p| p.predicted.is_finite()));
        assert_eq!((predictions[0].user_id, predictions[0].item_id), (1, 2));
        assert_eq!((predictions[1].user_id, predictions[1].item_id), (2, 1));
    }

    #[test]
    fn test_nan_emits_cold_pairs() {
        let evaluator = Evaluator::new(trained_model(ColdStartStrategy::Nan));
        let predictions = evaluator.predict(&held_out());

        assert_eq!(predictions.len(), 4);
        assert!(predictions[1].predicted.is_nan());
        assert!(predictions[2].predicted.is_nan());
    }

    #[test]
    fn test_report_counts_skipped_under_both_policies() {
        for strategy in [ColdStartStrategy::Drop, ColdStartStrategy::Nan] {
            let report = Evaluator::new(trained_model(strategy)).evaluate(&held_out());

            assert_eq!(report.scored, 2);
            assert_eq!(report.skipped, 2);
            assert_eq!(report.strategy, strategy);
            let rmse = report.rmse.unwrap();
            assert!(rmse.is_finite() && rmse >= 0.0);
        }
    }

    #[test]
    fn test_report_rmse_matches_predictions() {
        let evaluator = Evaluator::new(trained_model(ColdStartStrategy::Nan));
        let held_out = held_out();

        let from_predictions = rmse(&evaluator.predict(&held_out)).unwrap();
        let from_report = evaluator.evaluate(&held_out).rmse.unwrap();
        assert!((from_predictions - from_report).abs() < 1e-12);
    }

    #[test]
    fn test_all_cold_has_no_rmse() {
        let evaluator = Evaluator::new(trained_model(ColdStartStrategy::Drop));
        let report = evaluator.evaluate(&[Interaction::new(99, 99, 3.0)]);

        assert_eq!(report.rmse, None);
        assert_eq!(report.scored, 0);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_rmse_of_exact_predictions_is_zero() {
        let predictions = vec![
            Prediction { user_id: 1, item_id: 1, rating: 3.0, predicted: 3.0 },
            Prediction { user_id: 1, item_id: 2, rating: 4.0, predicted: 4.0 },
        ];
        assert_eq!(rmse(&predictions), Some(0.0));
        assert_eq!(rmse(&[]), None);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = EvaluationReport {
            rmse: Some(0.5),
            scored: 3,
            skipped: 1,
            strategy: ColdStartStrategy::Drop,
        };
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["strategy"], "drop");
        assert_eq!(json["skipped"], 1);
    }
}
