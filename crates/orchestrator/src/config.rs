//! Workflow configuration: ALS hyperparameters plus split, top-K, minimum
//! score and time limit settings for one end-to-end run.

use als::AlsConfig;
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reads the same camelCase JSON the CLI's `--config` file accepts:
///
/// ```json
/// {
///   "als": { "rank": 10, "maxIterations": 10, "regularization": 0.1,
///            "coldStartStrategy": "drop", "seed": 42 },
///   "trainFraction": 0.8,
///   "topK": 3,
///   "minScore": 3.5,
///   "timeLimitSecs": 300
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkflowConfig {
    pub als: AlsConfig,
    /// Share of interactions kept for training; the rest is held out
    pub train_fraction: f64,
    pub top_k: usize,
    /// Drop recommendations predicted below this score
    pub min_score: Option<f64>,
    pub time_limit_secs: Option<u64>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            als: AlsConfig::default(),
            train_fraction: 0.8,
            top_k: 3,
            min_score: None,
            time_limit_secs: None,
        }
    }
}

impl WorkflowConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        self.als.validate()?;
        if !(self.train_fraction > 0.0 && self.train_fraction <= 1.0) {
            bail!(
                "trainFraction must be in (0, 1], got {}",
                self.train_fraction
            );
        }
        if let Some(min_score) = self.min_score {
            if !min_score.is_finite() {
                bail!("minScore must be finite, got {}", min_score);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_workflow() {
        let config = WorkflowConfig::default();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.train_fraction, 0.8);
        assert_eq!(config.time_limit(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parses_partial_json() {
        let config: WorkflowConfig =
            serde_json::from_str(r#"{"als": {"rank": 4}, "topK": 5, "timeLimitSecs": 30}"#).unwrap();

        assert_eq!(config.als.rank, 4);
        assert_eq!(config.als.max_iterations, 10);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.train_fraction, 0.8);
        assert_eq!(config.time_limit(), Some(Duration::from_secs(30)));
        assert_eq!(config.min_score, None);
    }

    #[test]
    fn test_min_score_parses_and_must_be_finite() {
        let config: WorkflowConfig = serde_json::from_str(r#"{"minScore": 3.5}"#).unwrap();
        assert_eq!(config.min_score, Some(3.5));
        assert!(config.validate().is_ok());

        let mut config = WorkflowConfig::default();
        config.min_score = Some(f64::NAN);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_fraction_and_als_config() {
        let mut config = WorkflowConfig::default();
        config.train_fraction = 0.0;
        assert!(config.validate().is_err());

        let mut config = WorkflowConfig::default();
        config.als.rank = 0;
        assert!(config.validate().is_err());
    }
}
