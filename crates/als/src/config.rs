//! Training configuration.
//!
//! Field names serialize in camelCase so a JSON config reads
//! `{"rank": 8, "maxIterations": 15, "regularization": 0.05, ...}`.

use crate::error::{AlsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do with users or items that were never seen during training
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColdStartStrategy {
    /// Omit the pair entirely (no prediction, no recommendation)
    #[default]
    Drop,
    /// Keep the pair with an undefined (NaN) prediction
    Nan,
}

impl fmt::Display for ColdStartStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColdStartStrategy::Drop => write!(f, "drop"),
            ColdStartStrategy::Nan => write!(f, "nan"),
        }
    }
}

impl FromStr for ColdStartStrategy {
    type Err = AlsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(ColdStartStrategy::Drop),
            "nan" => Ok(ColdStartStrategy::Nan),
            _ => Err(AlsError::InvalidConfig {
                field: "coldStartStrategy",
                reason: format!("unknown strategy '{}' (expected \"drop\" or \"nan\")", s),
            }),
        }
    }
}

/// Hyperparameters for one ALS training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AlsConfig {
    /// Latent dimensionality of every factor vector
    pub rank: usize,
    /// Hard cap on user+item iteration pairs
    pub max_iterations: usize,
    /// λ, scaled by the observation count of each row
    pub regularization: f64,
    pub cold_start_strategy: ColdStartStrategy,
    /// Drives factor initialization and data splitting
    pub seed: u64,
    /// Early stop when consecutive objective values differ by less than this.
    /// Zero disables early stopping.
    pub tolerance: f64,
}

impl Default for AlsConfig {
    fn default() -> Self {
        Self {
            rank: 10,
            max_iterations: 10,
            regularization: 0.1,
            cold_start_strategy: ColdStartStrategy::Drop,
            seed: 42,
            tolerance: 1e-6,
        }
    }
}

impl AlsConfig {
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_regularization(mut self, regularization: f64) -> Self {
        self.regularization = regularization;
        self
    }

    pub fn with_cold_start_strategy(mut self, strategy: ColdStartStrategy) -> Self {
        self.cold_start_strategy = strategy;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Check every field against its valid range
    pub fn validate(&self) -> Result<()> {
        if self.rank == 0 {
            return Err(AlsError::InvalidConfig {
                field: "rank",
                reason: "must be a positive integer".to_string(),
            });
        }
        if self.max_iterations == 0 {
            return Err(AlsError::InvalidConfig {
                field: "maxIterations",
                reason: "must be a positive integer".to_string(),
            });
        }
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(AlsError::InvalidConfig {
                field: "regularization",
                reason: format!("must be a non-negative real, got {}", self.regularization),
            });
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(AlsError::InvalidConfig {
                field: "tolerance",
                reason: format!("must be a non-negative real, got {}", self.tolerance),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(AlsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            AlsConfig::default().with_rank(0),
            AlsConfig::default().with_max_iterations(0),
            AlsConfig::default().with_regularization(-0.1),
            AlsConfig::default().with_regularization(f64::NAN),
            AlsConfig::default().with_tolerance(-1.0),
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{:?} should be rejected", config);
        }
    }

    #[test]
    fn test_zero_regularization_is_allowed() {
        assert!(AlsConfig::default().with_regularization(0.0).validate().is_ok());
    }

    #[test]
    fn test_cold_start_parsing() {
        assert_eq!("drop".parse::<ColdStartStrategy>().unwrap(), ColdStartStrategy::Drop);
        assert_eq!("NaN".parse::<ColdStartStrategy>().unwrap(), ColdStartStrategy::Nan);
        assert!("zero".parse::<ColdStartStrategy>().is_err());
        assert_eq!(ColdStartStrategy::Nan.to_string(), "nan");
    }

    #[test]
    fn test_json_uses_recognised_option_names() {
        let config: AlsConfig = serde_json::from_str(
            r#"{"rank": 2, "maxIterations": 10, "regularization": 0.1, "coldStartStrategy": "nan", "seed": 7}"#,
        )
        .unwrap();

        assert_eq!(config.rank, 2);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.cold_start_strategy, ColdStartStrategy::Nan);
        assert_eq!(config.seed, 7);
        // Missing fields fall back to defaults
        assert_eq!(config.tolerance, AlsConfig::default().tolerance);
    }
}
