//! Evaluation and recommendation on top of a trained ALS model.
//!
//! This crate provides:
//! - `Evaluator` for held-out RMSE under a cold start policy
//! - `Recommender` for top-K unseen items per user
//! - `Filter` trait and `FilterPipeline` for post-scoring candidate filtering
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{Evaluator, Recommender};
//! use std::sync::Arc;
//!
//! let model = Arc::new(outcome.model);
//! let report = Evaluator::new(model.clone()).evaluate(split.evaluation.interactions());
//!
//! let recommender = Recommender::new(model, Arc::new(split.training));
//! let top3 = recommender.recommend_for_user(3, 3)?;
//! ```

pub mod evaluator;
pub mod filter_pipeline;
pub mod filters;
pub mod recommender;
pub mod traits;
pub mod types;

pub use evaluator::{EvaluationReport, Evaluator};
pub use filter_pipeline::FilterPipeline;
pub use recommender::Recommender;
pub use traits::Filter;
pub use types::{Prediction, Recommendation, ScoredItem, UserHistory};
