//! Orchestrator crate for the ALS recommendation workflow.
//!
//! Coordinates the data, training, evaluation and recommendation crates
//! behind an async API that keeps CPU-bound work on the blocking pool.

pub mod config;
pub mod orchestrator;

pub use config::WorkflowConfig;
pub use orchestrator::{
    EnrichedRecommendation, EvaluationRun, RecommendationOrchestrator, UserRecommendations,
    WorkflowReport,
};
