//! Filter implementations for the recommendation pipeline.

pub mod already_rated;
pub mod minimum_score;

pub use already_rated::AlreadyRatedFilter;
pub use minimum_score::MinimumScoreFilter;
