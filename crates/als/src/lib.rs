//! # ALS Crate
//!
//! Alternating least squares matrix factorization over explicit ratings.
//!
//! ## Main Components
//!
//! - **config**: `AlsConfig` hyperparameters and cold start policy
//! - **factors**: `FactorMatrix`, a dense id-indexed factor arena
//! - **linalg**: regularized normal equations and their Cholesky solve
//! - **solver**: `AlsSolver`, the parallel alternating training loop
//! - **convergence**: stop decisions and the `TrainingReport`
//! - **cancel**: cooperative `CancellationToken`
//! - **model**: the trained, immutable `Model`
//!
//! ## Example Usage
//!
//! ```ignore
//! use als::{AlsConfig, AlsSolver};
//!
//! let config = AlsConfig::default().with_rank(2).with_regularization(0.1);
//! let outcome = AlsSolver::new(config)?.fit(&split.training)?;
//!
//! println!("converged: {}", outcome.report.converged);
//! let score = outcome.model.predict(3, 1);
//! ```

pub mod cancel;
pub mod config;
pub mod convergence;
pub mod error;
pub mod factors;
pub mod linalg;
pub mod model;
pub mod solver;

pub use cancel::CancellationToken;
pub use config::{AlsConfig, ColdStartStrategy};
pub use convergence::{IterationStats, StopReason, TrainingReport};
pub use error::{AlsError, Result};
pub use factors::{EntityKind, FactorMatrix};
pub use model::{Model, TrainingOutcome};
pub use solver::AlsSolver;
