//! Error types for the ALS crate.

use crate::factors::EntityKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlsError {
    /// A hyperparameter is out of its valid range
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// Training needs at least one interaction
    #[error("Cannot train on an empty interaction store")]
    EmptyTrainingSet,

    /// A normal-equation solve failed despite regularization.
    ///
    /// Recovered locally by the solver: the row is reset to its
    /// initialization and training continues.
    #[error("Numerical instability solving {entity} {id}: {reason}")]
    NumericalInstability {
        entity: EntityKind,
        id: u32,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, AlsError>;
