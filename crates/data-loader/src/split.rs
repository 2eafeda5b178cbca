//! Deterministic train/evaluation partitioning.
//!
//! Each record seeds its own `StdRng` from the caller's seed mixed with the
//! record's content and draws once, so the assignment is a property of
//! (seed, fraction, record) only and does not change when the input is
//! reordered.

use crate::error::{DataLoadError, Result};
use crate::seed::mix_seed;
use crate::store::InteractionStore;
use crate::types::Interaction;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, instrument};

/// Two disjoint stores produced by `InteractionStore::split`
#[derive(Debug, Clone)]
pub struct Split {
    pub training: InteractionStore,
    pub evaluation: InteractionStore,
}

impl InteractionStore {
    /// Partition the records into training and evaluation subsets.
    ///
    /// `train_fraction` is the expected share of records retained for
    /// training (e.g. 0.8). Identical triples always land on the same side.
    #[instrument(skip(self), fields(records = self.len()))]
    pub fn split(&self, train_fraction: f64, seed: u64) -> Result<Split> {
        if !(0.0..=1.0).contains(&train_fraction) {
            return Err(DataLoadError::InvalidFraction(train_fraction));
        }

        let (training, evaluation): (Vec<Interaction>, Vec<Interaction>) = self
            .interactions()
            .par_iter()
            .partition(|interaction| assign_to_training(interaction, train_fraction, seed));

        debug!(
            training = training.len(),
            evaluation = evaluation.len(),
            "Split interactions"
        );

        Ok(Split {
            training: InteractionStore::build(training),
            evaluation: InteractionStore::build(evaluation),
        })
    }
}

fn assign_to_training(interaction: &Interaction, train_fraction: f64, seed: u64) -> bool {
    let mut rng = StdRng::seed_from_u64(mix_seed(
        seed,
        &[
            u64::from(interaction.user_id),
            u64::from(interaction.item_id),
            interaction.rating.to_bits(),
        ],
    ));
    rng.random::<f64>() < train_fraction
}
