//! Dense latent factor matrices.
//!
//! A `FactorMatrix` is an arena: entity ids are mapped once to row indices and
//! every row holds that entity's `rank`-dimensional vector. Rows are only ever
//! created for ids present in the training store.

use data_loader::seed::mix_seed;
use ndarray::{Array1, Array2, ArrayView1, ArrayViewMut1};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Which side of the factorization a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    User,
    Item,
}

impl EntityKind {
    fn stream(self) -> u64 {
        match self {
            EntityKind::User => 0x5553_4552,
            EntityKind::Item => 0x4954_454D,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Item => write!(f, "item"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactorMatrix {
    kind: EntityKind,
    /// Row index -> entity id, ascending
    ids: Vec<u32>,
    /// Entity id -> row index
    index: HashMap<u32, usize>,
    /// One row per entity, `rank` columns
    values: Array2<f64>,
}

impl FactorMatrix {
    /// Build a matrix whose rows hold the deterministic initial vector of
    /// each id.
    pub fn initialize(kind: EntityKind, ids: Vec<u32>, rank: usize, seed: u64) -> Self {
        let mut values = Array2::<f64>::zeros((ids.len(), rank));
        for (row, &id) in ids.iter().enumerate() {
            values
                .row_mut(row)
                .assign(&Self::initial_vector(kind, id, rank, seed));
        }

        let index = ids.iter().enumerate().map(|(row, &id)| (id, row)).collect();

        Self {
            kind,
            ids,
            index,
            values,
        }
    }

    /// The initialization of a single entity.
    ///
    /// Depends only on (kind, id, rank, seed), so resetting a row never needs
    /// a stored copy and adding unrelated entities does not change it.
    /// Components are uniform in [0, 1/sqrt(rank)).
    pub fn initial_vector(kind: EntityKind, id: u32, rank: usize, seed: u64) -> Array1<f64> {
        let mut rng = StdRng::seed_from_u64(mix_seed(seed, &[kind.stream(), u64::from(id)]));
        let scale = 1.0 / (rank as f64).sqrt();
        Array1::from_shape_fn(rank, |_| rng.random::<f64>() * scale)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn rank(&self) -> usize {
        self.values.ncols()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Entity ids in row order (ascending)
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Entity id stored at a row
    pub fn id_at(&self, row: usize) -> u32 {
        self.ids[row]
    }

    /// Factor vector of an entity, `None` if it was never trained
    pub fn vector(&self, id: u32) -> Option<ArrayView1<'_, f64>> {
        self.index_of(id).map(|row| self.values.row(row))
    }

    pub fn row(&self, row: usize) -> ArrayView1<'_, f64> {
        self.values.row(row)
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> ArrayViewMut1<'_, f64> {
        self.values.row_mut(row)
    }

    /// The full `len x rank` matrix
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Euclidean norm of an entity's vector
    pub fn norm(&self, id: u32) -> Option<f64> {
        self.vector(id).map(|v| v.dot(&v).sqrt())
    }
}
