//! ALS Solver
//!
//! Factorizes the rating matrix into user factors U and item factors V by
//! minimizing `Σ (r − U[u]·V[i])² + λ(Σ‖U[u]‖² + Σ‖V[i]‖²)`.
//!
//! ## Algorithm
//! 1. Initialize U and V deterministically from the seed
//! 2. User step: with V fixed, solve the ridge normal equation of every user
//! 3. Item step: with U fixed, solve the normal equation of every item
//! 4. Record the loss and let the convergence controller decide
//!
//! With λ = 0 a row observed fewer times than the rank takes the
//! minimum-norm exact fit. Rows whose system still cannot be solved are reset
//! to their initialization and counted as instability events.
//!
//! ## Concurrency
//! Within a step every row solve is independent and runs on the rayon pool.
//! Solutions are collected (the barrier), written into the `next` buffer and
//! the buffers are swapped, so no solve ever sees a half-updated matrix.
//! Cancellation and time limits are checked between iterations only.

use crate::cancel::CancellationToken;
use crate::config::AlsConfig;
use crate::convergence::{ConvergenceController, Decision, StopReason};
use crate::error::{AlsError, Result};
use crate::factors::{EntityKind, FactorMatrix};
use crate::linalg::{NormalEquation, SolveError, min_norm_solve};
use crate::model::{Model, TrainingOutcome};
use data_loader::InteractionStore;
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Observations of one row, resolved to row indices of the fixed side
type RowObservations = Vec<(usize, f64)>;

enum RowOutcome {
    /// No observations this round; keep the current vector
    Unchanged,
    Solved(Array1<f64>),
    Failed(SolveError),
}

/// Alternating least squares trainer
#[derive(Debug, Clone)]
pub struct AlsSolver {
    config: AlsConfig,
    cancellation: Option<CancellationToken>,
    time_limit: Option<Duration>,
}

impl AlsSolver {
    /// Create a solver; the configuration is validated up front
    pub fn new(config: AlsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancellation: None,
            time_limit: None,
        })
    }

    /// Stop at the next iteration boundary once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Stop at the first iteration boundary after `limit` has elapsed
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn config(&self) -> &AlsConfig {
        &self.config
    }

    /// Train a model on `store`.
    ///
    /// Always returns the factors of the last completed iteration; the report
    /// says whether they converged or why training stopped early.
    #[instrument(
        skip(self, store),
        fields(
            users = store.num_users(),
            items = store.num_items(),
            interactions = store.len(),
            rank = self.config.rank
        )
    )]
    pub fn fit(&self, store: &InteractionStore) -> Result<TrainingOutcome> {
        if store.is_empty() {
            return Err(AlsError::EmptyTrainingSet);
        }

        let started = Instant::now();
        let rank = self.config.rank;
        let seed = self.config.seed;

        let mut users =
            FactorMatrix::initialize(EntityKind::User, store.user_ids().collect(), rank, seed);
        let mut items =
            FactorMatrix::initialize(EntityKind::Item, store.item_ids().collect(), rank, seed);

        let user_rows: Vec<RowObservations> = users
            .ids()
            .iter()
            .map(|&user_id| resolve_row(store.get_user_ratings(user_id), &items))
            .collect();
        let item_rows: Vec<RowObservations> = items
            .ids()
            .iter()
            .map(|&item_id| resolve_row(store.get_item_ratings(item_id), &users))
            .collect();

        let mut users_next = users.clone();
        let mut items_next = items.clone();

        let mut controller =
            ConvergenceController::new(self.config.max_iterations, self.config.tolerance);
        let mut instability_events = 0;

        let stop_reason = loop {
            if let Some(reason) = self.interruption(started) {
                break reason;
            }

            instability_events += self.solve_step(&user_rows, &items, &users, &mut users_next);
            std::mem::swap(&mut users, &mut users_next);

            instability_events += self.solve_step(&item_rows, &users, &items, &mut items_next);
            std::mem::swap(&mut items, &mut items_next);

            let (objective, train_rmse) = self.loss(&user_rows, &users, &items);
            if let Decision::Stop(reason) = controller.record(objective, train_rmse) {
                break reason;
            }
        };

        let report = controller.finish(stop_reason, instability_events, started.elapsed());
        match report.stop_reason {
            StopReason::Converged | StopReason::MaxIterations => info!(
                iterations = report.iterations,
                converged = report.converged,
                objective = report.final_objective(),
                elapsed = ?report.elapsed,
                "ALS training finished"
            ),
            StopReason::Cancelled | StopReason::TimedOut => warn!(
                iterations = report.iterations,
                reason = ?report.stop_reason,
                "ALS training interrupted, returning last completed factors"
            ),
        }

        Ok(TrainingOutcome {
            model: Model::new(users, items, self.config.clone()),
            report,
        })
    }

    fn interruption(&self, started: Instant) -> Option<StopReason> {
        if self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Some(StopReason::Cancelled);
        }
        if self.time_limit.is_some_and(|limit| started.elapsed() >= limit) {
            return Some(StopReason::TimedOut);
        }
        None
    }

    /// Solve every row of one side against the `fixed` side.
    ///
    /// Reads only `fixed` and `current`, writes only `next`. Returns the
    /// number of rows that had to be reset.
    fn solve_step(
        &self,
        rows: &[RowObservations],
        fixed: &FactorMatrix,
        current: &FactorMatrix,
        next: &mut FactorMatrix,
    ) -> usize {
        let rank = self.config.rank;
        let lambda = self.config.regularization;

        let outcomes: Vec<RowOutcome> = rows
            .par_iter()
            .map(|observations| {
                if observations.is_empty() {
                    return RowOutcome::Unchanged;
                }
                match solve_row(observations, fixed, rank, lambda) {
                    Ok(solution) => RowOutcome::Solved(solution),
                    Err(err) => RowOutcome::Failed(err),
                }
            })
            .collect();

        let mut resets = 0;
        for (row, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                RowOutcome::Unchanged => next.row_mut(row).assign(&current.row(row)),
                RowOutcome::Solved(solution) => next.row_mut(row).assign(&solution),
                RowOutcome::Failed(err) => {
                    let id = current.id_at(row);
                    let error = AlsError::NumericalInstability {
                        entity: current.kind(),
                        id,
                        reason: err.to_string(),
                    };
                    warn!(%error, "Resetting factor row to its initialization");
                    next.row_mut(row).assign(&FactorMatrix::initial_vector(
                        current.kind(),
                        id,
                        rank,
                        self.config.seed,
                    ));
                    resets += 1;
                }
            }
        }

        debug!(kind = %current.kind(), rows = rows.len(), resets, "Solve step complete");
        resets
    }

    /// (objective, training RMSE) for the current factors.
    ///
    /// Rows are evaluated in parallel but summed in arena order so the result
    /// does not depend on scheduling.
    fn loss(&self, user_rows: &[RowObservations], users: &FactorMatrix, items: &FactorMatrix) -> (f64, f64) {
        let per_user: Vec<(f64, usize)> = user_rows
            .par_iter()
            .enumerate()
            .map(|(row, observations)| {
                let user = users.row(row);
                let squared_error: f64 = observations
                    .iter()
                    .map(|&(item_row, rating)| {
                        let error = rating - user.dot(&items.row(item_row));
                        error * error
                    })
                    .sum();
                (squared_error, observations.len())
            })
            .collect();

        let (squared_error, count) = per_user
            .iter()
            .fold((0.0, 0usize), |(sum, n), &(error, len)| (sum + error, n + len));

        let penalty = self.config.regularization * (squared_norm_sum(users) + squared_norm_sum(items));
        let train_rmse = if count > 0 {
            (squared_error / count as f64).sqrt()
        } else {
            0.0
        };

        (squared_error + penalty, train_rmse)
    }
}

/// Map (entity id, rating) pairs onto row indices of the other side
fn resolve_row(ratings: &[(u32, f64)], other: &FactorMatrix) -> RowObservations {
    ratings
        .iter()
        .filter_map(|&(id, rating)| other.index_of(id).map(|row| (row, rating)))
        .collect()
}

/// Ridge solve of a single row against the fixed factors
fn solve_row(
    observations: &[(usize, f64)],
    fixed: &FactorMatrix,
    rank: usize,
    lambda: f64,
) -> std::result::Result<Array1<f64>, SolveError> {
    let mut equation = NormalEquation::new(rank);
    for &(row, rating) in observations {
        equation.add(fixed.row(row), rating);
    }
    match equation.solve(lambda) {
        // Unregularized and underdetermined: take the smallest exact fit
        Err(err) if lambda == 0.0 => min_norm_row(observations, fixed).map_err(|_| err),
        result => result,
    }
}

fn min_norm_row(
    observations: &[(usize, f64)],
    fixed: &FactorMatrix,
) -> std::result::Result<Array1<f64>, SolveError> {
    let vectors = Array2::from_shape_fn((observations.len(), fixed.rank()), |(i, j)| {
        fixed.row(observations[i].0)[j]
    });
    let ratings: Array1<f64> = observations.iter().map(|&(_, rating)| rating).collect();
    min_norm_solve(&vectors, &ratings)
}

fn squared_norm_sum(factors: &FactorMatrix) -> f64 {
    factors.values().iter().map(|x| x * x).sum()
}
