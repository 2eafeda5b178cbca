//! Convergence Controller.
//!
//! Owns the iteration counter and loss trajectory. It is fed once per
//! completed user+item iteration, after the step barrier, and decides whether
//! the solver keeps going. It never touches factor matrices.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Why training ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Consecutive objective values differed by less than the tolerance
    Converged,
    /// `maxIterations` reached before the tolerance was met
    MaxIterations,
    /// The cancellation token was triggered
    Cancelled,
    /// The time limit elapsed
    TimedOut,
}

/// Loss measurements taken after one full iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    /// 1-based
    pub iteration: usize,
    /// `Σ (r − u·v)² + λ(Σ‖U‖² + Σ‖V‖²)`
    pub objective: f64,
    /// RMSE over the training interactions
    pub train_rmse: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Stop(StopReason),
}

#[derive(Debug, Clone)]
pub struct ConvergenceController {
    max_iterations: usize,
    tolerance: f64,
    trajectory: Vec<IterationStats>,
}

impl ConvergenceController {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
            trajectory: Vec::with_capacity(max_iterations),
        }
    }

    /// Record the loss of the iteration that just completed.
    ///
    /// The tolerance check wins over the hard cap when both trigger on the
    /// same iteration.
    pub fn record(&mut self, objective: f64, train_rmse: f64) -> Decision {
        let previous = self.trajectory.last().map(|stats| stats.objective);
        let stats = IterationStats {
            iteration: self.trajectory.len() + 1,
            objective,
            train_rmse,
        };
        self.trajectory.push(stats);

        debug!(
            iteration = stats.iteration,
            objective = stats.objective,
            train_rmse = stats.train_rmse,
            "ALS iteration complete"
        );

        if let Some(previous) = previous {
            if self.tolerance > 0.0 && (previous - objective).abs() < self.tolerance {
                return Decision::Stop(StopReason::Converged);
            }
        }
        if self.trajectory.len() >= self.max_iterations {
            return Decision::Stop(StopReason::MaxIterations);
        }
        Decision::Continue
    }

    /// Number of completed iterations
    pub fn iterations(&self) -> usize {
        self.trajectory.len()
    }

    pub fn trajectory(&self) -> &[IterationStats] {
        &self.trajectory
    }

    pub fn finish(
        self,
        stop_reason: StopReason,
        instability_events: usize,
        elapsed: Duration,
    ) -> TrainingReport {
        TrainingReport {
            iterations: self.trajectory.len(),
            trajectory: self.trajectory,
            stop_reason,
            converged: stop_reason == StopReason::Converged,
            instability_events,
            elapsed,
        }
    }
}

/// Observability record of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub iterations: usize,
    pub trajectory: Vec<IterationStats>,
    pub stop_reason: StopReason,
    /// False means the factors are the best available, not a converged fit
    pub converged: bool,
    /// Rows reset to initialization after a failed solve
    pub instability_events: usize,
    pub elapsed: Duration,
}

impl TrainingReport {
    /// Objective value after each iteration
    pub fn loss_trajectory(&self) -> Vec<f64> {
        self.trajectory.iter().map(|stats| stats.objective).collect()
    }

    pub fn final_objective(&self) -> Option<f64> {
        self.trajectory.last().map(|stats| stats.objective)
    }

    pub fn final_train_rmse(&self) -> Option<f64> {
        self.trajectory.last().map(|stats| stats.train_rmse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_at_max_iterations() {
        let mut controller = ConvergenceController::new(3, 1e-9);
        assert_eq!(controller.record(10.0, 1.0), Decision::Continue);
        assert_eq!(controller.record(5.0, 0.5), Decision::Continue);
        assert_eq!(
            controller.record(2.0, 0.2),
            Decision::Stop(StopReason::MaxIterations)
        );
        assert_eq!(controller.iterations(), 3);
    }

    #[test]
    fn test_stops_early_within_tolerance() {
        let mut controller = ConvergenceController::new(100, 0.01);
        assert_eq!(controller.record(1.0, 0.1), Decision::Continue);
        assert_eq!(controller.record(0.5, 0.1), Decision::Continue);
        assert_eq!(
            controller.record(0.495, 0.1),
            Decision::Stop(StopReason::Converged)
        );

        let report = controller.finish(StopReason::Converged, 0, Duration::ZERO);
        assert!(report.converged);
        assert_eq!(report.iterations, 3);
        assert_eq!(report.loss_trajectory(), vec![1.0, 0.5, 0.495]);
    }

    #[test]
    fn test_zero_tolerance_never_stops_early() {
        let mut controller = ConvergenceController::new(3, 0.0);
        assert_eq!(controller.record(1.0, 0.1), Decision::Continue);
        assert_eq!(controller.record(1.0, 0.1), Decision::Continue);
        assert_eq!(
            controller.record(1.0, 0.1),
            Decision::Stop(StopReason::MaxIterations)
        );
    }

    #[test]
    fn test_convergence_on_last_iteration_is_reported() {
        let mut controller = ConvergenceController::new(2, 0.1);
        controller.record(1.0, 0.1);
        assert_eq!(
            controller.record(0.95, 0.1),
            Decision::Stop(StopReason::Converged)
        );
    }

    #[test]
    fn test_report_flags_non_convergence() {
        let mut controller = ConvergenceController::new(1, 0.0);
        controller.record(3.0, 1.0);
        let report = controller.finish(StopReason::MaxIterations, 2, Duration::from_millis(5));

        assert!(!report.converged);
        assert_eq!(report.instability_events, 2);
        assert_eq!(report.final_objective(), Some(3.0));
        assert_eq!(report.final_train_rmse(), Some(1.0));
    }
}
