//! Regularized normal equations and their Cholesky solve.
//!
//! For one row the system is `(Σ v vᵀ + λ·n·I) x = Σ r v` where the sums run
//! over the `n` observations of that row. The matrix is symmetric positive
//! definite whenever λ > 0, so Cholesky is enough; a failed pivot or a large
//! solve residual is reported as `SolveError` instead of producing garbage.
//!
//! Without regularization a row with fewer observations than the rank is
//! underdetermined. `min_norm_solve` returns the smallest vector that fits
//! those observations exactly.

use ndarray::{Array1, Array2, ArrayView1};
use std::fmt;

/// Pivots below this fraction of the largest diagonal entry count as zero
const PIVOT_EPSILON: f64 = 1e-10;

/// Accepted residual, relative to the scale of the system
const RESIDUAL_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// Cholesky hit a non-positive pivot
    NotPositiveDefinite { pivot: usize, value: f64 },
    /// The system or its solution contains NaN/inf
    NonFinite,
    /// `|Ax - b|` too large for the solution to be trusted
    Residual { residual: f64, scale: f64 },
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveError::NotPositiveDefinite { pivot, value } => {
                write!(f, "singular system (pivot {} = {:e})", pivot, value)
            }
            SolveError::NonFinite => write!(f, "non-finite values in system"),
            SolveError::Residual { residual, scale } => {
                write!(f, "solve residual {:e} exceeds tolerance at scale {:e}", residual, scale)
            }
        }
    }
}

/// Accumulates `A = Σ v vᵀ` and `b = Σ r v` for one row
#[derive(Debug, Clone)]
pub struct NormalEquation {
    a: Array2<f64>,
    b: Array1<f64>,
    observations: usize,
}

impl NormalEquation {
    pub fn new(rank: usize) -> Self {
        Self {
            a: Array2::zeros((rank, rank)),
            b: Array1::zeros(rank),
            observations: 0,
        }
    }

    /// Add one observation with fixed-side vector `v` and rating `r`
    pub fn add(&mut self, v: ArrayView1<'_, f64>, rating: f64) {
        let k = self.b.len();
        for i in 0..k {
            let vi = v[i];
            self.b[i] += rating * vi;
            for j in 0..=i {
                self.a[[i, j]] += vi * v[j];
            }
        }
        self.observations += 1;
    }

    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Add `λ·n` to the diagonal and solve.
    ///
    /// The regularization term is always added, never skipped.
    pub fn solve(mut self, lambda: f64) -> Result<Array1<f64>, SolveError> {
        let k = self.b.len();
        let shift = lambda * self.observations as f64;
        for i in 0..k {
            self.a[[i, i]] += shift;
            // Mirror the lower triangle built by `add`
            for j in 0..i {
                self.a[[j, i]] = self.a[[i, j]];
            }
        }
        solve_spd(&self.a, &self.b)
    }
}

/// Solve `A x = b` for symmetric positive definite `A`.
pub fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, SolveError> {
    let n = a.nrows();
    if a.iter().chain(b.iter()).any(|x| !x.is_finite()) {
        return Err(SolveError::NonFinite);
    }

    let max_diag = (0..n).map(|i| a[[i, i]].abs()).fold(0.0_f64, f64::max);
    let pivot_floor = PIVOT_EPSILON * max_diag.max(f64::MIN_POSITIVE);

    // A = L Lᵀ
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= pivot_floor {
                    return Err(SolveError::NotPositiveDefinite {
                        pivot: i,
                        value: diag,
                    });
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Lᵀ x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(SolveError::NonFinite);
    }

    let residual = (a.dot(&x) - b).iter().fold(0.0_f64, |m, r| m.max(r.abs()));
    let scale = max_abs(a) * max_abs_1d(&x) + max_abs_1d(b);
    if residual > RESIDUAL_TOLERANCE * scale.max(1.0) {
        return Err(SolveError::Residual { residual, scale });
    }

    Ok(x)
}

/// Minimum-norm solution of `V x = r`, one row of `V` per observation.
///
/// Computed as `x = Vᵀ (V Vᵀ)⁻¹ r`, so the rows of `V` must be linearly
/// independent; otherwise the Gram matrix is singular and the error is
/// returned.
pub fn min_norm_solve(
    vectors: &Array2<f64>,
    ratings: &Array1<f64>,
) -> Result<Array1<f64>, SolveError> {
    let gram = vectors.dot(&vectors.t());
    let y = solve_spd(&gram, ratings)?;
    Ok(vectors.t().dot(&y))
}

fn max_abs(a: &Array2<f64>) -> f64 {
    a.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
}

fn max_abs_1d(a: &Array1<f64>) -> f64 {
    a.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_solve_known_system() {
        let a = array![[4.0, 2.0], [2.0, 3.0]];
        let b = array![2.0, 1.0];

        let x = solve_spd(&a, &b).unwrap();
        // Exact solution: x = [0.5, 0.0]
        assert!((x[0] - 0.5).abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
    }

    #[test]
    fn test_singular_system_is_detected() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let b = array![1.0, 2.0];

        assert!(matches!(
            solve_spd(&a, &b),
            Err(SolveError::NotPositiveDefinite { pivot: 1, .. })
        ));
    }

    #[test]
    fn test_non_finite_is_detected() {
        let a = array![[1.0, 0.0], [0.0, f64::NAN]];
        let b = array![1.0, 1.0];
        assert_eq!(solve_spd(&a, &b), Err(SolveError::NonFinite));
    }

    #[test]
    fn test_single_observation_without_regularization_is_singular() {
        let mut eq = NormalEquation::new(2);
        eq.add(array![0.6, 0.8].view(), 4.0);
        assert!(eq.solve(0.0).is_err());
    }

    #[test]
    fn test_min_norm_solution_of_single_observation() {
        let v = array![[0.3, 0.4]];
        let x = min_norm_solve(&v, &array![4.0]).unwrap();

        // x = r v / |v|² with |v|² = 0.25
        assert!((x[0] - 4.8).abs() < 1e-12);
        assert!((x[1] - 6.4).abs() < 1e-12);
    }

    #[test]
    fn test_min_norm_solution_fits_observations_exactly() {
        let v = array![[1.0, 0.0, 1.0], [0.0, 2.0, 1.0]];
        let r = array![3.0, 1.0];
        let x = min_norm_solve(&v, &r).unwrap();

        let fitted = v.dot(&x);
        assert!((fitted[0] - 3.0).abs() < 1e-10);
        assert!((fitted[1] - 1.0).abs() < 1e-10);
        // Lies in the row space of V
        let normal = array![2.0, 1.0, -2.0];
        assert!(x.dot(&normal).abs() < 1e-10);
    }

    #[test]
    fn test_min_norm_rejects_dependent_observations() {
        let v = array![[0.6, 0.8], [0.6, 0.8]];
        assert!(matches!(
            min_norm_solve(&v, &array![4.0, 2.0]),
            Err(SolveError::NotPositiveDefinite { .. })
        ));
    }

    #[test]
    fn test_single_observation_with_regularization_solves() {
        let v = array![0.6, 0.8];
        let mut eq = NormalEquation::new(2);
        eq.add(v.view(), 4.0);

        // (v vᵀ + λI) x = r v  =>  x = r v / (|v|² + λ) with |v| = 1
        let x = eq.solve(0.5).unwrap();
        let expected = 4.0 / 1.5;
        assert!((x[0] - 0.6 * expected).abs() < 1e-12);
        assert!((x[1] - 0.8 * expected).abs() < 1e-12);
    }

    #[test]
    fn test_regularization_scales_with_observation_count() {
        let v = array![1.0];
        let mut eq = NormalEquation::new(1);
        eq.add(v.view(), 2.0);
        eq.add(v.view(), 2.0);
        assert_eq!(eq.observations(), 2);

        // (2 + 0.5 * 2) x = 4
        let x = eq.solve(0.5).unwrap();
        assert!((x[0] - 4.0 / 3.0).abs() < 1e-12);
    }
}
