// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Cost Evaluator
// ─────────────────────────────────────────────────────────────────────
//! Objective of the embedding, lower is better:
//!
//!   C = 0.5·(D·ln det K + tr(K⁻¹·S)),   S = Z·Zᵀ
//!
//! The trace is summed row-by-column so the N×N product is never formed.

use manifold_types::{ManifoldError, ManifoldResult};

use crate::parallel::sum_indexed;

/// tr(A·S) = Σᵢ A.row(i)·S.col(i), both n×n row-major.
pub fn trace_product(inverse: &[f64], self_cov: &[f64], n: usize) -> f64 {
    debug_assert_eq!(inverse.len(), n * n);
    debug_assert_eq!(self_cov.len(), n * n);

    sum_indexed(n, |i| {
        let row = &inverse[i * n..(i + 1) * n];
        row.iter()
            .enumerate()
            .map(|(k, a)| a * self_cov[k * n + i])
            .sum::<f64>()
    })
}

/// Cost from K⁻¹ and ln det K. `coefficient_count` is D.
///
/// A non-finite result is a `NumericalDegeneracy`; callers evaluating a
/// trial move treat it as a rejected move.
pub fn cost(
    inverse: &[f64],
    log_det: f64,
    self_cov: &[f64],
    n: usize,
    coefficient_count: usize,
) -> ManifoldResult<f64> {
    if inverse.len() != n * n || self_cov.len() != n * n {
        return Err(ManifoldError::Validation(format!(
            "cost expects {n}x{n} matrices, got {} and {} values",
            inverse.len(),
            self_cov.len()
        )));
    }
    let value = 0.5 * (coefficient_count as f64 * log_det + trace_product(inverse, self_cov, n));
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ManifoldError::NumericalDegeneracy(format!(
            "cost is not finite (ln det {log_det})"
        )))
    }
}

/// Cost from a raw determinant. `det <= 0` is rejected.
pub fn cost_from_determinant(
    inverse: &[f64],
    det: f64,
    self_cov: &[f64],
    n: usize,
    coefficient_count: usize,
) -> ManifoldResult<f64> {
    if !(det > 0.0) {
        return Err(ManifoldError::NumericalDegeneracy(format!(
            "kernel determinant must be positive, got {det}"
        )));
    }
    cost(inverse, det.ln(), self_cov, n, coefficient_count)
}
