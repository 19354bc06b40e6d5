// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Covariance Kernel
// ─────────────────────────────────────────────────────────────────────
//! Squared-exponential kernel on latent coordinates:
//!
//!   k(x1, x2) = exp(-||x1 - x2||² / (2l²)) + μ·[||x1 - x2||² < ε]
//!
//! The nugget μ only lands on coincident coordinates (the diagonal of K
//! in practice), which keeps K invertible. Distances stay squared; no
//! square root is taken.

use manifold_types::KernelParams;

use crate::parallel::{fill_indexed, fill_rows};

/// Squared Euclidean distance between two coordinates of equal length.
#[inline]
pub fn squared_distance(x1: &[f64], x2: &[f64]) -> f64 {
    debug_assert_eq!(x1.len(), x2.len());
    x1.iter()
        .zip(x2)
        .map(|(a, b)| {
            let d = a - b;
            d * d
        })
        .sum()
}

/// Covariance between two latent coordinates.
#[inline]
pub fn covariance(x1: &[f64], x2: &[f64], kernel: &KernelParams) -> f64 {
    let dist2 = squared_distance(x1, x2);
    let l = kernel.length_scale;
    let k = (-dist2 / (2.0 * l * l)).exp();
    if dist2 < f64::EPSILON {
        k + kernel.nugget
    } else {
        k
    }
}

/// Covariance between `reference` and every sample coordinate.
///
/// `latent` holds N blocks of `latent_dim` scalars; `out` has length N.
/// Entry i is `covariance(reference, X_i)`.
pub fn compute_cov_vector(
    latent: &[f64],
    reference: &[f64],
    latent_dim: usize,
    kernel: &KernelParams,
    out: &mut [f64],
) {
    debug_assert_eq!(reference.len(), latent_dim);
    debug_assert_eq!(latent.len(), out.len() * latent_dim);

    fill_indexed(out, |i| {
        covariance(
            reference,
            &latent[i * latent_dim..(i + 1) * latent_dim],
            kernel,
        )
    });
}

/// Full N×N kernel matrix K, row-major. Only used where every
/// coordinate moves at once (initialisation, extrapolation trials).
pub fn kernel_matrix(latent: &[f64], latent_dim: usize, kernel: &KernelParams, out: &mut [f64]) {
    let n = latent.len() / latent_dim;
    debug_assert_eq!(out.len(), n * n);

    fill_rows(out, n, |i, row| {
        let xi = &latent[i * latent_dim..(i + 1) * latent_dim];
        for (j, v) in row.iter_mut().enumerate() {
            *v = covariance(xi, &latent[j * latent_dim..(j + 1) * latent_dim], kernel);
        }
    });
}
