// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Latent Initialiser
// ─────────────────────────────────────────────────────────────────────
//! PCA seed for the embedding.
//!
//! The top-L eigenvectors of S = Z·Zᵀ give each sample L coordinates
//! (component i of eigenvector k is coordinate k of sample i). All
//! coordinates are then divided by one factor, `max |x| + SCALE_EPS`, so
//! the seed lies strictly inside (-1, 1) even for all-zero input.

use manifold_types::{ManifoldError, ManifoldResult};

use crate::spectral::SymmetricEigen;

/// Floor added to the normalising factor.
pub const SCALE_EPS: f64 = 1e-6;

/// N·L seed coordinates from the N×N self-covariance.
pub fn pca_latent_coordinates(
    self_cov: &[f64],
    n: usize,
    latent_dim: usize,
) -> ManifoldResult<Vec<f64>> {
    if latent_dim == 0 || latent_dim > n {
        return Err(ManifoldError::Validation(format!(
            "latent_dim must be in 1..={n}, got {latent_dim}"
        )));
    }

    let eig = SymmetricEigen::new(self_cov, n)?;
    let mut latent = vec![0.0; n * latent_dim];
    for i in 0..n {
        for k in 0..latent_dim {
            latent[i * latent_dim + k] = eig.component(i, k);
        }
    }

    let max_abs = latent.iter().fold(0.0f64, |m, v| m.max(v.abs()));
    let scale = 1.0 / (max_abs + SCALE_EPS);
    latent.iter_mut().for_each(|v| *v *= scale);

    log::debug!(
        "PCA seed: {n} samples, L = {latent_dim}, leading eigenvalue {:.6e}",
        eig.values().first().copied().unwrap_or(0.0)
    );
    Ok(latent)
}
