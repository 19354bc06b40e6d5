// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Rank-One Update Engine
// ─────────────────────────────────────────────────────────────────────
//! Updates K⁻¹ and ln det K after one latent variable moved, without
//! re-inverting K.
//!
//! Moving variable c replaces row c and (by symmetry) column c of K by
//! the new covariance vector. With `d = k_new - k_old` this is done as
//! two Sherman-Morrison corrections:
//!
//!   1. row:    K' = K + e_c·dᵀ
//!      A' = A - A[:,c] ⊗ (dᵀA) / (1 + d·A[:,c]),   det' = det·(1 + d·A[:,c])
//!   2. column: K'' = K' + d̃·e_cᵀ  with d̃ = d, d̃[c] = 0
//!      A'' = A' - (A'd̃) ⊗ A'[c,:] / (1 + A'[c,:]·d̃), det'' = det'·(1 + A'[c,:]·d̃)
//!
//! Each step is O(N²). A denominator at or below the degeneracy
//! tolerance means the update is numerically singular (or would make
//! det K non-positive) and is reported as `NumericalDegeneracy`.

use manifold_types::{ManifoldError, ManifoldResult};

/// Inverse kernel and ln det after a rank-one update.
#[derive(Debug, Clone)]
pub struct RankOneUpdate {
    pub inverse: Vec<f64>,
    pub log_det: f64,
}

/// Pre-allocated scratch for repeated updates of an N×N inverse.
pub struct RankOneWorkspace {
    n: usize,
    d: Vec<f64>,
    col: Vec<f64>,
    w: Vec<f64>,
}

impl RankOneWorkspace {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            d: vec![0.0; n],
            col: vec![0.0; n],
            w: vec![0.0; n],
        }
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    /// Apply the two-step update for variable `changed` and write A'' to
    /// `out`. Returns ln det K''.
    ///
    /// `diff` is read only; its c-th entry is zeroed in a private copy
    /// for the column step.
    pub fn update_into(
        &mut self,
        inverse: &[f64],
        log_det: f64,
        changed: usize,
        diff: &[f64],
        tolerance: f64,
        out: &mut [f64],
    ) -> ManifoldResult<f64> {
        let n = self.n;
        debug_assert_eq!(inverse.len(), n * n);
        debug_assert_eq!(out.len(), n * n);
        debug_assert_eq!(diff.len(), n);
        debug_assert!(changed < n);

        self.d.copy_from_slice(diff);
        let c = changed;

        // Row step.
        let mut dotp1 = 1.0;
        for i in 0..n {
            self.col[i] = inverse[i * n + c];
            dotp1 += self.d[i] * self.col[i];
        }
        check_denominator(dotp1, tolerance, "row")?;

        for w in self.w.iter_mut() {
            *w = 0.0;
        }
        for i in 0..n {
            let di = self.d[i];
            if di == 0.0 {
                continue;
            }
            let row = &inverse[i * n..(i + 1) * n];
            for (w, &a) in self.w.iter_mut().zip(row) {
                *w += di * a;
            }
        }
        let inv_dotp1 = 1.0 / dotp1;
        for i in 0..n {
            let scale = self.col[i] * inv_dotp1;
            let src = &inverse[i * n..(i + 1) * n];
            let dst = &mut out[i * n..(i + 1) * n];
            for ((o, &a), &w) in dst.iter_mut().zip(src).zip(&self.w) {
                *o = a - scale * w;
            }
        }

        // Column step: the diagonal entry was already folded in.
        self.d[c] = 0.0;
        for i in 0..n {
            let row = &out[i * n..(i + 1) * n];
            self.col[i] = row.iter().zip(&self.d).map(|(a, d)| a * d).sum();
        }
        let dotp2 = 1.0 + self.col[c];
        check_denominator(dotp2, tolerance, "column")?;

        self.w.copy_from_slice(&out[c * n..(c + 1) * n]);
        let inv_dotp2 = 1.0 / dotp2;
        for i in 0..n {
            let scale = self.col[i] * inv_dotp2;
            if scale == 0.0 {
                continue;
            }
            let dst = &mut out[i * n..(i + 1) * n];
            for (o, &w) in dst.iter_mut().zip(&self.w) {
                *o -= scale * w;
            }
        }

        Ok(log_det + dotp1.ln() + dotp2.ln())
    }
}

fn check_denominator(dotp: f64, tolerance: f64, step: &str) -> ManifoldResult<()> {
    if dotp.is_finite() && dotp > tolerance {
        Ok(())
    } else {
        Err(ManifoldError::NumericalDegeneracy(format!(
            "rank-one {step} update denominator {dotp:e} is not above {tolerance:e}"
        )))
    }
}

/// Allocating form of [`RankOneWorkspace::update_into`].
///
/// `inverse` is N×N row-major, `diff` the change of the covariance
/// row of variable `changed`.
pub fn sherman_morrison_update(
    inverse: &[f64],
    log_det: f64,
    changed: usize,
    diff: &[f64],
    tolerance: f64,
) -> ManifoldResult<RankOneUpdate> {
    let n = diff.len();
    if inverse.len() != n * n {
        return Err(ManifoldError::Validation(format!(
            "inverse has {} values, diff implies {}x{}",
            inverse.len(),
            n,
            n
        )));
    }
    if changed >= n {
        return Err(ManifoldError::Validation(format!(
            "latent variable {changed} out of range for {n} samples"
        )));
    }

    let mut out = vec![0.0; n * n];
    let log_det = RankOneWorkspace::new(n).update_into(
        inverse, log_det, changed, diff, tolerance, &mut out,
    )?;
    Ok(RankOneUpdate {
        inverse: out,
        log_det,
    })
}
