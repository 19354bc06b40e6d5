// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Symmetric Eigensolver
// ─────────────────────────────────────────────────────────────────────
//! Cyclic Jacobi eigendecomposition for the self-covariance matrix.
//!
//! Eigenpairs come out sorted by descending eigenvalue. Each eigenvector
//! is sign-fixed so its largest-magnitude component is positive, which
//! makes the PCA seed deterministic.

use manifold_types::{ManifoldError, ManifoldResult};

const MAX_SWEEPS: usize = 100;
const OFF_DIAGONAL_TOL: f64 = 1e-14;

/// Eigenpairs of a symmetric n×n matrix.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    n: usize,
    /// Descending.
    values: Vec<f64>,
    /// n×n row-major; column k is the eigenvector of `values[k]`.
    vectors: Vec<f64>,
}

impl SymmetricEigen {
    /// Decompose `a` (n×n row-major, symmetric).
    pub fn new(a: &[f64], n: usize) -> ManifoldResult<Self> {
        if a.len() != n * n {
            return Err(ManifoldError::Validation(format!(
                "eigensolver expects {n}x{n} values, got {}",
                a.len()
            )));
        }
        if a.iter().any(|v| !v.is_finite()) {
            return Err(ManifoldError::NumericalDegeneracy(
                "eigensolver input contains non-finite values".to_string(),
            ));
        }

        let mut work = a.to_vec();
        let mut values = vec![0.0; n];
        let mut vectors = vec![0.0; n * n];
        let (sweeps, converged) = jacobi(&mut work, n, &mut values, &mut vectors, MAX_SWEEPS);
        if converged {
            log::trace!("jacobi converged after {sweeps} sweeps (n = {n})");
        } else {
            log::warn!(
                "jacobi stopped after {sweeps} sweeps without reaching tolerance (n = {n}); \
                 eigenpairs are approximate"
            );
        }

        sort_descending(&mut values, &mut vectors, n);
        fix_signs(&mut vectors, n);
        Ok(Self { n, values, vectors })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn vectors(&self) -> &[f64] {
        &self.vectors
    }

    /// Component `row` of the eigenvector for the k-th largest eigenvalue.
    #[inline]
    pub fn component(&self, row: usize, k: usize) -> f64 {
        self.vectors[row * self.n + k]
    }

    pub fn vector(&self, k: usize) -> Vec<f64> {
        (0..self.n).map(|row| self.component(row, k)).collect()
    }
}

/// Returns the sweeps used and whether the off-diagonal mass fell below
/// tolerance. `a` is destroyed.
fn jacobi(
    a: &mut [f64],
    n: usize,
    values: &mut [f64],
    v: &mut [f64],
    max_sweeps: usize,
) -> (usize, bool) {
    for i in 0..n {
        for j in 0..n {
            v[i * n + j] = if i == j { 1.0 } else { 0.0 };
        }
    }

    let scale = a.iter().fold(0.0f64, |m, x| m.max(x.abs())).max(1.0);
    let mut sweeps = 0;
    let converged = loop {
        let mut max_off = 0.0f64;
        for p in 0..n {
            for q in (p + 1)..n {
                max_off = max_off.max(a[p * n + q].abs());
            }
        }
        if max_off < OFF_DIAGONAL_TOL * scale {
            break true;
        }
        if sweeps >= max_sweeps {
            break false;
        }

        let threshold = if sweeps < 4 {
            0.2 * max_off / (n * n) as f64
        } else {
            0.0
        };

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[p * n + q];
                if apq == 0.0 || apq.abs() < threshold {
                    continue;
                }
                rotate(a, v, n, p, q);
            }
        }
        sweeps += 1;
    };

    for i in 0..n {
        values[i] = a[i * n + i];
    }
    (sweeps, converged)
}

/// One Jacobi rotation zeroing a[p][q] (Rutishauser form).
fn rotate(a: &mut [f64], v: &mut [f64], n: usize, p: usize, q: usize) {
    let apq = a[p * n + q];
    let diff = a[q * n + q] - a[p * n + p];

    let t = if diff.abs() < 1e-300 {
        apq.signum()
    } else {
        let theta = diff / (2.0 * apq);
        let root = (1.0 + theta * theta).sqrt();
        if theta >= 0.0 {
            1.0 / (theta + root)
        } else {
            -1.0 / (-theta + root)
        }
    };

    let c = 1.0 / (1.0 + t * t).sqrt();
    let s = t * c;
    let tau = s / (1.0 + c);

    a[p * n + p] -= t * apq;
    a[q * n + q] += t * apq;
    a[p * n + q] = 0.0;
    a[q * n + p] = 0.0;

    for r in 0..n {
        if r == p || r == q {
            continue;
        }
        let arp = a[r * n + p];
        let arq = a[r * n + q];
        let new_rp = arp - s * (arq + tau * arp);
        let new_rq = arq + s * (arp - tau * arq);
        a[r * n + p] = new_rp;
        a[p * n + r] = new_rp;
        a[r * n + q] = new_rq;
        a[q * n + r] = new_rq;
    }

    for r in 0..n {
        let vrp = v[r * n + p];
        let vrq = v[r * n + q];
        v[r * n + p] = vrp - s * (vrq + tau * vrp);
        v[r * n + q] = vrq + s * (vrp - tau * vrq);
    }
}

fn sort_descending(values: &mut [f64], vectors: &mut [f64], n: usize) {
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[b].total_cmp(&values[a]));

    let old_values = values.to_vec();
    let old_vectors = vectors.to_vec();
    for (new_col, &old_col) in order.iter().enumerate() {
        values[new_col] = old_values[old_col];
        for row in 0..n {
            vectors[row * n + new_col] = old_vectors[row * n + old_col];
        }
    }
}

fn fix_signs(vectors: &mut [f64], n: usize) {
    for col in 0..n {
        let mut max_abs = 0.0;
        let mut max_row = 0;
        for row in 0..n {
            let v = vectors[row * n + col].abs();
            if v > max_abs {
                max_abs = v;
                max_row = row;
            }
        }
        if vectors[max_row * n + col] < 0.0 {
            for row in 0..n {
                vectors[row * n + col] = -vectors[row * n + col];
            }
        }
    }
}
