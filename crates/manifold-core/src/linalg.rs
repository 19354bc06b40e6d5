// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Dense Linear Algebra
// ─────────────────────────────────────────────────────────────────────
//! Pivoted LU decomposition over n×n row-major slices.
//!
//! Used wherever K has to be inverted from scratch: once at start-up
//! and for every extrapolation trial of the pattern search. Both the
//! inverse and ln|det| come out of one factorisation.

use manifold_types::{ManifoldError, ManifoldResult};

/// P·A = L·U with unit-diagonal L stored below the diagonal of `lu`.
#[derive(Debug, Clone)]
pub struct LuDecomposition {
    n: usize,
    lu: Vec<f64>,
    /// Row `i` of P·A is row `perm[i]` of A.
    perm: Vec<usize>,
    swaps: usize,
}

impl LuDecomposition {
    /// Factorise `a` (n×n, row-major).
    ///
    /// Fails with `NumericalDegeneracy` when the largest available pivot
    /// of some column is not above `tol`.
    pub fn new(a: &[f64], n: usize, tol: f64) -> ManifoldResult<Self> {
        if a.len() != n * n {
            return Err(ManifoldError::Validation(format!(
                "expected {}x{} matrix, got {} values",
                n,
                n,
                a.len()
            )));
        }

        let mut lu = a.to_vec();
        let mut perm: Vec<usize> = (0..n).collect();
        let mut swaps = 0;

        for i in 0..n {
            let mut max_a = 0.0;
            let mut i_max = i;
            for k in i..n {
                let abs_a = lu[k * n + i].abs();
                if abs_a > max_a {
                    max_a = abs_a;
                    i_max = k;
                }
            }

            if max_a <= tol {
                return Err(ManifoldError::NumericalDegeneracy(format!(
                    "LU pivot {max_a:e} at column {i} is not above tolerance {tol:e}"
                )));
            }

            if i_max != i {
                perm.swap(i, i_max);
                for k in 0..n {
                    lu.swap(i * n + k, i_max * n + k);
                }
                swaps += 1;
            }

            let pivot = lu[i * n + i];
            for j in (i + 1)..n {
                lu[j * n + i] /= pivot;
                let factor = lu[j * n + i];
                if factor == 0.0 {
                    continue;
                }
                for k in (i + 1)..n {
                    lu[j * n + k] -= factor * lu[i * n + k];
                }
            }
        }

        Ok(Self { n, lu, perm, swaps })
    }

    pub fn dim(&self) -> usize {
        self.n
    }

    /// Solve A·x = b.
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let mut x = vec![0.0; self.n];
        self.solve_into(b, &mut x);
        x
    }

    fn solve_into(&self, b: &[f64], x: &mut [f64]) {
        let n = self.n;
        debug_assert_eq!(b.len(), n);
        debug_assert_eq!(x.len(), n);

        for i in 0..n {
            let mut acc = b[self.perm[i]];
            for k in 0..i {
                acc -= self.lu[i * n + k] * x[k];
            }
            x[i] = acc;
        }

        for i in (0..n).rev() {
            let mut acc = x[i];
            for k in (i + 1)..n {
                acc -= self.lu[i * n + k] * x[k];
            }
            x[i] = acc / self.lu[i * n + i];
        }
    }

    /// A⁻¹, row-major.
    pub fn inverse(&self) -> Vec<f64> {
        let n = self.n;
        let mut inv = vec![0.0; n * n];
        let mut e = vec![0.0; n];
        let mut col = vec![0.0; n];
        for j in 0..n {
            e.iter_mut().for_each(|v| *v = 0.0);
            e[j] = 1.0;
            self.solve_into(&e, &mut col);
            for i in 0..n {
                inv[i * n + j] = col[i];
            }
        }
        inv
    }

    /// `(sign, ln|det A|)` with sign in {-1, 1}.
    pub fn log_determinant(&self) -> (f64, f64) {
        let n = self.n;
        let mut sign = if self.swaps % 2 == 0 { 1.0 } else { -1.0 };
        let mut log_abs = 0.0;
        for i in 0..n {
            let u = self.lu[i * n + i];
            if u < 0.0 {
                sign = -sign;
            }
            log_abs += u.abs().ln();
        }
        (sign, log_abs)
    }

    pub fn determinant(&self) -> f64 {
        let (sign, log_abs) = self.log_determinant();
        sign * log_abs.exp()
    }
}

/// Dense inverse and ln det of a matrix whose determinant must be
/// positive (a kernel matrix). Returns `(A⁻¹, ln det A)`.
pub fn invert_spd(a: &[f64], n: usize, tol: f64) -> ManifoldResult<(Vec<f64>, f64)> {
    let lu = LuDecomposition::new(a, n, tol)?;
    let (sign, log_det) = lu.log_determinant();
    if sign <= 0.0 || !log_det.is_finite() {
        return Err(ManifoldError::NumericalDegeneracy(format!(
            "kernel determinant is not positive (sign {sign}, ln|det| {log_det})"
        )));
    }
    Ok((lu.inverse(), log_det))
}

/// C = A·B for n×n row-major matrices.
pub fn mat_mul(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let mut c = vec![0.0; n * n];
    for i in 0..n {
        for k in 0..n {
            let aik = a[i * n + k];
            if aik == 0.0 {
                continue;
            }
            for j in 0..n {
                c[i * n + j] += aik * b[k * n + j];
            }
        }
    }
    c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_identity(m: &[f64], n: usize, tol: f64) {
        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (m[i * n + j] - expected).abs() < tol,
                    "A·A⁻¹[{i},{j}] = {}, expected {expected}",
                    m[i * n + j]
                );
            }
        }
    }

    #[test]
    fn test_known_3x3_inverse_and_determinant() {
        let a = vec![4.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0];
        let lu = LuDecomposition::new(&a, 3, 1e-12).unwrap();
        assert!((lu.determinant() - 18.0).abs() < 1e-12);

        let inv = lu.inverse();
        let expected = [5.0, -2.0, 1.0, -2.0, 8.0, -4.0, 1.0, -4.0, 11.0];
        for (got, want) in inv.iter().zip(expected.iter()) {
            assert!((got - want / 18.0).abs() < 1e-12, "{got} vs {}", want / 18.0);
        }
    }

    #[test]
    fn test_row_swap_flips_sign() {
        // Needs a pivot swap at column 0.
        let a = vec![0.0, 1.0, 1.0, 0.0];
        let lu = LuDecomposition::new(&a, 2, 1e-12).unwrap();
        let (sign, log_abs) = lu.log_determinant();
        assert_eq!(sign, -1.0);
        assert!(log_abs.abs() < 1e-12);
        assert!(matches!(
            invert_spd(&a, 2, 1e-12),
            Err(ManifoldError::NumericalDegeneracy(_))
        ));
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let a = vec![1.0, 2.0, 2.0, 4.0];
        assert!(matches!(
            LuDecomposition::new(&a, 2, 1e-12),
            Err(ManifoldError::NumericalDegeneracy(_))
        ));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        assert!(matches!(
            LuDecomposition::new(&[1.0, 2.0, 3.0], 2, 1e-12),
            Err(ManifoldError::Validation(_))
        ));
    }

    #[test]
    fn test_solve() {
        let a = vec![2.0, 1.0, 1.0, 1.0, 3.0, 2.0, 1.0, 0.0, 0.0];
        let lu = LuDecomposition::new(&a, 3, 1e-12).unwrap();
        let x = lu.solve(&[4.0, 5.0, 6.0]);
        for i in 0..3 {
            let row: f64 = (0..3).map(|k| a[i * 3 + k] * x[k]).sum();
            assert!((row - [4.0, 5.0, 6.0][i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_invert_spd_round_trip() {
        let n = 6;
        let mut a = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                let d = i as f64 - j as f64;
                a[i * n + j] = (-d * d / 8.0).exp();
            }
            a[i * n + i] += 0.01;
        }
        let (inv, log_det) = invert_spd(&a, n, 1e-12).unwrap();
        assert_identity(&mat_mul(&a, &inv, n), n, 1e-8);

        let lu = LuDecomposition::new(&a, n, 1e-12).unwrap();
        assert!((lu.determinant().ln() - log_det).abs() < 1e-10);
    }
}
