// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Data Preparation
// ─────────────────────────────────────────────────────────────────────
//! Sample matrix, centring, and the self-covariance Z·Zᵀ the cost needs.

use manifold_types::{ManifoldError, ManifoldResult};

use crate::parallel::fill_rows;

/// N samples × D coefficients, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DataMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl DataMatrix {
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> ManifoldResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(ManifoldError::DataSource(format!(
                "data matrix must be non-empty, got {rows}x{cols}"
            )));
        }
        if values.len() != rows * cols {
            return Err(ManifoldError::Validation(format!(
                "{rows}x{cols} data matrix needs {} values, got {}",
                rows * cols,
                values.len()
            )));
        }
        Ok(Self { rows, cols, values })
    }

    /// Stack sample vectors. Every sample must have the length of the first.
    pub fn from_rows<R: AsRef<[f64]>>(samples: &[R]) -> ManifoldResult<Self> {
        let first = samples
            .first()
            .ok_or_else(|| ManifoldError::DataSource("no samples".to_string()))?;
        let cols = first.as_ref().len();
        let mut values = Vec::with_capacity(samples.len() * cols);
        for (index, sample) in samples.iter().enumerate() {
            let sample = sample.as_ref();
            if sample.len() != cols {
                return Err(ManifoldError::DimensionMismatch {
                    index,
                    expected: cols,
                    found: sample.len(),
                });
            }
            values.extend_from_slice(sample);
        }
        Self::new(samples.len(), cols, values)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.cols..(i + 1) * self.cols]
    }

    /// Column means.
    pub fn column_mean(&self) -> Vec<f64> {
        let mut mean = vec![0.0; self.cols];
        for row in self.values.chunks(self.cols) {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        let inv = 1.0 / self.rows as f64;
        mean.iter_mut().for_each(|m| *m *= inv);
        mean
    }

    /// Subtract the column mean in place and return it.
    pub fn center(&mut self) -> Vec<f64> {
        let mean = self.column_mean();
        for row in self.values.chunks_mut(self.cols) {
            for (v, m) in row.iter_mut().zip(&mean) {
                *v -= m;
            }
        }
        mean
    }

    /// N×N matrix of row dot products.
    pub fn self_covariance(&self) -> Vec<f64> {
        let n = self.rows;
        let mut out = vec![0.0; n * n];
        fill_rows(&mut out, n, |i, row| {
            let zi = self.row(i);
            for (j, v) in row.iter_mut().enumerate() {
                *v = zi.iter().zip(self.row(j)).map(|(a, b)| a * b).sum();
            }
        });
        out
    }
}

/// Centred samples and the mean that was removed.
#[derive(Debug, Clone)]
pub struct CenteredData {
    pub matrix: DataMatrix,
    pub mean: Vec<f64>,
}

impl CenteredData {
    pub fn from_matrix(mut matrix: DataMatrix) -> Self {
        let mean = matrix.center();
        Self { matrix, mean }
    }

    pub fn from_rows<R: AsRef<[f64]>>(samples: &[R]) -> ManifoldResult<Self> {
        Ok(Self::from_matrix(DataMatrix::from_rows(samples)?))
    }

    pub fn sample_count(&self) -> usize {
        self.matrix.rows()
    }

    pub fn coefficient_count(&self) -> usize {
        self.matrix.cols()
    }

    pub fn self_covariance(&self) -> Vec<f64> {
        self.matrix.self_covariance()
    }
}
