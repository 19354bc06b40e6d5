// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Sample Sources
// ─────────────────────────────────────────────────────────────────────
//! Re-readable access to the raw (uncentred) reflectance samples.
//!
//! The streaming reconstructor pulls samples one at a time through this
//! trait instead of keeping the N×D matrix resident. Readers backed by
//! files or devices implement it outside this crate.

use manifold_core::DataMatrix;
use manifold_types::{ManifoldError, ManifoldResult};

/// Trait for sample storage backends.
pub trait SampleSource: Send {
    /// Number of samples the source can serve.
    fn sample_count(&self) -> usize;

    /// Raw coefficients of sample `index`. May block.
    fn read_sample(&mut self, index: usize) -> ManifoldResult<Vec<f64>>;
}

/// Samples held in memory.
pub struct MatrixSource {
    matrix: DataMatrix,
}

impl MatrixSource {
    pub fn new(matrix: DataMatrix) -> Self {
        Self { matrix }
    }

    pub fn from_rows<R: AsRef<[f64]>>(samples: &[R]) -> ManifoldResult<Self> {
        Ok(Self::new(DataMatrix::from_rows(samples)?))
    }
}

impl SampleSource for MatrixSource {
    fn sample_count(&self) -> usize {
        self.matrix.rows()
    }

    fn read_sample(&mut self, index: usize) -> ManifoldResult<Vec<f64>> {
        if index >= self.matrix.rows() {
            return Err(ManifoldError::DataSource(format!(
                "sample {index} requested from a source of {}",
                self.matrix.rows()
            )));
        }
        Ok(self.matrix.row(index).to_vec())
    }
}

type ReadFn = Box<dyn FnMut(usize) -> ManifoldResult<Vec<f64>> + Send>;

/// Source that delegates every read to a closure.
pub struct FnSampleSource {
    count: usize,
    read_fn: ReadFn,
}

impl FnSampleSource {
    pub fn new(
        count: usize,
        read_fn: impl FnMut(usize) -> ManifoldResult<Vec<f64>> + Send + 'static,
    ) -> Self {
        Self {
            count,
            read_fn: Box::new(read_fn),
        }
    }
}

impl SampleSource for FnSampleSource {
    fn sample_count(&self) -> usize {
        self.count
    }

    fn read_sample(&mut self, index: usize) -> ManifoldResult<Vec<f64>> {
        if index >= self.count {
            return Err(ManifoldError::DataSource(format!(
                "sample {index} requested from a source of {}",
                self.count
            )));
        }
        (self.read_fn)(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix_source_reads_rows() {
        let mut src = MatrixSource::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        assert_eq!(src.sample_count(), 2);
        assert_eq!(src.read_sample(1).unwrap(), vec![3.0, 4.0]);
        assert!(matches!(
            src.read_sample(2),
            Err(ManifoldError::DataSource(_))
        ));
    }

    #[test]
    fn test_fn_source_counts_reads() {
        let mut reads = 0usize;
        let mut src = FnSampleSource::new(3, move |i| {
            reads += 1;
            Ok(vec![i as f64, reads as f64])
        });
        assert_eq!(src.read_sample(2).unwrap(), vec![2.0, 1.0]);
        assert_eq!(src.read_sample(0).unwrap(), vec![0.0, 2.0]);
        assert!(src.read_sample(3).is_err());
    }

    #[test]
    fn test_fn_source_propagates_errors() {
        let mut src = FnSampleSource::new(1, |_| {
            Err(ManifoldError::DataSource("unreadable".to_string()))
        });
        assert!(matches!(
            src.read_sample(0),
            Err(ManifoldError::DataSource(_))
        ));
    }
}
