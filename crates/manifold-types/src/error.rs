// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all manifold fitting and decoding failures.
#[derive(Error, Debug)]
pub enum ManifoldError {
    /// A sample could not be read or the data set is unusable.
    #[error("data source error: {0}")]
    DataSource(String),

    /// A sample does not have the expected coefficient count.
    #[error("dimension mismatch for sample {index}: expected {expected} coefficients, found {found}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    /// Singular matrix, non-positive determinant, or a rank-one update
    /// whose denominator collapsed.
    #[error("numerical degeneracy: {0}")]
    NumericalDegeneracy(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Invalid input (index out of range, inconsistent shapes).
    #[error("validation error: {0}")]
    Validation(String),

    /// Optimisation stopped through the cancellation token.
    #[error("optimisation cancelled after {passes} passes")]
    Cancelled { passes: usize },

    /// Optimisation exceeded its wall-clock budget.
    #[error("timeout: optimisation exceeded {deadline_ms}ms deadline")]
    Timeout { deadline_ms: u64 },

    /// Malformed parametrisation artifact.
    #[error("format error at line {line}: {message}")]
    Format { line: usize, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ManifoldResult<T> = Result<T, ManifoldError>;
