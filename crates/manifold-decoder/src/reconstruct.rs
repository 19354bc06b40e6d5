// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Reconstructor
// ─────────────────────────────────────────────────────────────────────
//! Decodes latent coordinates back into full reflectance vectors:
//!
//!   z(x) = k(x)ᵀ · K⁻¹ · Z_c + mean
//!
//! where k(x) is the covariance vector of x against every embedded
//! sample. Two storage strategies implement the `Reconstructor` trait:
//! `InMemoryReconstructor` caches K⁻¹·Z_c once, `StreamingReconstructor`
//! re-reads samples from a `SampleSource` on every call.

use parking_lot::Mutex;

use manifold_core::parallel::fill_rows;
use manifold_core::{compute_cov_vector, CenteredData, DataMatrix};
use manifold_types::{KernelParams, ManifoldError, ManifoldResult, OptimisationResult};

use crate::source::SampleSource;

/// Trait for reconstruction strategies.
pub trait Reconstructor: Send + Sync {
    /// Full sample vector (mean included) for latent coordinate `coord`.
    fn reconstruct(&self, coord: &[f64]) -> ManifoldResult<Vec<f64>>;

    /// Mean squared error between sample `index` and the decode of its
    /// own latent coordinate.
    fn reconstruction_error(&self, index: usize) -> ManifoldResult<f64>;

    fn latent_dim(&self) -> usize;

    fn coefficient_count(&self) -> usize;

    fn sample_count(&self) -> usize;

    /// `reconstruction_error` averaged over every sample.
    fn mean_reconstruction_error(&self) -> ManifoldResult<f64> {
        let n = self.sample_count();
        if n == 0 {
            return Err(ManifoldError::Validation("model has no samples".to_string()));
        }
        let mut total = 0.0;
        for i in 0..n {
            total += self.reconstruction_error(i)?;
        }
        Ok(total / n as f64)
    }

    /// Decode consecutive L-blocks of `coords`.
    fn reconstruct_batch(&self, coords: &[f64]) -> ManifoldResult<Vec<Vec<f64>>> {
        let l = self.latent_dim();
        check_batch(coords, l)?;
        coords.chunks(l).map(|c| self.reconstruct(c)).collect()
    }
}

fn check_batch(coords: &[f64], latent_dim: usize) -> ManifoldResult<()> {
    if coords.len() % latent_dim != 0 {
        return Err(ManifoldError::Validation(format!(
            "batch of {} values is not a multiple of latent dimension {latent_dim}",
            coords.len()
        )));
    }
    Ok(())
}

fn mean_squared_error(a: &[f64], b: &[f64]) -> f64 {
    let sum: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum();
    sum / a.len() as f64
}

// ── Model ─────────────────────────────────────────────────────────────

/// Read-only (K⁻¹, X, mean, L, kernel) tuple shared by both strategies.
#[derive(Debug, Clone)]
pub struct LatentModel {
    sample_count: usize,
    latent_dim: usize,
    inverse: Vec<f64>,
    latent: Vec<f64>,
    mean: Vec<f64>,
    kernel: KernelParams,
}

impl LatentModel {
    pub fn new(
        inverse: Vec<f64>,
        latent: Vec<f64>,
        mean: Vec<f64>,
        latent_dim: usize,
        kernel: KernelParams,
    ) -> ManifoldResult<Self> {
        if latent_dim == 0 || latent.is_empty() || latent.len() % latent_dim != 0 {
            return Err(ManifoldError::Validation(format!(
                "{} latent values do not form blocks of dimension {latent_dim}",
                latent.len()
            )));
        }
        let n = latent.len() / latent_dim;
        if inverse.len() != n * n {
            return Err(ManifoldError::Validation(format!(
                "inverse kernel has {} values, {n} samples need {}",
                inverse.len(),
                n * n
            )));
        }
        if mean.is_empty() {
            return Err(ManifoldError::Validation("mean vector is empty".to_string()));
        }
        Ok(Self {
            sample_count: n,
            latent_dim,
            inverse,
            latent,
            mean,
            kernel,
        })
    }

    /// Model of an optimisation run; `mean` is the vector removed when
    /// the samples were centred.
    pub fn from_result(result: &OptimisationResult, mean: Vec<f64>) -> ManifoldResult<Self> {
        if mean.len() != result.coefficient_count {
            return Err(ManifoldError::Validation(format!(
                "mean has {} coefficients, the embedding was fitted on {}",
                mean.len(),
                result.coefficient_count
            )));
        }
        Self::new(
            result.inverse_kernel.clone(),
            result.latent.clone(),
            mean,
            result.latent_dim,
            result.kernel,
        )
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn coefficient_count(&self) -> usize {
        self.mean.len()
    }

    pub fn inverse_kernel(&self) -> &[f64] {
        &self.inverse
    }

    pub fn latent(&self) -> &[f64] {
        &self.latent
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn kernel(&self) -> KernelParams {
        self.kernel
    }

    pub fn latent_coordinate(&self, index: usize) -> ManifoldResult<&[f64]> {
        if index >= self.sample_count {
            return Err(ManifoldError::Validation(format!(
                "sample index {index} out of range for {} samples",
                self.sample_count
            )));
        }
        let l = self.latent_dim;
        Ok(&self.latent[index * l..(index + 1) * l])
    }

    /// k(coord) against every embedded sample.
    pub fn covariance_with(&self, coord: &[f64]) -> ManifoldResult<Vec<f64>> {
        if coord.len() != self.latent_dim {
            return Err(ManifoldError::Validation(format!(
                "coordinate has {} values, latent dimension is {}",
                coord.len(),
                self.latent_dim
            )));
        }
        let mut cov = vec![0.0; self.sample_count];
        compute_cov_vector(&self.latent, coord, self.latent_dim, &self.kernel, &mut cov);
        Ok(cov)
    }

    /// Per-sample weights k(coord)ᵀ·K⁻¹.
    pub fn weights(&self, coord: &[f64]) -> ManifoldResult<Vec<f64>> {
        let cov = self.covariance_with(coord)?;
        let n = self.sample_count;
        let mut w = vec![0.0; n];
        for (i, &c) in cov.iter().enumerate() {
            if c == 0.0 {
                continue;
            }
            for (wj, &a) in w.iter_mut().zip(&self.inverse[i * n..(i + 1) * n]) {
                *wj += c * a;
            }
        }
        Ok(w)
    }
}

// ── In-memory strategy ────────────────────────────────────────────────

/// Keeps the centred samples and K⁻¹·Z_c resident.
pub struct InMemoryReconstructor {
    model: LatentModel,
    centered: DataMatrix,
    /// K⁻¹·Z_c, N×D row-major.
    projected: Vec<f64>,
}

impl InMemoryReconstructor {
    pub fn new(model: LatentModel, data: &CenteredData) -> ManifoldResult<Self> {
        if data.sample_count() != model.sample_count() {
            return Err(ManifoldError::Validation(format!(
                "model embeds {} samples, data has {}",
                model.sample_count(),
                data.sample_count()
            )));
        }
        if data.coefficient_count() != model.coefficient_count() {
            return Err(ManifoldError::Validation(format!(
                "model decodes {} coefficients, data has {}",
                model.coefficient_count(),
                data.coefficient_count()
            )));
        }

        let n = model.sample_count();
        let d = model.coefficient_count();
        let centered = data.matrix.clone();
        let inverse = model.inverse_kernel();
        let mut projected = vec![0.0; n * d];
        fill_rows(&mut projected, d, |i, row| {
            for k in 0..n {
                let a = inverse[i * n + k];
                if a == 0.0 {
                    continue;
                }
                for (p, &z) in row.iter_mut().zip(centered.row(k)) {
                    *p += a * z;
                }
            }
        });
        log::debug!("Cached K⁻¹·Z for {n} samples x {d} coefficients");

        Ok(Self {
            model,
            centered,
            projected,
        })
    }

    /// Build the model from `result` and the mean stored in `data`.
    pub fn from_result(result: &OptimisationResult, data: &CenteredData) -> ManifoldResult<Self> {
        let model = LatentModel::from_result(result, data.mean.clone())?;
        Self::new(model, data)
    }

    pub fn model(&self) -> &LatentModel {
        &self.model
    }

    /// Decode without adding the mean back.
    pub fn reconstruct_centered(&self, coord: &[f64]) -> ManifoldResult<Vec<f64>> {
        let cov = self.model.covariance_with(coord)?;
        let d = self.model.coefficient_count();
        let mut out = vec![0.0; d];
        for (i, &c) in cov.iter().enumerate() {
            if c == 0.0 {
                continue;
            }
            for (o, &p) in out.iter_mut().zip(&self.projected[i * d..(i + 1) * d]) {
                *o += c * p;
            }
        }
        Ok(out)
    }
}

impl Reconstructor for InMemoryReconstructor {
    fn reconstruct(&self, coord: &[f64]) -> ManifoldResult<Vec<f64>> {
        let mut out = self.reconstruct_centered(coord)?;
        for (o, m) in out.iter_mut().zip(self.model.mean()) {
            *o += m;
        }
        Ok(out)
    }

    fn reconstruction_error(&self, index: usize) -> ManifoldResult<f64> {
        let coord = self.model.latent_coordinate(index)?;
        let decoded = self.reconstruct_centered(coord)?;
        Ok(mean_squared_error(&decoded, self.centered.row(index)))
    }

    fn latent_dim(&self) -> usize {
        self.model.latent_dim()
    }

    fn coefficient_count(&self) -> usize {
        self.model.coefficient_count()
    }

    fn sample_count(&self) -> usize {
        self.model.sample_count()
    }

    fn reconstruct_batch(&self, coords: &[f64]) -> ManifoldResult<Vec<Vec<f64>>> {
        let l = self.latent_dim();
        check_batch(coords, l)?;

        #[cfg(feature = "parallel")]
        {
            use manifold_core::parallel::PARALLEL_THRESHOLD;
            use rayon::prelude::*;

            if coords.len() / l >= PARALLEL_THRESHOLD {
                return coords.par_chunks(l).map(|c| self.reconstruct(c)).collect();
            }
        }

        coords.chunks(l).map(|c| self.reconstruct(c)).collect()
    }
}

// ── Streaming strategy ────────────────────────────────────────────────

/// Constant-memory strategy: accumulates Σ wᵢ·(zᵢ - mean) by re-reading
/// each sample. Calls block on the source and are serialised by a lock,
/// so keep them out of tight loops.
pub struct StreamingReconstructor {
    model: LatentModel,
    source: Mutex<Box<dyn SampleSource>>,
}

impl StreamingReconstructor {
    pub fn new(model: LatentModel, source: impl SampleSource + 'static) -> ManifoldResult<Self> {
        if source.sample_count() != model.sample_count() {
            return Err(ManifoldError::DataSource(format!(
                "source serves {} samples, model embeds {}",
                source.sample_count(),
                model.sample_count()
            )));
        }
        let source: Box<dyn SampleSource> = Box::new(source);
        Ok(Self {
            model,
            source: Mutex::new(source),
        })
    }

    pub fn model(&self) -> &LatentModel {
        &self.model
    }

    fn read_centered(
        &self,
        source: &mut dyn SampleSource,
        index: usize,
    ) -> ManifoldResult<Vec<f64>> {
        let mut sample = source.read_sample(index)?;
        let d = self.model.coefficient_count();
        if sample.len() != d {
            return Err(ManifoldError::DimensionMismatch {
                index,
                expected: d,
                found: sample.len(),
            });
        }
        for (v, m) in sample.iter_mut().zip(self.model.mean()) {
            *v -= m;
        }
        Ok(sample)
    }

    fn accumulate(
        &self,
        source: &mut dyn SampleSource,
        coord: &[f64],
    ) -> ManifoldResult<Vec<f64>> {
        let w = self.model.weights(coord)?;
        let mut out = vec![0.0; self.model.coefficient_count()];
        for (i, &wi) in w.iter().enumerate() {
            if wi == 0.0 {
                continue;
            }
            let sample = self.read_centered(source, i)?;
            for (o, z) in out.iter_mut().zip(&sample) {
                *o += wi * z;
            }
        }
        Ok(out)
    }
}

impl Reconstructor for StreamingReconstructor {
    fn reconstruct(&self, coord: &[f64]) -> ManifoldResult<Vec<f64>> {
        let mut source = self.source.lock();
        let mut out = self.accumulate(&mut **source, coord)?;
        for (o, m) in out.iter_mut().zip(self.model.mean()) {
            *o += m;
        }
        Ok(out)
    }

    fn reconstruction_error(&self, index: usize) -> ManifoldResult<f64> {
        let coord = self.model.latent_coordinate(index)?;
        let mut source = self.source.lock();
        let decoded = self.accumulate(&mut **source, coord)?;
        let truth = self.read_centered(&mut **source, index)?;
        Ok(mean_squared_error(&decoded, &truth))
    }

    fn latent_dim(&self) -> usize {
        self.model.latent_dim()
    }

    fn coefficient_count(&self) -> usize {
        self.model.coefficient_count()
    }

    fn sample_count(&self) -> usize {
        self.model.sample_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FnSampleSource, MatrixSource};
    use manifold_core::{ManifoldConfig, PatternSearchOptimizer};

    fn raw_rows() -> Vec<Vec<f64>> {
        (0..7)
            .map(|i| {
                let phi = i as f64 * 0.8;
                (0..10)
                    .map(|j| 0.5 + 0.3 * (phi + j as f64 * 0.35).sin() + 0.05 * j as f64)
                    .collect()
            })
            .collect()
    }

    fn fitted() -> (CenteredData, OptimisationResult) {
        let data = CenteredData::from_rows(&raw_rows()).unwrap();
        let mut opt = PatternSearchOptimizer::new(&data, ManifoldConfig::default()).unwrap();
        let result = opt.optimize().unwrap();
        (data, result)
    }

    fn assert_close(a: &[f64], b: &[f64], tol: f64) {
        assert_eq!(a.len(), b.len());
        for (k, (x, y)) in a.iter().zip(b).enumerate() {
            assert!((x - y).abs() <= tol, "component {k}: {x} vs {y}");
        }
    }

    #[test]
    fn test_training_points_are_interpolated() {
        let (data, result) = fitted();
        let rec = InMemoryReconstructor::from_result(&result, &data).unwrap();
        let raw = raw_rows();
        for i in 0..raw.len() {
            let coord = result.latent_coordinate(i).unwrap();
            let decoded = rec.reconstruct(coord).unwrap();
            assert_close(&decoded, &raw[i], 1e-6);
        }
    }

    #[test]
    fn test_strategies_agree() {
        let (data, result) = fitted();
        let model = LatentModel::from_result(&result, data.mean.clone()).unwrap();
        let memory = InMemoryReconstructor::new(model.clone(), &data).unwrap();
        let streaming =
            StreamingReconstructor::new(model, MatrixSource::from_rows(&raw_rows()).unwrap())
                .unwrap();

        for coord in [[0.1, -0.2], [0.7, 0.7], [-0.95, 0.3]] {
            let a = memory.reconstruct(&coord).unwrap();
            let b = streaming.reconstruct(&coord).unwrap();
            assert_close(&a, &b, 1e-9);
        }
        for i in 0..memory.sample_count() {
            let a = memory.reconstruction_error(i).unwrap();
            let b = streaming.reconstruction_error(i).unwrap();
            assert!((a - b).abs() < 1e-12, "sample {i}: {a} vs {b}");
        }
    }

    #[test]
    fn test_far_coordinate_decodes_to_mean() {
        let (data, result) = fitted();
        let rec = InMemoryReconstructor::from_result(&result, &data).unwrap();
        let decoded = rec.reconstruct(&[50.0, -50.0]).unwrap();
        assert_close(&decoded, &data.mean, 1e-12);
    }

    #[test]
    fn test_optimised_embedding_reconstructs_sample_zero_at_least_as_well_as_pca() {
        let data = CenteredData::from_rows(&raw_rows()).unwrap();
        let mut opt = PatternSearchOptimizer::new(&data, ManifoldConfig::default()).unwrap();
        let seed = InMemoryReconstructor::from_result(&opt.result(), &data).unwrap();
        let seed_error = seed.reconstruction_error(0).unwrap();

        let converged = opt.optimize().unwrap();
        let rec = InMemoryReconstructor::from_result(&converged, &data).unwrap();
        let error = rec.reconstruction_error(0).unwrap();

        // Both embeddings interpolate their training points, so the
        // comparison only holds up to rounding.
        assert!(error <= seed_error + 1e-9, "converged {error} vs PCA {seed_error}");
        assert!(error < 1e-9);
    }

    #[test]
    fn test_mean_error_non_increasing_across_passes() {
        let data = CenteredData::from_rows(&raw_rows()).unwrap();
        let mut opt = PatternSearchOptimizer::new(&data, ManifoldConfig::default()).unwrap();
        let mut previous = InMemoryReconstructor::from_result(&opt.result(), &data)
            .unwrap()
            .mean_reconstruction_error()
            .unwrap();
        for _ in 0..8 {
            opt.step_pass().unwrap();
            let current = InMemoryReconstructor::from_result(&opt.result(), &data)
                .unwrap()
                .mean_reconstruction_error()
                .unwrap();
            assert!(
                current <= previous + 1e-9,
                "mean error rose from {previous} to {current}"
            );
            previous = current;
        }
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let (data, result) = fitted();
        let rec = InMemoryReconstructor::from_result(&result, &data).unwrap();
        assert!(matches!(
            rec.reconstruction_error(7),
            Err(ManifoldError::Validation(_))
        ));
        assert!(matches!(
            rec.reconstruct(&[0.0]),
            Err(ManifoldError::Validation(_))
        ));
    }

    #[test]
    fn test_streaming_rejects_wrong_sample_length() {
        let (data, result) = fitted();
        let model = LatentModel::from_result(&result, data.mean.clone()).unwrap();
        let rec = StreamingReconstructor::new(model, FnSampleSource::new(7, |_| Ok(vec![0.0; 3])))
            .unwrap();
        match rec.reconstruction_error(0) {
            Err(ManifoldError::DimensionMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, 10);
                assert_eq!(found, 3);
            }
            other => panic!("expected dimension mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_streaming_rejects_short_source() {
        let (data, result) = fitted();
        let model = LatentModel::from_result(&result, data.mean.clone()).unwrap();
        let source = MatrixSource::from_rows(&raw_rows()[..3]).unwrap();
        assert!(matches!(
            StreamingReconstructor::new(model, source),
            Err(ManifoldError::DataSource(_))
        ));
    }

    #[test]
    fn test_batch_matches_single_calls() {
        let (data, result) = fitted();
        let rec: Box<dyn Reconstructor> =
            Box::new(InMemoryReconstructor::from_result(&result, &data).unwrap());
        let coords = [0.1, 0.2, -0.3, 0.4, 0.0, 0.0];
        let batch = rec.reconstruct_batch(&coords).unwrap();
        assert_eq!(batch.len(), 3);
        for (k, decoded) in batch.iter().enumerate() {
            assert_eq!(decoded, &rec.reconstruct(&coords[k * 2..k * 2 + 2]).unwrap());
        }
        assert!(rec.reconstruct_batch(&coords[..5]).is_err());
    }

    #[test]
    fn test_large_batch() {
        let (data, result) = fitted();
        let rec = InMemoryReconstructor::from_result(&result, &data).unwrap();
        let coords: Vec<f64> = (0..400).map(|i| (i as f64 * 0.13).sin() * 0.9).collect();
        let batch = rec.reconstruct_batch(&coords).unwrap();
        assert_eq!(batch.len(), 200);
        assert_eq!(batch[137], rec.reconstruct(&coords[274..276]).unwrap());
    }

    #[test]
    fn test_model_shape_checks() {
        let k = KernelParams::default();
        assert!(LatentModel::new(vec![1.0; 4], vec![0.1, 0.2, 0.3], vec![0.0], 2, k).is_err());
        assert!(LatentModel::new(vec![1.0; 3], vec![0.1, 0.2], vec![0.0], 1, k).is_err());
        assert!(LatentModel::new(vec![1.0; 4], vec![0.1, 0.2], vec![], 1, k).is_err());
        let m = LatentModel::new(vec![1.0, 0.0, 0.0, 1.0], vec![0.1, 0.2], vec![0.0; 3], 1, k)
            .unwrap();
        assert_eq!(m.sample_count(), 2);
        assert_eq!(m.coefficient_count(), 3);
    }
}
