// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Pattern-Search Optimizer
// ─────────────────────────────────────────────────────────────────────
//! Hooke-Jeeves search over the latent coordinates.
//!
//! One pass:
//!   1. Exploratory move: every latent scalar in order tries `+step`,
//!      then `-step`. Trials stay inside (-1, 1) and are scored through
//!      the rank-one update; an improving trial is kept at once.
//!   2. Pattern move: if anything moved, the pass displacement is added
//!      to all coordinates repeatedly while the cost keeps falling. Each
//!      trial rebuilds K and inverts it densely.
//!   3. If nothing moved, the step shrinks by `reduce_step`.
//!
//! The search is converged once the step drops below `min_step`.
//! Cancellation and the deadline are checked between passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use manifold_types::{
    DegeneracyPolicy, KernelParams, ManifoldConfig, ManifoldError, ManifoldResult,
    OptimisationResult, OptimizerState, PassLog,
};

use crate::cost::cost;
use crate::covariance::{compute_cov_vector, kernel_matrix};
use crate::data::CenteredData;
use crate::latent::pca_latent_coordinates;
use crate::linalg::invert_spd;
use crate::rank_one::RankOneWorkspace;

/// Pivot magnitude below which a dense LU of K is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-14;

/// Relative cost drift reported by `refresh`.
const DRIFT_WARN: f64 = 1e-6;

/// Shared stop flag for a running `optimize`.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[inline]
fn inside_unit_box(v: f64) -> bool {
    v > -1.0 && v < 1.0
}

/// Latent-embedding optimiser.
///
/// Owns the evolving (X, K⁻¹, ln det K, cost) tuple. Trials are scored
/// in scratch buffers and swapped in only when they lower the cost.
pub struct PatternSearchOptimizer {
    cfg: ManifoldConfig,
    kernel: KernelParams,
    n: usize,
    coefficient_count: usize,
    latent_dim: usize,
    self_cov: Vec<f64>,

    latent: Vec<f64>,
    inverse: Vec<f64>,
    log_det: f64,
    cost: f64,

    step: f64,
    state: OptimizerState,
    passes: usize,
    displacement: Vec<f64>,
    log: Vec<PassLog>,
    cancel: CancelToken,
    degenerate_trials: usize,

    // Scratch
    workspace: RankOneWorkspace,
    trial_inverse: Vec<f64>,
    trial_latent: Vec<f64>,
    kernel_scratch: Vec<f64>,
    old_cov: Vec<f64>,
    new_cov: Vec<f64>,
    diff: Vec<f64>,
}

impl PatternSearchOptimizer {
    /// Seed from the PCA of centred samples.
    pub fn new(data: &CenteredData, cfg: ManifoldConfig) -> ManifoldResult<Self> {
        Self::from_self_covariance(
            data.self_covariance(),
            data.sample_count(),
            data.coefficient_count(),
            cfg,
        )
    }

    /// Seed from a precomputed N×N self-covariance of D-coefficient samples.
    pub fn from_self_covariance(
        self_cov: Vec<f64>,
        n: usize,
        coefficient_count: usize,
        cfg: ManifoldConfig,
    ) -> ManifoldResult<Self> {
        cfg.validate()?;
        check_self_cov(&self_cov, n)?;
        let latent = pca_latent_coordinates(&self_cov, n, cfg.latent_dim)?;
        Self::with_initial_latent(self_cov, n, coefficient_count, latent, cfg)
    }

    /// Start from explicit N·L coordinates, each strictly inside (-1, 1).
    pub fn with_initial_latent(
        self_cov: Vec<f64>,
        n: usize,
        coefficient_count: usize,
        latent: Vec<f64>,
        cfg: ManifoldConfig,
    ) -> ManifoldResult<Self> {
        cfg.validate()?;
        check_self_cov(&self_cov, n)?;
        if coefficient_count == 0 {
            return Err(ManifoldError::DataSource("samples have no coefficients".to_string()));
        }
        let l = cfg.latent_dim;
        if latent.len() != n * l {
            return Err(ManifoldError::Validation(format!(
                "expected {} latent values for {n} samples of dimension {l}, got {}",
                n * l,
                latent.len()
            )));
        }
        if let Some(i) = latent.iter().position(|&v| !inside_unit_box(v)) {
            return Err(ManifoldError::Validation(format!(
                "latent value {i} = {} is outside (-1, 1)",
                latent[i]
            )));
        }

        let kernel = cfg.kernel();
        let mut kernel_scratch = vec![0.0; n * n];
        kernel_matrix(&latent, l, &kernel, &mut kernel_scratch);
        let (inverse, log_det) = invert_spd(&kernel_scratch, n, PIVOT_TOLERANCE)?;
        let initial_cost = cost(&inverse, log_det, &self_cov, n, coefficient_count)?;

        log::info!(
            "Pattern search initialised: N={n}, D={coefficient_count}, L={l}, cost={initial_cost:.6}"
        );

        Ok(Self {
            step: cfg.initial_step,
            kernel,
            n,
            coefficient_count,
            latent_dim: l,
            self_cov,
            latent,
            inverse,
            log_det,
            cost: initial_cost,
            state: OptimizerState::Exploring,
            passes: 0,
            displacement: vec![0.0; n * l],
            log: Vec::new(),
            cancel: CancelToken::new(),
            degenerate_trials: 0,
            workspace: RankOneWorkspace::new(n),
            trial_inverse: vec![0.0; n * n],
            trial_latent: vec![0.0; n * l],
            kernel_scratch,
            old_cov: vec![0.0; n],
            new_cov: vec![0.0; n],
            diff: vec![0.0; n],
            cfg,
        })
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn config(&self) -> &ManifoldConfig {
        &self.cfg
    }

    pub fn state(&self) -> OptimizerState {
        self.state
    }

    pub fn step_size(&self) -> f64 {
        self.step
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn pass_log(&self) -> &[PassLog] {
        &self.log
    }

    pub fn cost_value(&self) -> f64 {
        self.cost
    }

    pub fn latent_variables(&self) -> &[f64] {
        &self.latent
    }

    /// K⁻¹, N×N row-major.
    pub fn inverse_mapping(&self) -> &[f64] {
        &self.inverse
    }

    pub fn log_determinant(&self) -> f64 {
        self.log_det
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn coefficient_count(&self) -> usize {
        self.coefficient_count
    }

    pub fn sample_count(&self) -> usize {
        self.n
    }

    pub fn kernel(&self) -> KernelParams {
        self.kernel
    }

    /// Handle that stops `optimize` before its next pass.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Snapshot of the current tuple.
    pub fn result(&self) -> OptimisationResult {
        OptimisationResult {
            sample_count: self.n,
            latent_dim: self.latent_dim,
            coefficient_count: self.coefficient_count,
            latent: self.latent.clone(),
            inverse_kernel: self.inverse.clone(),
            log_determinant: self.log_det,
            cost: self.cost,
            passes: self.passes,
            converged: self.state == OptimizerState::Converged,
            kernel: self.kernel,
        }
    }

    // ------------------------------------------------------------------
    // Exploratory move
    // ------------------------------------------------------------------

    /// Probe every latent scalar by ±step. Returns whether any moved.
    pub fn exploratory_move(&mut self) -> ManifoldResult<bool> {
        self.state = OptimizerState::Exploring;
        let step = self.step;
        let mut moved = false;

        for k in 0..self.latent.len() {
            self.displacement[k] = 0.0;
            for delta in [step, -step] {
                let candidate = self.latent[k] + delta;
                if !inside_unit_box(candidate) {
                    continue;
                }
                if self.try_scalar(k, candidate)? {
                    self.displacement[k] = delta;
                    moved = true;
                    break;
                }
            }
        }
        Ok(moved)
    }

    /// Score moving latent scalar `k` to `value`; keep it if cheaper.
    fn try_scalar(&mut self, k: usize, value: f64) -> ManifoldResult<bool> {
        let l = self.latent_dim;
        let c = k / l;
        let block = c * l..(c + 1) * l;

        compute_cov_vector(
            &self.latent,
            &self.latent[block.clone()],
            l,
            &self.kernel,
            &mut self.old_cov,
        );
        let previous = self.latent[k];
        self.latent[k] = value;
        compute_cov_vector(
            &self.latent,
            &self.latent[block],
            l,
            &self.kernel,
            &mut self.new_cov,
        );
        self.latent[k] = previous;

        for ((d, new), old) in self.diff.iter_mut().zip(&self.new_cov).zip(&self.old_cov) {
            *d = new - old;
        }

        let trial = self
            .workspace
            .update_into(
                &self.inverse,
                self.log_det,
                c,
                &self.diff,
                self.cfg.degeneracy_tolerance,
                &mut self.trial_inverse,
            )
            .and_then(|log_det| {
                cost(
                    &self.trial_inverse,
                    log_det,
                    &self.self_cov,
                    self.n,
                    self.coefficient_count,
                )
                .map(|value| (log_det, value))
            });

        match trial {
            Ok((log_det, trial_cost)) => {
                if trial_cost < self.cost {
                    std::mem::swap(&mut self.inverse, &mut self.trial_inverse);
                    self.log_det = log_det;
                    self.cost = trial_cost;
                    self.latent[k] = value;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            Err(e) => {
                self.on_degenerate(e)?;
                Ok(false)
            }
        }
    }

    fn on_degenerate(&mut self, err: ManifoldError) -> ManifoldResult<()> {
        match self.cfg.degeneracy_policy {
            DegeneracyPolicy::Abort => {
                log::error!("Pattern search aborted after {} passes: {err}", self.passes);
                Err(err)
            }
            DegeneracyPolicy::Reject => {
                self.degenerate_trials += 1;
                log::warn!("Rejected degenerate trial: {err}");
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Pattern move
    // ------------------------------------------------------------------

    /// Extrapolate along the last exploratory displacement while the
    /// cost improves. Returns the number of accepted extrapolations.
    pub fn pattern_move(&mut self) -> ManifoldResult<usize> {
        if self.displacement.iter().all(|&d| d == 0.0) {
            return Ok(0);
        }
        self.state = OptimizerState::PatternMoving;

        let n = self.n;
        let mut accepted = 0;
        while accepted < self.cfg.max_pattern_moves {
            let mut feasible = true;
            for ((t, &x), &d) in self
                .trial_latent
                .iter_mut()
                .zip(&self.latent)
                .zip(&self.displacement)
            {
                *t = x + d;
                feasible &= inside_unit_box(*t);
            }
            if !feasible {
                break;
            }

            kernel_matrix(
                &self.trial_latent,
                self.latent_dim,
                &self.kernel,
                &mut self.kernel_scratch,
            );
            let trial = invert_spd(&self.kernel_scratch, n, PIVOT_TOLERANCE).and_then(
                |(inverse, log_det)| {
                    cost(&inverse, log_det, &self.self_cov, n, self.coefficient_count)
                        .map(|value| (inverse, log_det, value))
                },
            );

            match trial {
                Ok((inverse, log_det, trial_cost)) if trial_cost < self.cost => {
                    std::mem::swap(&mut self.latent, &mut self.trial_latent);
                    self.inverse = inverse;
                    self.log_det = log_det;
                    self.cost = trial_cost;
                    accepted += 1;
                }
                Ok(_) => break,
                Err(e) => {
                    self.on_degenerate(e)?;
                    break;
                }
            }
        }
        Ok(accepted)
    }

    // ------------------------------------------------------------------
    // Passes
    // ------------------------------------------------------------------

    /// Run one exploratory pass plus pattern moves and anneal the step.
    ///
    /// A converged optimiser returns a log entry without doing any work.
    pub fn step_pass(&mut self) -> ManifoldResult<PassLog> {
        if self.state == OptimizerState::Converged {
            return Ok(PassLog {
                pass: self.passes,
                step: self.step,
                cost: self.cost,
                state: self.state,
                ..Default::default()
            });
        }

        self.degenerate_trials = 0;
        let step = self.step;
        let before = self.latent.clone();

        let moved = self.exploratory_move()?;
        let accepted_moves = if moved {
            before
                .iter()
                .zip(&self.latent)
                .filter(|(a, b)| a != b)
                .count()
        } else {
            0
        };
        let pattern_moves = if moved { self.pattern_move()? } else { 0 };
        if !moved {
            self.step *= self.cfg.reduce_step;
        }

        self.passes += 1;
        if self.cfg.refresh_interval > 0 && self.passes % self.cfg.refresh_interval == 0 {
            self.refresh()?;
        }

        self.state = if self.step < self.cfg.min_step {
            OptimizerState::Converged
        } else {
            OptimizerState::Exploring
        };

        let entry = PassLog {
            pass: self.passes,
            step,
            cost: self.cost,
            accepted_moves,
            pattern_moves,
            degenerate_trials: self.degenerate_trials,
            state: self.state,
        };
        log::debug!(
            "pass {}: step={:.4} cost={:.6} moves={} pattern={} degenerate={}",
            entry.pass,
            entry.step,
            entry.cost,
            entry.accepted_moves,
            entry.pattern_moves,
            entry.degenerate_trials
        );
        self.log.push(entry.clone());
        Ok(entry)
    }

    /// Run passes until convergence, the pass cap, cancellation, or the
    /// deadline. The optimiser stays usable after `Cancelled`/`Timeout`.
    pub fn optimize(&mut self) -> ManifoldResult<OptimisationResult> {
        let start = Instant::now();
        let deadline = self.cfg.deadline_ms.map(Duration::from_millis);

        while self.state != OptimizerState::Converged {
            if self.cancel.is_cancelled() {
                log::info!("Pattern search cancelled after {} passes", self.passes);
                return Err(ManifoldError::Cancelled {
                    passes: self.passes,
                });
            }
            if let Some(limit) = deadline {
                if start.elapsed() >= limit {
                    log::warn!(
                        "Pattern search hit its {} ms deadline after {} passes",
                        limit.as_millis(),
                        self.passes
                    );
                    return Err(ManifoldError::Timeout {
                        deadline_ms: limit.as_millis() as u64,
                    });
                }
            }
            if self.passes >= self.cfg.max_passes {
                log::warn!(
                    "Pattern search stopped un-converged at the {}-pass cap (step {:.4e})",
                    self.cfg.max_passes,
                    self.step
                );
                break;
            }
            self.step_pass()?;
        }

        if self.state == OptimizerState::Converged {
            // The returned inverse carries no rank-one drift.
            self.refresh()?;
            log::info!(
                "Pattern search converged: {} passes, cost={:.6}, {:.1} ms",
                self.passes,
                self.cost,
                start.elapsed().as_secs_f64() * 1e3
            );
        }
        Ok(self.result())
    }

    /// Re-derive K⁻¹, ln det K and the cost densely from the current
    /// coordinates, discarding accumulated rank-one drift.
    pub fn refresh(&mut self) -> ManifoldResult<()> {
        kernel_matrix(
            &self.latent,
            self.latent_dim,
            &self.kernel,
            &mut self.kernel_scratch,
        );
        let (inverse, log_det) = invert_spd(&self.kernel_scratch, self.n, PIVOT_TOLERANCE)?;
        let fresh = cost(
            &inverse,
            log_det,
            &self.self_cov,
            self.n,
            self.coefficient_count,
        )?;

        let drift = (fresh - self.cost).abs() / fresh.abs().max(1.0);
        if drift > DRIFT_WARN {
            log::warn!(
                "Refresh corrected cost drift {drift:.3e} ({:.9} -> {fresh:.9})",
                self.cost
            );
        }
        self.inverse = inverse;
        self.log_det = log_det;
        self.cost = fresh;
        Ok(())
    }
}

fn check_self_cov(self_cov: &[f64], n: usize) -> ManifoldResult<()> {
    if n == 0 {
        return Err(ManifoldError::DataSource("no samples".to_string()));
    }
    if self_cov.len() != n * n {
        return Err(ManifoldError::Validation(format!(
            "self-covariance must be {n}x{n}, got {} values",
            self_cov.len()
        )));
    }
    Ok(())
}
