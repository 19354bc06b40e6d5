// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Records
// ─────────────────────────────────────────────────────────────────────
//! Serialisable records exchanged between the optimiser, the decoder,
//! and export collaborators.

use serde::{Deserialize, Serialize};

use crate::config::KernelParams;

/// Phase of the pattern-search state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OptimizerState {
    #[default]
    Initializing,
    Exploring,
    PatternMoving,
    Converged,
}

/// Log entry for one optimisation pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassLog {
    pub pass: usize,
    /// Step size the exploratory moves of this pass used.
    pub step: f64,
    /// Cost once the pass finished.
    pub cost: f64,
    pub accepted_moves: usize,
    pub pattern_moves: usize,
    pub degenerate_trials: usize,
    /// State the optimiser is left in.
    pub state: OptimizerState,
}

/// Converged (or interrupted) embedding and its inverse kernel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimisationResult {
    pub sample_count: usize,
    pub latent_dim: usize,
    pub coefficient_count: usize,
    /// N·L latent coordinates, one L-block per sample.
    pub latent: Vec<f64>,
    /// N×N inverse kernel matrix, row-major.
    pub inverse_kernel: Vec<f64>,
    /// Natural log of det(K).
    pub log_determinant: f64,
    pub cost: f64,
    pub passes: usize,
    pub converged: bool,
    pub kernel: KernelParams,
}

impl OptimisationResult {
    pub fn inverse_mapping(&self) -> &[f64] {
        &self.inverse_kernel
    }

    pub fn latent_variables(&self) -> &[f64] {
        &self.latent
    }

    pub fn cost_value(&self) -> f64 {
        self.cost
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn coefficient_count(&self) -> usize {
        self.coefficient_count
    }

    /// det(K). Underflows to 0 for large, tightly packed embeddings;
    /// use `log_determinant` for arithmetic.
    pub fn determinant(&self) -> f64 {
        self.log_determinant.exp()
    }

    /// Latent coordinate of sample `index`, or `None` past the end.
    pub fn latent_coordinate(&self, index: usize) -> Option<&[f64]> {
        if index >= self.sample_count {
            return None;
        }
        let l = self.latent_dim;
        self.latent.get(index * l..(index + 1) * l)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_result() -> OptimisationResult {
        OptimisationResult {
            sample_count: 3,
            latent_dim: 2,
            coefficient_count: 5,
            latent: vec![0.1, 0.2, -0.3, 0.4, 0.5, -0.6],
            inverse_kernel: vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            log_determinant: 2.0_f64.ln(),
            cost: -1.5,
            passes: 7,
            converged: true,
            kernel: KernelParams::default(),
        }
    }

    #[test]
    fn test_latent_coordinate_slices() {
        let r = sample_result();
        assert_eq!(r.latent_coordinate(1), Some(&[-0.3, 0.4][..]));
        assert!(r.latent_coordinate(3).is_none());
    }

    #[test]
    fn test_latent_coordinate_on_short_latent_is_none() {
        let json = r#"{"sample_count":3,"latent_dim":2,"coefficient_count":5,
            "latent":[0.1,0.2,-0.3],"inverse_kernel":[],"log_determinant":0.0,
            "cost":0.0,"passes":0,"converged":false,
            "kernel":{"length_scale":1.0,"nugget":0.0001}}"#;
        let r: OptimisationResult = serde_json::from_str(json).unwrap();
        assert_eq!(r.latent_coordinate(0), Some(&[0.1, 0.2][..]));
        assert!(r.latent_coordinate(1).is_none());
        assert!(r.latent_coordinate(2).is_none());
    }

    #[test]
    fn test_determinant_from_log() {
        let r = sample_result();
        assert!((r.determinant() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_result_json_round_trip_keeps_state() {
        let r = sample_result();
        let json = serde_json::to_string(&r).unwrap();
        let back: OptimisationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.latent, r.latent);
        assert_eq!(back.passes, 7);
        assert!(back.converged);
    }

    #[test]
    fn test_pass_log_default_state() {
        let log = PassLog::default();
        assert_eq!(log.state, OptimizerState::Initializing);
    }
}
