// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{ManifoldError, ManifoldResult};

/// Covariance kernel constants. Fixed for a run, never learned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelParams {
    /// Length scale `l` of the squared-exponential kernel.
    pub length_scale: f64,
    /// Ridge `μ` added when two coordinates coincide.
    pub nugget: f64,
}

impl Default for KernelParams {
    fn default() -> Self {
        Self {
            length_scale: 1.0,
            nugget: 1e-4,
        }
    }
}

/// What the optimiser does when a rank-one update turns singular.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegeneracyPolicy {
    /// Treat the trial like an infeasible move and keep searching.
    Reject,
    /// Stop the run with `ManifoldError::NumericalDegeneracy`.
    Abort,
}

/// Runtime configuration for the latent-embedding optimiser.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifoldConfig {
    /// Embedding dimension L.
    /// Default: 2.
    pub latent_dim: usize,

    /// Kernel length scale `l`.
    /// Default: 1.0.
    pub length_scale: f64,

    /// Kernel nugget `μ`.
    /// Default: 1e-4.
    pub nugget: f64,

    /// Step size of the first exploratory pass.
    /// Default: 0.5.
    pub initial_step: f64,

    /// Factor applied to the step when a pass finds no improvement.
    /// Default: 0.5.
    pub reduce_step: f64,

    /// The search has converged once the step drops below this.
    /// Default: 0.01.
    pub min_step: f64,

    /// Maximum consecutive extrapolation trials after one exploratory pass.
    /// Default: 32.
    pub max_pattern_moves: usize,

    /// Hard cap on passes; reaching it ends the run un-converged.
    /// Default: 10000.
    pub max_passes: usize,

    /// Rank-one denominators with magnitude below this are singular.
    /// Default: 1e-12.
    pub degeneracy_tolerance: f64,

    /// Handling of singular rank-one updates.
    /// Default: Reject.
    pub degeneracy_policy: DegeneracyPolicy,

    /// Re-derive the dense inverse every this many passes (0 = never).
    /// Default: 0.
    pub refresh_interval: usize,

    /// Wall-clock budget for `optimize`, checked between passes.
    /// Default: None.
    pub deadline_ms: Option<u64>,
}

impl Default for ManifoldConfig {
    fn default() -> Self {
        Self {
            latent_dim: 2,
            length_scale: 1.0,
            nugget: 1e-4,
            initial_step: 0.5,
            reduce_step: 0.5,
            min_step: 0.01,
            max_pattern_moves: 32,
            max_passes: 10_000,
            degeneracy_tolerance: 1e-12,
            degeneracy_policy: DegeneracyPolicy::Reject,
            refresh_interval: 0,
            deadline_ms: None,
        }
    }
}

impl ManifoldConfig {
    /// Kernel constants carried by every model built from this config.
    pub fn kernel(&self) -> KernelParams {
        KernelParams {
            length_scale: self.length_scale,
            nugget: self.nugget,
        }
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> ManifoldResult<()> {
        if self.latent_dim == 0 {
            return Err(ManifoldError::Config("latent_dim must be >= 1".to_string()));
        }
        if !(self.length_scale.is_finite() && self.length_scale > 0.0) {
            return Err(ManifoldError::Config(format!(
                "length_scale must be finite and > 0, got {}",
                self.length_scale
            )));
        }
        if !(self.nugget.is_finite() && self.nugget >= 0.0) {
            return Err(ManifoldError::Config(format!(
                "nugget must be finite and >= 0, got {}",
                self.nugget
            )));
        }
        if !(self.reduce_step > 0.0 && self.reduce_step < 1.0) {
            return Err(ManifoldError::Config(format!(
                "reduce_step must be in (0, 1), got {}",
                self.reduce_step
            )));
        }
        if !(self.initial_step.is_finite() && self.initial_step > 0.0) {
            return Err(ManifoldError::Config(format!(
                "initial_step must be finite and > 0, got {}",
                self.initial_step
            )));
        }
        if !(self.min_step.is_finite() && self.min_step > 0.0) {
            return Err(ManifoldError::Config(format!(
                "min_step must be finite and > 0, got {}",
                self.min_step
            )));
        }
        if self.max_pattern_moves == 0 {
            return Err(ManifoldError::Config("max_pattern_moves must be >= 1".to_string()));
        }
        if self.max_passes == 0 {
            return Err(ManifoldError::Config("max_passes must be >= 1".to_string()));
        }
        if !(self.degeneracy_tolerance >= 0.0) {
            return Err(ManifoldError::Config(format!(
                "degeneracy_tolerance must be >= 0, got {}",
                self.degeneracy_tolerance
            )));
        }
        if self.deadline_ms == Some(0) {
            return Err(ManifoldError::Config("deadline_ms must be > 0 when set".to_string()));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ManifoldResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ManifoldError::Config(format!("JSON parse error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ManifoldConfig::default().validate().is_ok());
    }

    #[test]
    fn test_kernel_params_follow_config() {
        let cfg = ManifoldConfig {
            length_scale: 0.3,
            nugget: 0.02,
            ..ManifoldConfig::default()
        };
        let k = cfg.kernel();
        assert_eq!(k.length_scale, 0.3);
        assert_eq!(k.nugget, 0.02);
    }

    #[test]
    fn test_rejects_zero_latent_dim() {
        let cfg = ManifoldConfig {
            latent_dim: 0,
            ..ManifoldConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ManifoldError::Config(_))));
    }

    #[test]
    fn test_rejects_reduce_step_out_of_range() {
        for bad in [0.0, 1.0, 1.5, -0.2] {
            let cfg = ManifoldConfig {
                reduce_step: bad,
                ..ManifoldConfig::default()
            };
            assert!(cfg.validate().is_err(), "reduce_step={bad} should be rejected");
        }
    }

    #[test]
    fn test_rejects_nan_length_scale() {
        let cfg = ManifoldConfig {
            length_scale: f64::NAN,
            ..ManifoldConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_deadline() {
        let cfg = ManifoldConfig {
            deadline_ms: Some(0),
            ..ManifoldConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let cfg = ManifoldConfig::from_json(r#"{"latent_dim": 1, "min_step": 0.05}"#).unwrap();
        assert_eq!(cfg.latent_dim, 1);
        assert!((cfg.min_step - 0.05).abs() < 1e-12);
        assert!((cfg.reduce_step - 0.5).abs() < 1e-12);
        assert_eq!(cfg.degeneracy_policy, DegeneracyPolicy::Reject);
    }

    #[test]
    fn test_from_json_policy() {
        let cfg = ManifoldConfig::from_json(r#"{"degeneracy_policy": "Abort"}"#).unwrap();
        assert_eq!(cfg.degeneracy_policy, DegeneracyPolicy::Abort);
    }

    #[test]
    fn test_from_json_garbage() {
        assert!(matches!(
            ManifoldConfig::from_json("not json"),
            Err(ManifoldError::Config(_))
        ));
    }
}
