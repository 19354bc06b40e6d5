// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Core
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Fits a low-dimensional latent embedding to a set of measured
//! reflectance samples, together with the inverse kernel matrix the
//! decoder needs to map latent coordinates back to samples.
//!
//! Architecture:
//!   - Covariance: squared-exponential kernel + nugget, covariance vectors
//!   - Data: centring and self-covariance Z·Zᵀ
//!   - Linalg: pivoted LU → dense inverse and log-determinant
//!   - RankOne: two-step Sherman-Morrison update after one latent move
//!   - Cost: 0.5·(D·ln det K + tr(K⁻¹·Z·Zᵀ))
//!   - Spectral + Latent: Jacobi eigenpairs → PCA seed in (-1, 1)
//!   - Optimizer: Hooke-Jeeves pattern search with step annealing
//!
//! # Invariants
//!
//! 1. The tracked cost always equals `cost(K⁻¹, ln det K, Z·Zᵀ)` for the
//!    accepted state. Trials are evaluated in scratch buffers and only
//!    swapped in when they improve the cost.
//! 2. Every accepted latent scalar lies in the open interval (-1, 1).
//! 3. K itself is never kept; only K⁻¹ and ln det K are.

pub mod cost;
pub mod covariance;
pub mod data;
pub mod linalg;
pub mod latent;
pub mod optimizer;
pub mod parallel;
pub mod rank_one;
pub mod spectral;

pub use cost::{cost, cost_from_determinant, trace_product};
pub use covariance::{compute_cov_vector, covariance, kernel_matrix};
pub use data::{CenteredData, DataMatrix};
pub use latent::pca_latent_coordinates;
pub use linalg::{invert_spd, LuDecomposition};
pub use optimizer::{CancelToken, PatternSearchOptimizer};
pub use rank_one::{sherman_morrison_update, RankOneUpdate, RankOneWorkspace};
pub use spectral::SymmetricEigen;

pub use manifold_types::{
    DegeneracyPolicy, KernelParams, ManifoldConfig, ManifoldError, ManifoldResult,
    OptimisationResult, OptimizerState, PassLog,
};
