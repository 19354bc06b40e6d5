// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Configuration, error hierarchy, and shared records for the
//! reflectance manifold kernel: the latent-embedding optimiser and the
//! decoder that maps latent coordinates back to measured samples.

pub mod config;
pub mod error;
pub mod record;

pub use config::{DegeneracyPolicy, KernelParams, ManifoldConfig};
pub use error::{ManifoldError, ManifoldResult};
pub use record::{OptimisationResult, OptimizerState, PassLog};
