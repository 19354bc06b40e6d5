// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Decoder
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Turns a fitted embedding back into reflectance samples and persists
//! it for export collaborators.
//!
//! Both reconstruction strategies compute the same thing,
//! `k(x)ᵀ·K⁻¹·Z_c + mean`; they differ only in what they keep resident.
//! Pick `InMemoryReconstructor` for repeated decoding (map rendering,
//! batch export) and `StreamingReconstructor` when N×D does not fit.

pub mod artifact;
pub mod reconstruct;
pub mod source;

pub use artifact::{
    load_parametrisation, read_parametrisation, save_parametrisation, write_parametrisation,
    Parametrisation,
};
pub use reconstruct::{InMemoryReconstructor, LatentModel, Reconstructor, StreamingReconstructor};
pub use source::{FnSampleSource, MatrixSource, SampleSource};
