// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for the embedding optimiser hot paths:
//!   - Covariance vector (one kernel row)
//!   - Two-step rank-one inverse update
//!   - Cost evaluation (log-det + trace)
//!   - Dense LU inverse (pattern-move trial)
//!   - One full optimisation pass

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use manifold_core::{
    compute_cov_vector, cost, invert_spd, kernel_matrix, CenteredData, KernelParams,
    ManifoldConfig, PatternSearchOptimizer, RankOneWorkspace,
};

const SIZES: [usize; 3] = [64, 128, 256];
const L: usize = 2;

// ── Helpers ───────────────────────────────────────────────────────────

fn make_latent(n: usize) -> Vec<f64> {
    (0..n * L)
        .map(|i| (i as f64 * 0.618).sin() * 0.9)
        .collect()
}

fn make_data(n: usize) -> CenteredData {
    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let phi = i as f64 / n as f64 * std::f64::consts::TAU;
            (0..32)
                .map(|j| (phi + j as f64 * 0.2).cos() + 0.1 * (3.0 * phi).sin())
                .collect()
        })
        .collect();
    CenteredData::from_rows(&rows).expect("bench data")
}

fn make_inverse(latent: &[f64], n: usize, kernel: &KernelParams) -> (Vec<f64>, f64) {
    let mut km = vec![0.0; n * n];
    kernel_matrix(latent, L, kernel, &mut km);
    invert_spd(&km, n, 1e-14).expect("bench kernel must be invertible")
}

// ── Kernel ────────────────────────────────────────────────────────────

fn bench_cov_vector(c: &mut Criterion) {
    let kernel = KernelParams::default();
    let mut group = c.benchmark_group("cov_vector");
    for n in SIZES {
        let latent = make_latent(n);
        let mut out = vec![0.0; n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| compute_cov_vector(black_box(&latent), &latent[0..L], L, &kernel, &mut out))
        });
    }
    group.finish();
}

// ── Linear algebra ────────────────────────────────────────────────────

fn bench_rank_one_update(c: &mut Criterion) {
    let kernel = KernelParams::default();
    let mut group = c.benchmark_group("rank_one_update");
    for n in SIZES {
        let latent = make_latent(n);
        let (inv, log_det) = make_inverse(&latent, n, &kernel);
        let diff: Vec<f64> = (0..n).map(|i| 1e-3 * (i as f64 * 0.3).cos()).collect();
        let mut ws = RankOneWorkspace::new(n);
        let mut out = vec![0.0; n * n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| ws.update_into(black_box(&inv), log_det, n / 2, &diff, 1e-12, &mut out))
        });
    }
    group.finish();
}

fn bench_dense_inverse(c: &mut Criterion) {
    let kernel = KernelParams::default();
    let mut group = c.benchmark_group("dense_inverse");
    group.sample_size(20);
    for n in SIZES {
        let latent = make_latent(n);
        let mut km = vec![0.0; n * n];
        kernel_matrix(&latent, L, &kernel, &mut km);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| invert_spd(black_box(&km), n, 1e-14))
        });
    }
    group.finish();
}

fn bench_cost(c: &mut Criterion) {
    let kernel = KernelParams::default();
    let mut group = c.benchmark_group("cost");
    for n in SIZES {
        let latent = make_latent(n);
        let (inv, log_det) = make_inverse(&latent, n, &kernel);
        let self_cov = make_data(n).self_covariance();
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| cost(black_box(&inv), log_det, &self_cov, n, 32))
        });
    }
    group.finish();
}

// ── Optimiser ─────────────────────────────────────────────────────────

fn bench_single_pass(c: &mut Criterion) {
    let data = make_data(64);
    let cfg = ManifoldConfig {
        min_step: 1e-9,
        ..ManifoldConfig::default()
    };
    let mut group = c.benchmark_group("optimizer");
    group.sample_size(10);
    group.bench_function("step_pass_64", |b| {
        b.iter_batched(
            || PatternSearchOptimizer::new(&data, cfg.clone()).expect("optimizer"),
            |mut opt| opt.step_pass().expect("pass"),
            criterion::BatchSize::LargeInput,
        )
    });
    group.finish();
}

criterion_group!(kernel, bench_cov_vector);
criterion_group!(linalg, bench_rank_one_update, bench_dense_inverse, bench_cost);
criterion_group!(optimizer, bench_single_pass);
criterion_main!(kernel, linalg, optimizer);
