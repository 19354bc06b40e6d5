// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Reflectance Manifold Data-Parallel Helpers
// ─────────────────────────────────────────────────────────────────────
//! Side-effect-free loops that write distinct slots or reduce with `+`.
//!
//! With the `parallel` feature, loops at or above `PARALLEL_THRESHOLD`
//! items run on the rayon pool; smaller ones stay on the caller thread.
//! Reductions are not bit-reproducible across thread counts.

/// Minimum item count before work is split across threads.
pub const PARALLEL_THRESHOLD: usize = 128;

/// `out[i] = f(i)` for every slot.
pub fn fill_indexed<F>(out: &mut [f64], f: F)
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        if out.len() >= PARALLEL_THRESHOLD {
            out.par_iter_mut()
                .enumerate()
                .for_each(|(i, slot)| *slot = f(i));
            return;
        }
    }

    for (i, slot) in out.iter_mut().enumerate() {
        *slot = f(i);
    }
}

/// Calls `f(row_index, row)` on each `row_len`-sized chunk of `out`.
pub fn fill_rows<F>(out: &mut [f64], row_len: usize, f: F)
where
    F: Fn(usize, &mut [f64]) + Sync + Send,
{
    if row_len == 0 {
        return;
    }

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        if out.len() / row_len >= PARALLEL_THRESHOLD {
            out.par_chunks_mut(row_len)
                .enumerate()
                .for_each(|(i, row)| f(i, row));
            return;
        }
    }

    for (i, row) in out.chunks_mut(row_len).enumerate() {
        f(i, row);
    }
}

/// Σ f(i) for i in 0..len.
pub fn sum_indexed<F>(len: usize, f: F) -> f64
where
    F: Fn(usize) -> f64 + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        if len >= PARALLEL_THRESHOLD {
            return (0..len).into_par_iter().map(f).sum();
        }
    }

    (0..len).map(f).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_indexed_small_and_large() {
        for len in [3, PARALLEL_THRESHOLD * 2 + 1] {
            let mut out = vec![0.0; len];
            fill_indexed(&mut out, |i| i as f64 * 2.0);
            assert!(out.iter().enumerate().all(|(i, &v)| v == i as f64 * 2.0));
        }
    }

    #[test]
    fn test_fill_rows_visits_every_row() {
        let rows = PARALLEL_THRESHOLD + 5;
        let mut out = vec![0.0; rows * 3];
        fill_rows(&mut out, 3, |i, row| {
            for (j, v) in row.iter_mut().enumerate() {
                *v = (i * 3 + j) as f64;
            }
        });
        assert!(out.iter().enumerate().all(|(k, &v)| v == k as f64));
    }

    #[test]
    fn test_sum_indexed_matches_closed_form() {
        let len = 1000;
        let s = sum_indexed(len, |i| i as f64);
        assert!((s - (len * (len - 1) / 2) as f64).abs() < 1e-9);
        assert_eq!(sum_indexed(0, |_| 1.0), 0.0);
    }
}
