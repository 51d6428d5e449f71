//! Host-side square matrix helpers.
//!
//! Matrices are flat row-major `f32` slices of `n * n` elements.  The
//! reference multiply here is what device results are checked against.

use std::fmt::Write;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Naive triple-loop product of two `n`×`n` row-major matrices.
///
/// Each output element is accumulated in increasing `k` from `0.0`, the
/// same order the bundled kernel uses.
pub fn host_matrix_multiply(a: &[f32], b: &[f32], n: usize) -> Vec<f32> {
    assert_eq!(a.len(), n * n, "left operand must have n * n elements");
    assert_eq!(b.len(), n * n, "right operand must have n * n elements");
    let mut out = vec![0.0f32; n * n];
    for row in 0..n {
        for col in 0..n {
            let mut sum = 0.0f32;
            for k in 0..n {
                sum += a[row * n + k] * b[k * n + col];
            }
            out[row * n + col] = sum;
        }
    }
    out
}

/// An `n`×`n` matrix of random whole numbers in `0..100`.
pub fn populate_matrix(n: usize) -> Vec<f32> {
    fill_random(n, &mut rand::thread_rng())
}

/// Reproducible variant of [`populate_matrix`].
pub fn populate_matrix_seeded(n: usize, seed: u64) -> Vec<f32> {
    fill_random(n, &mut StdRng::seed_from_u64(seed))
}

fn fill_random(n: usize, rng: &mut impl Rng) -> Vec<f32> {
    (0..n * n).map(|_| rng.gen_range(0u32..100) as f32).collect()
}

/// The fixed 3×3 matrix `[[1,1,1],[2,2,2],[3,3,3]]`.
pub fn standard_matrix() -> Vec<f32> {
    vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0]
}

/// Exact element-wise equality.  Slices of different length never match.
pub fn compare_matrices(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

/// Render `m` as `n` rows of space-separated values with two decimals.
pub fn format_matrix(m: &[f32], n: usize) -> String {
    let mut out = String::new();
    for row in m.chunks(n.max(1)) {
        for value in row {
            let _ = write!(out, "{value:.2} ");
        }
        out.push('\n');
    }
    out
}

pub fn print_matrix(m: &[f32], n: usize) {
    print!("{}", format_matrix(m, n));
}
