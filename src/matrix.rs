//! `MatrixOps` and `FactorStore`: the dense primitives everything else in
//! the engine is built from. Storage is row-major `ndarray::Array2<f32>`.

use ndarray::{Array2, ArrayView1};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Fixed seed for Gaussian initialization. Two runs over identical inputs
/// and hyperparameters must produce identical factors, so this is part of
/// the public contract, not an implementation detail.
pub const INIT_SEED: u64 = 0x5EED_F0B0_1234_5678;

pub fn dot(x: &[f32], y: &[f32]) -> f32 {
    debug_assert_eq!(x.len(), y.len());
    x.iter().zip(y).map(|(a, b)| a * b).sum()
}

pub fn dot_view(x: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
    x.iter().zip(y.iter()).map(|(a, b)| a * b).sum()
}

/// `target += s * v` (AXPY), in place.
pub fn add(target: &mut [f32], v: &[f32], s: f32) {
    debug_assert_eq!(target.len(), v.len());
    for (t, x) in target.iter_mut().zip(v) {
        *t += s * x;
    }
}

pub fn sq_l2(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum()
}

pub fn frobenius_sq(m: &Array2<f32>) -> f32 {
    m.iter().map(|x| x * x).sum()
}

pub fn sq_distance(v: &[f32], w: &[f32]) -> f32 {
    debug_assert_eq!(v.len(), w.len());
    v.iter().zip(w).map(|(a, b)| (a - b) * (a - b)).sum()
}

/// Fills `rows x cols` with independent draws from `N(mean, std_dev^2)`,
/// seeded from [`INIT_SEED`] combined with `stream` so that `U` and `V`
/// (different streams) do not share a draw sequence while both remain
/// deterministic across runs.
pub fn gaussian_init(rows: usize, cols: usize, mean: f32, std_dev: f32, stream: u64) -> Array2<f32> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(INIT_SEED ^ stream.wrapping_mul(0x9E37_79B9));
    let normal = Normal::new(mean, std_dev).expect("std_dev must be finite and >= 0");
    Array2::from_shape_fn((rows, cols), |_| normal.sample(&mut rng))
}

/// Symmetric `c x c` Gram matrix `Σ_{P(row)} A[row] ⊗ A[row]`, computed over
/// only the upper triangle and mirrored.
pub fn masked_gram<P>(a: &Array2<f32>, predicate: P) -> Array2<f32>
where
    P: Fn(usize) -> bool,
{
    let cols = a.ncols();
    let mut g = Array2::<f32>::zeros((cols, cols));
    for row_idx in 0..a.nrows() {
        if !predicate(row_idx) {
            continue;
        }
        let row = a.row(row_idx);
        for c1 in 0..cols {
            let x1 = row[c1];
            if x1 == 0.0 {
                continue;
            }
            for c2 in c1..cols {
                g[[c1, c2]] += x1 * row[c2];
            }
        }
    }
    for c1 in 0..cols {
        for c2 in (c1 + 1)..cols {
            g[[c2, c1]] = g[[c1, c2]];
        }
    }
    g
}

pub fn full_gram(a: &Array2<f32>) -> Array2<f32> {
    masked_gram(a, |_| true)
}

/// `U` (users x k) and `V` (items x k): the two dense factor matrices every
/// trainer in the engine reads from and writes to.
#[derive(Debug, Clone)]
pub struct FactorStore {
    pub u: Array2<f32>,
    pub v: Array2<f32>,
    k: usize,
}

impl FactorStore {
    /// Allocates `U` (num_users x k) and `V` (num_items x k), Gaussian
    /// initialized with `N(0, 0.1^2)` from the deterministic seed.
    pub fn init(num_users: usize, num_items: usize, k: usize) -> Self {
        FactorStore {
            u: gaussian_init(num_users, k, 0.0, 0.1, 1),
            v: gaussian_init(num_items, k, 0.0, 0.1, 2),
            k,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn predict(&self, u: usize, i: usize) -> f32 {
        if u >= self.u.nrows() || i >= self.v.nrows() {
            return f32::NAN;
        }
        dot_view(self.u.row(u), self.v.row(i))
    }
}
