//! `FastALS`: replaces `ImplicitALS`'s per-row LU solve with a single RR1
//! (rank-one coordinate descent) cycle over a `(k+N)`-point weighted
//! regression. `compute_g` builds the `k` synthetic points that encode the
//! fixed `G0 + lambda*I` block exactly. [`rr1_solve`] is the single
//! parameterized routine; `SimMF` and `NeighborMF` both reuse it, supplying
//! extra points or a centroid pull that default to nothing in the plain
//! `FastALS` case.

use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::hyper::HyperParameters;
use crate::index::PreferenceData;
use crate::matrix::{dot, full_gram, FactorStore};

/// `G` such that `G^T G = Q^T Q + lambda*I`, stored as `k` rows
/// `G[j] = sqrt(lambda_j) * eigenvector_j`. `Q^T Q + lambda*I` is
/// symmetric positive-definite whenever `lambda > 0`, so eigenvalues are
/// real and non-negative; `max(., 0.0)` guards only against floating
/// round-off at eigenvalues that should be exactly zero.
pub fn compute_g(fixed: &Array2<f32>, lambda: f32) -> Array2<f32> {
    let k = fixed.ncols();
    let mut a0 = full_gram(fixed);
    for d in 0..k {
        a0[[d, d]] += lambda;
    }

    let na = DMatrix::from_row_slice(k, k, a0.as_slice().expect("dense row-major A0"));
    let eig = SymmetricEigen::new(na);

    let mut g = Array2::<f32>::zeros((k, k));
    for j in 0..k {
        let scale = eig.eigenvalues[j].max(0.0).sqrt();
        for c in 0..k {
            g[[j, c]] = scale * eig.eigenvectors[(c, j)];
        }
    }
    g
}

/// Per-row scratch for the `(k + N [+ extra])`-point RR1 regression.
/// Reused across rows within a worker: `begin` clears the point lists
/// without freeing the backing storage, so steady-state updates on rows
/// with similar interaction counts allocate nothing.
#[derive(Debug, Default)]
pub struct Rr1Scratch {
    x: Vec<f32>,
    y: Vec<f32>,
    c: Vec<f32>,
    e: Vec<f32>,
    k: usize,
}

impl Rr1Scratch {
    pub fn new(k: usize) -> Self {
        Rr1Scratch {
            x: Vec::new(),
            y: Vec::new(),
            c: Vec::new(),
            e: Vec::new(),
            k,
        }
    }

    pub fn begin(&mut self) {
        self.x.clear();
        self.y.clear();
        self.c.clear();
    }

    pub fn push_point(&mut self, x: &[f32], y: f32, c: f32) {
        debug_assert_eq!(x.len(), self.k);
        self.x.extend_from_slice(x);
        self.y.push(y);
        self.c.push(c);
    }

    pub fn push_g_rows(&mut self, g: &Array2<f32>) {
        for j in 0..g.nrows() {
            self.push_point(g.row(j).as_slice().expect("contiguous G row"), 0.0, 1.0);
        }
    }

    fn n_points(&self) -> usize {
        self.y.len()
    }

    fn x_row(&self, idx: usize) -> &[f32] {
        &self.x[idx * self.k..(idx + 1) * self.k]
    }
}

/// One RR1 coordinate-descent cycle, warm-started from the row's current
/// value in `w`. `centroid_num`/`centroid_den` are the `lambda_cross * C`
/// and `lambda_cross * D` terms `NeighborMF` adds; pass an all-zero slice
/// and `0.0` for plain FastALS/SimMF.
pub fn rr1_solve(w: &mut [f32], scratch: &mut Rr1Scratch, lambda: f32, centroid_num: &[f32], centroid_den: f32) {
    let k = scratch.k;
    let n = scratch.n_points();
    debug_assert_eq!(w.len(), k);
    debug_assert_eq!(centroid_num.len(), k);

    scratch.e.clear();
    scratch.e.resize(n, 0.0);
    for j in 0..n {
        scratch.e[j] = scratch.y[j] - dot(scratch.x_row(j), w);
    }

    for kk in 0..k {
        for j in 0..n {
            scratch.e[j] += w[kk] * scratch.x_row(j)[kk];
        }

        let mut a = 0.0f32;
        let mut d = 0.0f32;
        for j in 0..n {
            let xk = scratch.x_row(j)[kk];
            a += scratch.c[j] * xk * xk;
            d += scratch.c[j] * xk * scratch.e[j];
        }

        let num = d + centroid_num[kk];
        let den = lambda + a + centroid_den;
        w[kk] = if den.abs() > 1e-12 { num / den } else { 0.0 };

        for j in 0..n {
            scratch.e[j] -= w[kk] * scratch.x_row(j)[kk];
        }
    }
}

/// Appends the `N` positive-interaction points for one row: `x = Q[q]`, `y
/// = (1+alpha)/alpha`, `c = alpha`. This is the Pilászy et al.
/// residual-cancellation trick; document it, don't rederive it.
pub fn push_interaction_points(scratch: &mut Rr1Scratch, fixed: &Array2<f32>, interacted: &[usize], alpha: f32) {
    let target = (1.0 + alpha) / alpha;
    for &q in interacted {
        let row = fixed.row(q);
        scratch.push_point(row.as_slice().expect("contiguous fixed row"), target, alpha);
    }
}

pub struct FastAls<'p, P> {
    hyper: HyperParameters,
    prefs: &'p P,
    pub factors: FactorStore,
}

impl<'p, P> FastAls<'p, P>
where
    P: PreferenceData + Sync,
{
    pub fn new(prefs: &'p P, hyper: HyperParameters) -> Self {
        FastAls {
            hyper,
            prefs,
            factors: FactorStore::init(0, 0, hyper.k()),
        }
    }

    pub fn hyper(&self) -> &HyperParameters {
        &self.hyper
    }

    fn init_factors(&mut self) {
        let num_users = self.prefs.max_user_id().map(|m| m + 1).unwrap_or(0);
        let num_items = self.prefs.max_item_id().map(|m| m + 1).unwrap_or(0);
        self.factors = FactorStore::init(num_users, num_items, self.hyper.k());
    }

    #[instrument(skip(self), fields(k = self.hyper.k(), iters = self.hyper.iters()))]
    pub fn train(&mut self) -> Result<()> {
        self.init_factors();
        for iter in 0..self.hyper.iters() {
            self.user_phase();
            self.item_phase();
            debug!(iter, "fast ALS outer iteration complete");
        }
        Ok(())
    }

    /// The user phase is unchanged across every FastALS-derived variant:
    /// plain RR1 against `V`, no cross-domain term.
    pub fn user_phase(&mut self) {
        let k = self.hyper.k();
        let lambda = self.hyper.lambda();
        let alpha = self.hyper.alpha();
        let g = compute_g(&self.factors.v, lambda);
        let v = self.factors.v.clone();
        let zero_centroid = vec![0.0f32; k];

        let new_rows: Vec<Vec<f32>> = self
            .factors
            .u
            .axis_iter(ndarray::Axis(0))
            .into_par_iter()
            .enumerate()
            .map_init(
                || Rr1Scratch::new(k),
                |scratch, (u, row)| {
                    let mut w: Vec<f32> = row.to_vec();
                    scratch.begin();
                    scratch.push_g_rows(&g);
                    push_interaction_points(scratch, &v, self.prefs.user_items(u), alpha);
                    rr1_solve(&mut w, scratch, lambda, &zero_centroid, 0.0);
                    w
                },
            )
            .collect();

        for (u, row) in new_rows.into_iter().enumerate() {
            self.factors.u.row_mut(u).assign(&ndarray::Array1::from(row));
        }
    }

    /// Plain FastALS item phase: no cross-domain coupling. `SimMF` and
    /// `NeighborMF` override this with their own item-phase methods instead
    /// of calling this one.
    pub fn item_phase(&mut self) {
        let k = self.hyper.k();
        let lambda = self.hyper.lambda();
        let alpha = self.hyper.alpha();
        let g = compute_g(&self.factors.u, lambda);
        let u = self.factors.u.clone();
        let zero_centroid = vec![0.0f32; k];

        let new_rows: Vec<Vec<f32>> = self
            .factors
            .v
            .axis_iter(ndarray::Axis(0))
            .into_par_iter()
            .enumerate()
            .map_init(
                || Rr1Scratch::new(k),
                |scratch, (i, row)| {
                    let mut w: Vec<f32> = row.to_vec();
                    scratch.begin();
                    scratch.push_g_rows(&g);
                    push_interaction_points(scratch, &u, self.prefs.item_users(i), alpha);
                    rr1_solve(&mut w, scratch, lambda, &zero_centroid, 0.0);
                    w
                },
            )
            .collect();

        for (i, row) in new_rows.into_iter().enumerate() {
            self.factors.v.row_mut(i).assign(&ndarray::Array1::from(row));
        }
    }

    pub fn predict(&self, u: usize, i: usize) -> f32 {
        self.factors.predict(u, i)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PreferenceIndex;
    use crate::matrix::full_gram;

    #[test]
    fn g_reconstructs_gram_plus_lambda() {
        let q = Array2::from_shape_fn((6, 3), |(r, c)| ((r + 1) as f32) * 0.1 + c as f32 * 0.3);
        let lambda = 0.2;
        let g = compute_g(&q, lambda);

        let gtg = g.t().dot(&g);
        let mut expected = full_gram(&q);
        for d in 0..3 {
            expected[[d, d]] += lambda;
        }

        for i in 0..3 {
            for j in 0..3 {
                assert!((gtg[[i, j]] - expected[[i, j]]).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn disjoint_groups_prefer_their_own_items() {
        let prefs = PreferenceIndex::from_pairs(vec![
            ("u1", "i1"),
            ("u1", "i2"),
            ("u2", "i1"),
            ("u2", "i2"),
            ("u3", "i3"),
            ("u3", "i4"),
            ("u4", "i3"),
            ("u4", "i4"),
        ]);
        let mut hyper = HyperParameters::default();
        hyper.set_k(4).unwrap();
        hyper.set_iters(10).unwrap();

        let mut fast = FastAls::new(&prefs, hyper);
        fast.train().unwrap();

        let u1 = prefs.user_id("u1").unwrap();
        let u3 = prefs.user_id("u3").unwrap();
        let i1 = prefs.item_id("i1").unwrap();
        let i3 = prefs.item_id("i3").unwrap();

        assert!(fast.predict(u1, i1) > fast.predict(u1, i3));
        assert!(fast.predict(u3, i3) > fast.predict(u3, i1));
    }
}
