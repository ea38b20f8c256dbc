//! `ImplicitALS`: the baseline Hu-Koren-Volinsky trainer. Each row's
//! normal equations are solved exactly via a dense LU decomposition.
//! `FastALS` (see [`crate::fastals`]) replaces this solve with a single
//! RR1 cycle; this module is the reference the RR1 approximation is
//! checked against conceptually.

use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::{RecomfError, Result};
use crate::hyper::HyperParameters;
use crate::index::PreferenceData;
use crate::matrix::{dot_view, full_gram, FactorStore};

/// Solves `(G0 + alpha * Σ_{i in interacted} v_i v_i^T + lambda*I) x = (1 +
/// alpha) * Σ_{i in interacted} v_i` for a single row, via dense LU.
///
/// `fixed` is the matrix held constant this phase (`V` in the user phase,
/// `U` in the item phase); `interacted` are the row ids of `fixed` this row
/// has a positive preference with.
pub fn solve_row_lu(
    g0: &ndarray::Array2<f32>,
    fixed: &ndarray::Array2<f32>,
    interacted: &[usize],
    lambda: f32,
    alpha: f32,
) -> Result<Vec<f32>> {
    let k = g0.nrows();
    let mut a = g0.clone();

    for &i in interacted {
        let row = fixed.row(i);
        for c1 in 0..k {
            let x1 = row[c1];
            if x1 == 0.0 {
                continue;
            }
            for c2 in 0..k {
                a[[c1, c2]] += alpha * x1 * row[c2];
            }
        }
    }
    for d in 0..k {
        a[[d, d]] += lambda;
    }

    let coef = 1.0 + alpha;
    let mut b = vec![0.0f32; k];
    for &i in interacted {
        let row = fixed.row(i);
        for c in 0..k {
            b[c] += coef * row[c];
        }
    }

    let na = DMatrix::from_row_slice(k, k, a.as_slice().expect("dense row-major A"));
    let bv = DVector::from_row_slice(&b);

    match na.lu().solve(&bv) {
        Some(x) => Ok(x.iter().copied().collect()),
        None => Err(RecomfError::degenerate(
            "singular normal-equation matrix (lambda=0 with an empty interaction set?)",
        )),
    }
}

pub struct ImplicitAls<'p, P> {
    hyper: HyperParameters,
    prefs: &'p P,
    pub factors: FactorStore,
}

impl<'p, P> ImplicitAls<'p, P>
where
    P: PreferenceData + Sync,
{
    pub fn new(prefs: &'p P, hyper: HyperParameters) -> Self {
        ImplicitAls {
            hyper,
            prefs,
            factors: FactorStore::init(0, 0, hyper.k()),
        }
    }

    pub fn set_k(&mut self, k: usize) -> Result<()> {
        self.hyper.set_k(k)
    }

    pub fn set_lambda(&mut self, lambda: f32) -> Result<()> {
        self.hyper.set_lambda(lambda)
    }

    pub fn set_iters(&mut self, iters: usize) -> Result<()> {
        self.hyper.set_iters(iters)
    }

    pub fn set_alpha(&mut self, alpha: f32) -> Result<()> {
        self.hyper.set_alpha(alpha)
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
            self.user_phase()?;
            self.item_phase()?;
            debug!(iter, "implicit ALS outer iteration complete");
        }
        Ok(())
    }

    pub fn user_phase(&mut self) -> Result<()> {
        let g0 = full_gram(&self.factors.v);
        let lambda = self.hyper.lambda();
        let alpha = self.hyper.alpha();
        let v = self.factors.v.clone();

        let rows: Vec<Vec<f32>> = (0..self.factors.u.nrows())
            .into_par_iter()
            .map(|u| solve_row_lu(&g0, &v, self.prefs.user_items(u), lambda, alpha))
            .collect::<Result<Vec<_>>>()?;

        for (u, row) in rows.into_iter().enumerate() {
            self.factors.u.row_mut(u).assign(&Array1::from(row));
        }
        Ok(())
    }

    pub fn item_phase(&mut self) -> Result<()> {
        let g0 = full_gram(&self.factors.u);
        let lambda = self.hyper.lambda();
        let alpha = self.hyper.alpha();
        let u = self.factors.u.clone();

        let rows: Vec<Vec<f32>> = (0..self.factors.v.nrows())
            .into_par_iter()
            .map(|i| solve_row_lu(&g0, &u, self.prefs.item_users(i), lambda, alpha))
            .collect::<Result<Vec<_>>>()?;

        for (i, row) in rows.into_iter().enumerate() {
            self.factors.v.row_mut(i).assign(&Array1::from(row));
        }
        Ok(())
    }

    pub fn predict(&self, u: usize, i: usize) -> f32 {
        self.factors.predict(u, i)
    }

    /// `Σ_{u,i} c_ui (p_ui - u^T v)^2 + lambda*(||U||^2 + ||V||^2)`, summed
    /// over every user-item pair, not just observed ones. Θ(|U|·|I|·k);
    /// intended for tests and diagnostics, not the hot path.
    pub fn compute_loss(&self) -> f32 {
        let lambda = self.hyper.lambda();
        let alpha = self.hyper.alpha();

        let fit: f32 = (0..self.factors.u.nrows())
            .into_par_iter()
            .map(|u| {
                let positives = self.prefs.user_items(u);
                let mut acc = 0.0f32;
                for i in 0..self.factors.v.nrows() {
                    let p = if positives.binary_search(&i).is_ok() {
                        1.0
                    } else {
                        0.0
                    };
                    let c = 1.0 + alpha * p;
                    let pred = dot_view(self.factors.u.row(u), self.factors.v.row(i));
                    let resid = p - pred;
                    acc += c * resid * resid;
                }
                acc
            })
            .sum();

        let reg = lambda
            * (crate::matrix::frobenius_sq(&self.factors.u) + crate::matrix::frobenius_sq(&self.factors.v));

        fit + reg
    }
}
