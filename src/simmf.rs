//! `SimMF`: `FastALS` extended with a pairwise-similarity cross-domain
//! coupling. Each item's RR1 problem gains one synthetic training point
//! per opposite-domain item, target `sim(this, opposite)`, confidence
//! `lambda_cross`. The item phase runs two sub-phases, all source items
//! then all target items, so the target sub-phase sees the source
//! factors the source sub-phase just wrote.

use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::fastals::{compute_g, push_interaction_points, rr1_solve, Rr1Scratch};
use crate::hyper::HyperParameters;
use crate::index::PreferenceData;
use crate::matrix::FactorStore;
use crate::partition::DomainPartition;
use crate::similarity::SimilarityOracle;

pub struct SimMf<'p, P, S> {
    hyper: HyperParameters,
    prefs: &'p P,
    partition: &'p DomainPartition,
    sim: &'p S,
    pub factors: FactorStore,
}

impl<'p, P, S> SimMf<'p, P, S>
where
    P: PreferenceData + Sync,
    S: SimilarityOracle + Sync,
{
    pub fn new(prefs: &'p P, partition: &'p DomainPartition, sim: &'p S, hyper: HyperParameters) -> Self {
        SimMf {
            hyper,
            prefs,
            partition,
            sim,
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
            debug!(iter, "SimMF outer iteration complete");
        }
        Ok(())
    }

    /// Unchanged from `FastALS`: plain RR1 against `V`, no cross term.
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
            .axis_iter(Axis(0))
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
            self.factors.u.row_mut(u).assign(&Array1::from(row));
        }
    }

    /// Updates one row of `V`, appending one synthetic point per item in
    /// `opposite` (target = `sim(this, opposite)`, confidence =
    /// `lambda_cross`) to the usual `(k+N)` points.
    fn update_row(
        &self,
        item: usize,
        own_row: &[f32],
        u_fixed: &Array2<f32>,
        v_snapshot: &Array2<f32>,
        opposite: &[usize],
        g: &Array2<f32>,
        scratch: &mut Rr1Scratch,
    ) -> Vec<f32> {
        let lambda = self.hyper.lambda();
        let alpha = self.hyper.alpha();
        let lambda_cross = self.hyper.lambda_cross();
        let k = self.hyper.k();

        let mut w: Vec<f32> = own_row.to_vec();
        scratch.begin();
        scratch.push_g_rows(g);
        push_interaction_points(scratch, u_fixed, self.prefs.item_users(item), alpha);
        for &other in opposite {
            let score = self.sim.sim(item, other);
            scratch.push_point(
                v_snapshot.row(other).as_slice().expect("contiguous V row"),
                score,
                lambda_cross,
            );
        }
        let zero_centroid = vec![0.0f32; k];
        rr1_solve(&mut w, scratch, lambda, &zero_centroid, 0.0);
        w
    }

    pub fn item_phase(&mut self) {
        let k = self.hyper.k();
        let lambda = self.hyper.lambda();
        let g = compute_g(&self.factors.u, lambda);
        let u = self.factors.u.clone();

        let target_items: Vec<usize> = self.partition.target_items().collect();
        let source_items: Vec<usize> = self.partition.source_items().collect();

        // Source sub-phase: opposite domain (target) factors are still the
        // previous iteration's values at this point.
        let v_before_source = self.factors.v.clone();
        let source_rows: Vec<(usize, Vec<f32>)> = source_items
            .par_iter()
            .map_init(
                || Rr1Scratch::new(k),
                |scratch, &s| {
                    let row = self.update_row(
                        s,
                        v_before_source.row(s).as_slice().expect("contiguous V row"),
                        &u,
                        &v_before_source,
                        &target_items,
                        &g,
                        scratch,
                    );
                    (s, row)
                },
            )
            .collect();
        for (s, row) in source_rows {
            self.factors.v.row_mut(s).assign(&Array1::from(row));
        }

        // Target sub-phase: opposite domain (source) factors are the ones
        // the sub-phase above just wrote.
        let v_before_target = self.factors.v.clone();
        let target_rows: Vec<(usize, Vec<f32>)> = target_items
            .par_iter()
            .map_init(
                || Rr1Scratch::new(k),
                |scratch, &t| {
                    let row = self.update_row(
                        t,
                        v_before_target.row(t).as_slice().expect("contiguous V row"),
                        &u,
                        &v_before_target,
                        &source_items,
                        &g,
                        scratch,
                    );
                    (t, row)
                },
            )
            .collect();
        for (t, row) in target_rows {
            self.factors.v.row_mut(t).assign(&Array1::from(row));
        }
    }

    pub fn predict(&self, u: usize, i: usize) -> f32 {
        self.factors.predict(u, i)
    }
}
