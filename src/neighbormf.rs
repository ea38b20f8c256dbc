//! `NeighborMF`: `FastALS` extended with a centroid-pull term toward each
//! item's neighbors. Target items pull toward their forward neighbor
//! list; source items pull toward the inverse neighbor list (items that
//! name them as a neighbor), making the coupling bidirectional.
//!
//! Source items are updated before target items within an item phase, so
//! the source sub-phase reads `V` as it stood before this item phase
//! (target factors from the previous outer iteration), while the target
//! sub-phase reads the freshly written source rows. Preserve this
//! ordering: reversing it introduces a read-after-write hazard.

use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::fastals::{compute_g, push_interaction_points, rr1_solve, Rr1Scratch};
use crate::hyper::HyperParameters;
use crate::index::PreferenceData;
use crate::matrix::FactorStore;
use crate::neighbors::ItemNeighborhoods;
use crate::partition::DomainPartition;

pub struct NeighborMf<'p, P> {
    hyper: HyperParameters,
    prefs: &'p P,
    partition: &'p DomainPartition,
    neighbors: &'p ItemNeighborhoods,
    pub factors: FactorStore,
}

impl<'p, P> NeighborMf<'p, P>
where
    P: PreferenceData + Sync,
{
    pub fn new(
        prefs: &'p P,
        partition: &'p DomainPartition,
        neighbors: &'p ItemNeighborhoods,
        hyper: HyperParameters,
    ) -> Self {
        NeighborMf {
            hyper,
            prefs,
            partition,
            neighbors,
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
            debug!(iter, "NeighborMF outer iteration complete");
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

    /// `C = Σ edges score * V[neighbor]`, `D = Σ edges score`: the
    /// centroid-pull accumulators folded into the RR1 coordinate update
    /// (`num += lambda_cross*C`, `den += lambda_cross*D`).
    fn centroid(edges: Option<&[(usize, f32)]>, v: &Array2<f32>, k: usize) -> (Vec<f32>, f32) {
        let mut c = vec![0.0f32; k];
        let mut d = 0.0f32;
        if let Some(edges) = edges {
            for &(neighbor, score) in edges {
                let row = v.row(neighbor);
                for kk in 0..k {
                    c[kk] += score * row[kk];
                }
                d += score;
            }
        }
        (c, d)
    }

    fn update_row(
        &self,
        item: usize,
        own_row: &[f32],
        u_fixed: &Array2<f32>,
        v_snapshot: &Array2<f32>,
        edges: Option<&[(usize, f32)]>,
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

        let (c, d) = Self::centroid(edges, v_snapshot, k);
        let centroid_num: Vec<f32> = c.iter().map(|x| lambda_cross * x).collect();
        let centroid_den = lambda_cross * d;

        rr1_solve(&mut w, scratch, lambda, &centroid_num, centroid_den);
        w
    }

    pub fn item_phase(&mut self) {
        let k = self.hyper.k();
        let lambda = self.hyper.lambda();
        let g = compute_g(&self.factors.u, lambda);
        let u = self.factors.u.clone();

        let target_items: Vec<usize> = self.partition.target_items().collect();
        let source_items: Vec<usize> = self.partition.source_items().collect();

        // Source sub-phase: pulled toward the target items that list them
        // as a neighbor (inverse map), read from last iteration's V.
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
                        self.neighbors.inv_neighbors(s),
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

        // Target sub-phase: pulled toward forward neighbors, which may
        // include the source rows just written above.
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
                        self.neighbors.neighbors(t),
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
