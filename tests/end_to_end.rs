//! End-to-end training scenarios. Each exercises a full `train()` run
//! through the public API rather than an internal phase method.

use std::collections::HashSet;

use recomf::{
    DomainPartition, FastAls, HyperParameters, ImplicitAls, ItemNeighborhoods, NeighborMf,
    PairwiseSimilarity, PreferenceData, PreferenceIndex, SimMf,
};

fn hyper(k: usize, iters: usize) -> HyperParameters {
    let mut h = HyperParameters::default();
    h.set_k(k).unwrap();
    h.set_iters(iters).unwrap();
    h
}

/// Scenario 1: single user, single item.
#[test]
fn single_user_single_item() {
    let prefs = PreferenceIndex::from_pairs(vec![("u1", "i1")]);
    let mut als = ImplicitAls::new(&prefs, hyper(2, 5));
    als.train().unwrap();

    let u1 = prefs.user_id("u1").unwrap();
    let i1 = prefs.item_id("i1").unwrap();
    assert!(als.predict(u1, i1) > 0.0);
    assert!(als.predict(u1, 999).is_nan());
}

/// Scenario 2: two disjoint user groups.
#[test]
fn two_disjoint_groups() {
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
    let mut fast = FastAls::new(&prefs, hyper(4, 10));
    fast.train().unwrap();

    let u1 = prefs.user_id("u1").unwrap();
    let u3 = prefs.user_id("u3").unwrap();
    let i1 = prefs.item_id("i1").unwrap();
    let i3 = prefs.item_id("i3").unwrap();

    assert!(fast.predict(u1, i1) > fast.predict(u1, i3));
    assert!(fast.predict(u3, i3) > fast.predict(u3, i1));
}

/// Scenario 3: SimMF pairwise-similarity coupling.
#[test]
fn simmf_coupling_orders_similar_pair_higher() {
    let prefs = PreferenceIndex::from_pairs(vec![
        ("u1", "s1"),
        ("u1", "t1"),
        ("u2", "s2"),
        ("u2", "t2"),
        ("u3", "s1"),
        ("u3", "s2"),
    ]);

    let s1 = prefs.item_id("s1").unwrap();
    let s2 = prefs.item_id("s2").unwrap();
    let t1 = prefs.item_id("t1").unwrap();
    let t2 = prefs.item_id("t2").unwrap();

    let mut targets = HashSet::new();
    targets.insert(t1);
    targets.insert(t2);
    let partition = DomainPartition::new(prefs.items().len(), targets);

    let mut sim = PairwiseSimilarity::new();
    sim.insert(s1, t1, 0.9);
    sim.insert(s2, t2, 0.9);

    let mut h = hyper(4, 20);
    h.set_lambda_cross(1.0).unwrap();

    let mut model = SimMf::new(&prefs, &partition, &sim, h);
    model.train().unwrap();

    let dot = |a: usize, b: usize| {
        model
            .factors
            .v
            .row(a)
            .iter()
            .zip(model.factors.v.row(b).iter())
            .map(|(x, y)| x * y)
            .sum::<f32>()
    };

    assert!(dot(s1, t1) > dot(s1, t2));
}

/// Scenario 4: NeighborMF centroid pull.
#[test]
fn neighbormf_pull_shrinks_distance() {
    let prefs = PreferenceIndex::from_pairs(vec![("u1", "s"), ("u1", "t"), ("u2", "other")]);
    let s = prefs.item_id("s").unwrap();
    let t = prefs.item_id("t").unwrap();

    let mut targets = HashSet::new();
    targets.insert(t);
    let partition = DomainPartition::new(prefs.items().len(), targets);

    let mut neighbors = ItemNeighborhoods::new(10);
    neighbors.add_edge(t, s, 1.0);

    let mut baseline_hyper = hyper(3, 10);
    baseline_hyper.set_lambda_cross(0.0).unwrap();
    let mut baseline = NeighborMf::new(&prefs, &partition, &neighbors, baseline_hyper);
    baseline.train().unwrap();
    let dist_baseline: f32 = baseline
        .factors
        .v
        .row(t)
        .iter()
        .zip(baseline.factors.v.row(s).iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum();

    let mut pulled_hyper = hyper(3, 10);
    pulled_hyper.set_lambda_cross(10.0).unwrap();
    let mut pulled = NeighborMf::new(&prefs, &partition, &neighbors, pulled_hyper);
    pulled.train().unwrap();
    let dist_pulled: f32 = pulled
        .factors
        .v
        .row(t)
        .iter()
        .zip(pulled.factors.v.row(s).iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum();

    assert!(dist_pulled < dist_baseline);
}

/// Scenario 5: top-N ranking smoke test, built atop scenario 2's setup.
#[test]
fn topn_recommends_unseen_items_best_first() {
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
    let mut fast = FastAls::new(&prefs, hyper(4, 10));
    fast.train().unwrap();

    let u1 = prefs.user_id("u1").unwrap();
    let i1 = prefs.item_id("i1").unwrap();
    let i2 = prefs.item_id("i2").unwrap();
    let i3 = prefs.item_id("i3").unwrap();
    let i4 = prefs.item_id("i4").unwrap();

    let candidates = [i1, i2, i3, i4];
    let observed = {
        let mut v = prefs.user_items(u1).to_vec();
        v.sort_unstable();
        v
    };

    let recs = recomf::topn::recommend(&candidates, &observed, 2, |c| fast.predict(u1, c));

    assert_eq!(recs.len(), 2);
    assert!(recs.iter().all(|r| *r == i3 || *r == i4));
}

/// Scenario 6: loss regression guard on a synthetic 20x20 dataset.
#[test]
fn loss_regression_guard_is_non_increasing() {
    let pairs: Vec<(String, String)> = (0..20)
        .flat_map(|u| {
            (0..20)
                .filter(move |i| (u + i) % 3 == 0)
                .map(move |i| (format!("u{}", u), format!("i{}", i)))
        })
        .collect();
    let prefs = PreferenceIndex::from_pairs(pairs.iter().map(|(u, i)| (u.as_str(), i.as_str())));

    let mut als = ImplicitAls::new(&prefs, hyper(5, 1));
    als.train().unwrap();

    let mut last = als.compute_loss();
    for _ in 0..5 {
        als.user_phase().unwrap();
        als.item_phase().unwrap();
        let loss = als.compute_loss();
        assert!(
            loss <= last * 1.001 + 1e-3,
            "loss increased beyond tolerance: {} -> {}",
            last,
            loss
        );
        last = loss;
    }
}
