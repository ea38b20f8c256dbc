//! A minimal top-N convenience function. The full top-N scorer is an
//! external collaborator out of scope for this engine; this exists only
//! so the `predict` contract can be exercised end-to-end without a
//! hand-built fixture for every test.

/// Scores `candidates` for `user` via `predict`, drops any candidate the
/// user already has an observed preference for, and returns the `n`
/// highest-scoring survivors, best first. Ties broken by candidate order.
pub fn recommend<F>(candidates: &[usize], observed: &[usize], n: usize, predict: F) -> Vec<usize>
where
    F: Fn(usize) -> f32,
{
    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .copied()
        .filter(|c| observed.binary_search(c).is_err())
        .map(|c| (c, predict(c)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(n).map(|(c, _)| c).collect()
}
