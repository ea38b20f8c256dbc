//! `ItemNeighborhoods`: per-item top-N neighbor lists with edge weights,
//! plus the reverse-edge (`inv_neighbors`) view `NeighborMF` needs for its
//! bidirectional source-item pull. Both directions are built in the same
//! pass, never lazily.

use std::collections::HashMap;

use crate::index::ItemId;

#[derive(Debug, Default, Clone)]
pub struct ItemNeighborhoods {
    neighbors: HashMap<ItemId, Vec<(ItemId, f32)>>,
    inv_neighbors: HashMap<ItemId, Vec<(ItemId, f32)>>,
    max_neighbors: usize,
}

impl ItemNeighborhoods {
    pub fn new(max_neighbors: usize) -> Self {
        ItemNeighborhoods {
            neighbors: HashMap::new(),
            inv_neighbors: HashMap::new(),
            max_neighbors,
        }
    }

    /// Adds a directed edge `source -> neighbor` with `score`, truncating
    /// `source`'s list to the `max_neighbors` bound (keeping the
    /// highest-scoring entries) and updating the inverse index in the same
    /// call.
    pub fn add_edge(&mut self, source: ItemId, neighbor: ItemId, score: f32) {
        if score.is_nan() {
            return;
        }

        let list = self.neighbors.entry(source).or_insert_with(Vec::new);
        list.push((neighbor, score));
        list.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        if self.max_neighbors > 0 && list.len() > self.max_neighbors {
            list.truncate(self.max_neighbors);
        }

        self.rebuild_inverse();
    }

    fn rebuild_inverse(&mut self) {
        self.inv_neighbors.clear();
        for (&source, list) in &self.neighbors {
            for &(neighbor, score) in list {
                self.inv_neighbors
                    .entry(neighbor)
                    .or_insert_with(Vec::new)
                    .push((source, score));
            }
        }
    }

    pub fn neighbors(&self, item: ItemId) -> Option<&[(ItemId, f32)]> {
        self.neighbors.get(&item).map(|v| v.as_slice())
    }

    pub fn inv_neighbors(&self, item: ItemId) -> Option<&[(ItemId, f32)]> {
        self.inv_neighbors.get(&item).map(|v| v.as_slice())
    }

    /// L1-normalizes every per-item neighbor list (and rebuilds the inverse
    /// index from the normalized weights) so each source item's edges sum
    /// to 1.
    pub fn normalize(&mut self) {
        for list in self.neighbors.values_mut() {
            let total: f32 = list.iter().map(|(_, s)| s.abs()).sum();
            if total > 0.0 {
                for (_, s) in list.iter_mut() {
                    *s /= total;
                }
            }
        }
        self.rebuild_inverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors_and_inverse_agree() {
        let mut neigh = ItemNeighborhoods::new(10);
        neigh.add_edge(0, 1, 0.5);
        neigh.add_edge(0, 2, 0.3);

        assert_eq!(neigh.neighbors(0).unwrap().len(), 2);
        assert!(neigh
            .inv_neighbors(1)
            .unwrap()
            .iter()
            .any(|&(s, _)| s == 0));
        assert!(neigh
            .inv_neighbors(2)
            .unwrap()
            .iter()
            .any(|&(s, _)| s == 0));
    }

    #[test]
    fn list_is_bounded_by_max_neighbors() {
        let mut neigh = ItemNeighborhoods::new(2);
        neigh.add_edge(0, 1, 0.1);
        neigh.add_edge(0, 2, 0.9);
        neigh.add_edge(0, 3, 0.5);

        let list = neigh.neighbors(0).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0], (2, 0.9));
    }

    #[test]
    fn normalize_makes_weights_sum_to_one() {
        let mut neigh = ItemNeighborhoods::new(10);
        neigh.add_edge(0, 1, 1.0);
        neigh.add_edge(0, 2, 3.0);
        neigh.normalize();

        let sum: f32 = neigh.neighbors(0).unwrap().iter().map(|(_, s)| s).sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nan_scores_are_ignored() {
        let mut neigh = ItemNeighborhoods::new(10);
        neigh.add_edge(0, 1, f32::NAN);
        assert!(neigh.neighbors(0).is_none());
    }

    #[test]
    fn missing_item_has_no_neighbors() {
        let neigh = ItemNeighborhoods::new(10);
        assert!(neigh.neighbors(42).is_none());
        assert!(neigh.inv_neighbors(42).is_none());
    }
}
