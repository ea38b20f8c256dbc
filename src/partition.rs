//! `DomainPartition`: the disjoint source/target item split `SimMF` and
//! `NeighborMF` update in separate sub-phases.

use std::collections::HashSet;

use crate::index::ItemId;

#[derive(Debug, Clone)]
pub struct DomainPartition {
    target_items: HashSet<ItemId>,
    num_items: usize,
}

impl DomainPartition {
    /// `target_items` is given explicitly; `source_items := all items \
    /// target_items`.
    pub fn new(num_items: usize, target_items: HashSet<ItemId>) -> Self {
        DomainPartition {
            target_items,
            num_items,
        }
    }

    pub fn is_target(&self, item: ItemId) -> bool {
        self.target_items.contains(&item)
    }

    pub fn is_source(&self, item: ItemId) -> bool {
        !self.is_target(item)
    }

    pub fn target_items(&self) -> impl Iterator<Item = ItemId> + '_ {
        (0..self.num_items).filter(move |i| self.is_target(*i))
    }

    pub fn source_items(&self) -> impl Iterator<Item = ItemId> + '_ {
        (0..self.num_items).filter(move |i| self.is_source(*i))
    }
}
