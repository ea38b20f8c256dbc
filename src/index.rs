//! `PreferenceIndex`: a bijection between opaque user/item identifiers and
//! dense zero-based integer ids, plus the user->items / item->users
//! adjacency sets the ALS phases iterate over.

use std::collections::HashMap;

use crate::error::{RecomfError, Result};

pub type UserId = usize;
pub type ItemId = usize;

/// The contract external loaders and scorers are built against.
/// `PreferenceIndex` is the only implementation in this crate; the trait
/// exists so trainers and tests can be written against the contract rather
/// than the concrete type.
pub trait PreferenceData {
    fn users(&self) -> &[String];
    fn items(&self) -> &[String];
    fn user_items(&self, u: UserId) -> &[ItemId];
    fn item_users(&self, i: ItemId) -> &[UserId];
    fn contains_user(&self, name: &str) -> bool;
    fn contains_item(&self, name: &str) -> bool;
    fn exists_preference(&self, u: UserId, i: ItemId) -> bool;
    fn user_id(&self, name: &str) -> Option<UserId>;
    fn item_id(&self, name: &str) -> Option<ItemId>;
    fn user(&self, id: UserId) -> Option<&str>;
    fn item(&self, id: ItemId) -> Option<&str>;
    fn max_user_id(&self) -> Option<UserId>;
    fn max_item_id(&self) -> Option<ItemId>;
    fn size(&self) -> usize;
}

/// Adjacency is kept as sorted `Vec<usize>` (binary-search insert), cheap for
/// the small per-user fan-out typical of implicit feedback, and it keeps
/// iteration order deterministic.
#[derive(Debug, Default, Clone)]
pub struct PreferenceIndex {
    user_names: Vec<String>,
    item_names: Vec<String>,
    user_lookup: HashMap<String, UserId>,
    item_lookup: HashMap<String, ItemId>,
    user_items: Vec<Vec<ItemId>>,
    item_users: Vec<Vec<UserId>>,
    num_observations: usize,
}

impl PreferenceIndex {
    pub fn new() -> Self {
        PreferenceIndex::default()
    }

    /// Builds an index from already-parsed `(user, item)` pairs. Parsing a
    /// preference *file* is the loader's job (see [`crate::loader`]); this
    /// only assembles the bijection and adjacency sets, which is the part of
    /// the "preference store" that is in scope for the engine.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut index = PreferenceIndex::new();
        for (u, i) in pairs {
            index.add(u, i);
        }
        index
    }

    fn intern_user(&mut self, name: &str) -> UserId {
        if let Some(&id) = self.user_lookup.get(name) {
            return id;
        }
        let id = self.user_names.len();
        self.user_names.push(name.to_string());
        self.user_lookup.insert(name.to_string(), id);
        self.user_items.push(Vec::new());
        id
    }

    fn intern_item(&mut self, name: &str) -> ItemId {
        if let Some(&id) = self.item_lookup.get(name) {
            return id;
        }
        let id = self.item_names.len();
        self.item_names.push(name.to_string());
        self.item_lookup.insert(name.to_string(), id);
        self.item_users.push(Vec::new());
        id
    }

    /// Records one `(user, item)` preference, interning both identifiers if
    /// they are new. Idempotent: adding the same pair twice is a no-op on
    /// the adjacency sets (but is still a no-op for `num_observations`, since
    /// duplicate lines in a preference file do not indicate a second
    /// observation of the same binary signal).
    pub fn add(&mut self, user: &str, item: &str) {
        let u = self.intern_user(user);
        let i = self.intern_item(item);

        if let Err(idx) = self.user_items[u].binary_search(&i) {
            self.user_items[u].insert(idx, i);
            let rev_idx = self.item_users[i].binary_search(&u).unwrap_err();
            self.item_users[i].insert(rev_idx, u);
            self.num_observations += 1;
        }
    }

    /// Unions adjacency with `other`, extending the id space as needed.
    pub fn merge(&mut self, other: &PreferenceIndex) {
        for (u, items) in other.user_names.iter().zip(other.user_items.iter()) {
            for &i in items {
                let item_name = &other.item_names[i];
                self.add(u, item_name);
            }
        }
    }

    pub fn num_observations(&self) -> usize {
        self.num_observations
    }
}

impl PreferenceData for PreferenceIndex {
    fn users(&self) -> &[String] {
        &self.user_names
    }

    fn items(&self) -> &[String] {
        &self.item_names
    }

    fn user_items(&self, u: UserId) -> &[ItemId] {
        self.user_items.get(u).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn item_users(&self, i: ItemId) -> &[UserId] {
        self.item_users.get(i).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn contains_user(&self, name: &str) -> bool {
        self.user_lookup.contains_key(name)
    }

    fn contains_item(&self, name: &str) -> bool {
        self.item_lookup.contains_key(name)
    }

    fn exists_preference(&self, u: UserId, i: ItemId) -> bool {
        self.user_items(u).binary_search(&i).is_ok()
    }

    fn user_id(&self, name: &str) -> Option<UserId> {
        self.user_lookup.get(name).copied()
    }

    fn item_id(&self, name: &str) -> Option<ItemId> {
        self.item_lookup.get(name).copied()
    }

    fn user(&self, id: UserId) -> Option<&str> {
        self.user_names.get(id).map(|s| s.as_str())
    }

    fn item(&self, id: ItemId) -> Option<&str> {
        self.item_names.get(id).map(|s| s.as_str())
    }

    fn max_user_id(&self) -> Option<UserId> {
        self.user_names.len().checked_sub(1)
    }

    fn max_item_id(&self) -> Option<ItemId> {
        self.item_names.len().checked_sub(1)
    }

    fn size(&self) -> usize {
        self.num_observations
    }
}

/// Validates a single field is non-empty; used by [`crate::loader`] to
/// surface `MalformedInput` at load time rather than during training.
pub fn require_nonempty_field(line: usize, field: &str, name: &str) -> Result<()> {
    if field.trim().is_empty() {
        return Err(RecomfError::malformed(
            line,
            format!("empty {} field", name),
        ));
    }
    Ok(())
}
