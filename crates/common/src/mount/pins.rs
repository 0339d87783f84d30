use std::collections::HashSet;
use std::ops::Deref;

use crate::linked_data::Hash;

/// Set of block hashes a mount has written since it was opened.
///
/// These are the blocks a caller needs kept alive if it intends to persist
/// the mount's current root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pins(HashSet<Hash>);

impl Deref for Pins {
    type Target = HashSet<Hash>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Pins {
    pub fn new() -> Self {
        Pins(HashSet::new())
    }

    pub fn insert(&mut self, hash: Hash) -> bool {
        self.0.insert(hash)
    }

    pub fn extend<I>(&mut self, hashes: I)
    where
        I: IntoIterator<Item = Hash>,
    {
        self.0.extend(hashes)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.0.contains(hash)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hash> {
        self.0.iter()
    }
}
