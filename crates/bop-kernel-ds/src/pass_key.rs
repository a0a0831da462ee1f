//! Order-independent keys over small sets of shape indices.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Unordered tuple of shape indices.
///
/// Two keys are equal when they hold the same multiset of indices, whatever
/// the insertion order. The sum of the ids is kept alongside so comparison
/// and hashing can reject most mismatches without sorting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassKey {
    ids: SmallVec<[usize; 4]>,
    sum: usize,
}

impl PassKey {
    /// An empty key.
    pub fn new() -> Self {
        Self::default()
    }

    /// A key over two indices.
    pub fn from_pair(i1: usize, i2: usize) -> Self {
        let mut key = Self::new();
        key.set_ids2(i1, i2);
        key
    }

    /// A key over any number of indices.
    pub fn from_ids(ids: &[usize]) -> Self {
        let mut key = Self::new();
        key.set_ids(ids);
        key
    }

    /// Reset the key to a single index.
    pub fn set_ids1(&mut self, i1: usize) {
        self.set_ids(&[i1]);
    }

    /// Reset the key to two indices.
    pub fn set_ids2(&mut self, i1: usize, i2: usize) {
        self.set_ids(&[i1, i2]);
    }

    /// Reset the key to three indices.
    pub fn set_ids3(&mut self, i1: usize, i2: usize, i3: usize) {
        self.set_ids(&[i1, i2, i3]);
    }

    /// Reset the key to four indices.
    pub fn set_ids4(&mut self, i1: usize, i2: usize, i3: usize, i4: usize) {
        self.set_ids(&[i1, i2, i3, i4]);
    }

    /// Reset the key to `ids`, kept in insertion order.
    pub fn set_ids(&mut self, ids: &[usize]) {
        self.ids = SmallVec::from_slice(ids);
        self.sum = ids.iter().fold(0usize, |acc, &i| acc.wrapping_add(i));
    }

    /// Number of stored ids.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True if the key holds no ids.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The `i`-th id in insertion order, 1-based.
    pub fn id(&self, i: usize) -> Option<usize> {
        i.checked_sub(1).and_then(|k| self.ids.get(k).copied())
    }

    /// Both ids of a two-id key, in insertion order.
    pub fn pair(&self) -> Option<(usize, usize)> {
        match self.ids.as_slice() {
            [a, b] => Some((*a, *b)),
            _ => None,
        }
    }

    /// Stored ids in insertion order.
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Sum of the ids (wrapping).
    pub fn sum(&self) -> usize {
        self.sum
    }

    /// Hash in `[0, upper]` derived from the id sum only.
    pub fn hash_code(&self, upper: usize) -> usize {
        match upper.checked_add(1) {
            Some(modulus) => self.sum % modulus,
            None => self.sum,
        }
    }

    fn sorted(&self) -> SmallVec<[usize; 4]> {
        let mut ids = self.ids.clone();
        ids.sort_unstable();
        ids
    }
}

impl PartialEq for PassKey {
    fn eq(&self, other: &Self) -> bool {
        self.sum == other.sum && self.ids.len() == other.ids.len() && self.sorted() == other.sorted()
    }
}

impl Eq for PassKey {}

impl Hash for PassKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ids.len().hash(state);
        self.sum.hash(state);
    }
}
