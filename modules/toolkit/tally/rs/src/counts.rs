use std::hash::Hash;

use indexmap::IndexMap;

use crate::reduce::Merge;

/// Sparse counts over a small, dynamic key set.
///
/// Keys keep the order in which they were first seen. A key that was never inserted is "absent",
/// which is not the same as being present with a zero count. Equality ignores key order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountVector<K: Hash + Eq> {
    counts: IndexMap<K, u64>,
}

impl<K: Hash + Eq> Default for CountVector<K> {
    fn default() -> Self {
        Self {
            counts: IndexMap::new(),
        }
    }
}

impl<K: Hash + Eq> CountVector<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            counts: IndexMap::with_capacity(capacity),
        }
    }

    /// Add `count` to the key, making it present even when `count` is zero.
    pub fn add(&mut self, key: K, count: u64) -> &mut Self {
        *self.counts.entry(key).or_insert(0) += count;
        self
    }

    pub fn get(&self, key: &K) -> Option<u64> {
        self.counts.get(key).copied()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.counts.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.counts.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, u64)> {
        self.counts.iter().map(|(k, v)| (k, *v))
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

impl<K: Hash + Eq> Merge for CountVector<K> {
    fn merge(&mut self, other: Self) {
        for (key, count) in other.counts {
            self.add(key, count);
        }
    }
}

impl<K: Hash + Eq> FromIterator<(K, u64)> for CountVector<K> {
    fn from_iter<T: IntoIterator<Item = (K, u64)>>(iter: T) -> Self {
        let mut counts = Self::new();
        for (key, count) in iter {
            counts.add(key, count);
        }
        counts
    }
}

impl<K: Hash + Eq> IntoIterator for CountVector<K> {
    type Item = (K, u64);
    type IntoIter = indexmap::map::IntoIter<K, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.into_iter()
    }
}
