//! Maps whose iteration order is driven by their values.

use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
    hash::Hash,
};

#[derive(Debug, Clone)]
struct SortKey<K, V> {
    value: V,
    key: K,
    descending: bool,
}

impl<K: Ord, V: Ord> Ord for SortKey<K, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_value = if self.descending {
            other.value.cmp(&self.value)
        } else {
            self.value.cmp(&other.value)
        };
        by_value.then_with(|| self.key.cmp(&other.key))
    }
}

impl<K: Ord, V: Ord> PartialOrd for SortKey<K, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord, V: Ord> PartialEq for SortKey<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord, V: Ord> Eq for SortKey<K, V> {}

/// Key/value map iterated in value order, ties broken by ascending key.
///
/// Replacing the value of an existing key moves the key to its new position;
/// the old sort entry is removed before the new one is inserted so the
/// ordered index never holds a key twice.
#[derive(Debug, Clone)]
pub struct ValueSortedMap<K, V> {
    descending: bool,
    lookup: HashMap<K, V>,
    order: BTreeSet<SortKey<K, V>>,
}

impl<K, V> ValueSortedMap<K, V>
where
    K: Ord + Hash + Clone,
    V: Ord + Clone,
{
    /// Largest values first.
    pub fn descending() -> Self {
        Self::with_order(true)
    }

    /// Smallest values first.
    pub fn ascending() -> Self {
        Self::with_order(false)
    }

    fn with_order(descending: bool) -> Self {
        Self {
            descending,
            lookup: HashMap::new(),
            order: BTreeSet::new(),
        }
    }

    /// Insert or replace the value for `key`, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let previous = self.remove(&key);
        self.order.insert(SortKey {
            value: value.clone(),
            key: key.clone(),
            descending: self.descending,
        });
        self.lookup.insert(key, value);
        previous
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.lookup.remove(key)?;
        self.order.remove(&SortKey {
            value: value.clone(),
            key: key.clone(),
            descending: self.descending,
        });
        Some(value)
    }

    /// Value currently stored for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.lookup.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.lookup.clear();
        self.order.clear();
    }

    /// Entries in value order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.order.iter().map(|entry| (&entry.key, &entry.value))
    }

    /// Keys in value order.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.order.iter().map(|entry| &entry.key)
    }
}

impl<K, V> Extend<(K, V)> for ValueSortedMap<K, V>
where
    K: Ord + Hash + Clone,
    V: Ord + Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}
