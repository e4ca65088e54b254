//! Insertion-ordered hash snapshot for the Hash variant.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::Snapshot;

#[cfg(feature = "fxhash")]
type IndexHasher = rustc_hash::FxBuildHasher;

#[cfg(not(feature = "fxhash"))]
type IndexHasher = std::collections::hash_map::RandomState;

/// A hash map that remembers insertion order.
///
/// Entries are stored in insertion order next to a key index. Re-inserting
/// an existing key replaces its value in place and keeps its position.
pub struct LinkedSnapshot<K, V> {
    entries: Vec<(K, V)>,
    index: HashMap<K, usize, IndexHasher>,
}

impl<K, V> LinkedSnapshot<K, V> {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::default(),
        }
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> + ExactSizeIterator {
        self.entries.iter().map(|(key, value)| (key, value))
    }
}

impl<K, V> Snapshot for LinkedSnapshot<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    type Key = K;
    type Value = V;

    fn empty_like(&self) -> Self {
        Self::new()
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&position| &self.entries[position].1)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&position) = self.index.get(&key) {
            return Some(std::mem::replace(&mut self.entries[position].1, value));
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
        None
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        let position = self.index.remove(key)?;
        let (_, value) = self.entries.remove(position);
        for (shifted, _) in &self.entries[position..] {
            if let Some(slot) = self.index.get_mut(shifted) {
                *slot -= 1;
            }
        }
        Some(value)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    #[inline]
    fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    fn entry_at(&self, index: usize) -> Option<(&K, &V)> {
        self.entries.get(index).map(|(key, value)| (key, value))
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<K: Clone + Hash + Eq, V: Clone> Clone for LinkedSnapshot<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            index: self.index.clone(),
        }
    }
}

impl<K, V> Default for LinkedSnapshot<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq + Clone, V: Clone> FromIterator<(K, V)> for LinkedSnapshot<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        for (key, value) in iter {
            snapshot.insert(key, value);
        }
        snapshot
    }
}

/// Equality ignores insertion order: two snapshots are equal when they map
/// the same keys to equal values.
impl<K, V> PartialEq for LinkedSnapshot<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key) == Some(value))
    }
}

impl<K: Hash + Eq + Clone, V: Clone + Eq> Eq for LinkedSnapshot<K, V> {}

/// Hashes as the wrapping sum of per-entry hashes, so that equal snapshots
/// hash equally whatever their insertion order.
impl<K: Hash, V: Hash> Hash for LinkedSnapshot<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let combined = self.entries.iter().fold(0_u64, |accumulator, entry| {
            let mut hasher = DefaultHasher::new();
            entry.hash(&mut hasher);
            accumulator.wrapping_add(hasher.finish())
        });
        self.entries.len().hash(state);
        combined.hash(state);
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for LinkedSnapshot<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for LinkedSnapshot<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        for (index, (key, value)) in self.iter().enumerate() {
            if index > 0 {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{key}: {value}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<K, V> serde::Serialize for LinkedSnapshot<K, V>
where
    K: serde::Serialize,
    V: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct LinkedSnapshotVisitor<K, V> {
    marker: std::marker::PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for LinkedSnapshotVisitor<K, V>
where
    K: serde::Deserialize<'de> + Hash + Eq + Clone,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = LinkedSnapshot<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut snapshot = LinkedSnapshot::new();
        while let Some((key, value)) = access.next_entry()? {
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for LinkedSnapshot<K, V>
where
    K: serde::Deserialize<'de> + Hash + Eq + Clone,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(LinkedSnapshotVisitor {
            marker: std::marker::PhantomData,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_remove_reindexes_following_entries() {
        let mut snapshot: LinkedSnapshot<&str, i32> =
            [("a", 1), ("b", 2), ("c", 3), ("d", 4)].into_iter().collect();
        assert_eq!(snapshot.remove(&"b"), Some(2));
        assert_eq!(snapshot.get(&"c"), Some(&3));
        assert_eq!(snapshot.get(&"d"), Some(&4));
        let keys: Vec<&str> = snapshot.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec!["a", "c", "d"]);
    }

    #[rstest]
    fn test_reinsert_keeps_position() {
        let mut snapshot: LinkedSnapshot<&str, i32> =
            [("x", 1), ("y", 2)].into_iter().collect();
        assert_eq!(snapshot.insert("x", 10), Some(1));
        let pairs: Vec<(&str, i32)> = snapshot.iter().map(|(key, value)| (*key, *value)).collect();
        assert_eq!(pairs, vec![("x", 10), ("y", 2)]);
    }

    #[rstest]
    fn test_equality_ignores_order() {
        let left: LinkedSnapshot<i32, i32> = [(1, 1), (2, 2)].into_iter().collect();
        let right: LinkedSnapshot<i32, i32> = [(2, 2), (1, 1)].into_iter().collect();
        assert_eq!(left, right);

        let mut left_hasher = DefaultHasher::new();
        let mut right_hasher = DefaultHasher::new();
        left.hash(&mut left_hasher);
        right.hash(&mut right_hasher);
        assert_eq!(left_hasher.finish(), right_hasher.finish());
    }
}
