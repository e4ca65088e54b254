//! Comparator-ordered snapshot for the Tree variant.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Bound, Range};
use std::sync::Arc;

use super::Snapshot;

// =============================================================================
// Comparator
// =============================================================================

/// A total order over keys.
///
/// Cheap to clone; every snapshot copy shares the same comparison function.
pub struct Comparator<K> {
    compare: Arc<dyn Fn(&K, &K) -> Ordering + Send + Sync>,
}

impl<K: Ord + 'static> Comparator<K> {
    /// The natural order of `K`.
    #[must_use]
    pub fn natural() -> Self {
        Self::new(|left: &K, right: &K| left.cmp(right))
    }
}

impl<K> Comparator<K> {
    /// Creates a comparator from a comparison function.
    ///
    /// The function must describe a total order that never changes for a
    /// given pair of keys.
    pub fn new<F>(compare: F) -> Self
    where
        F: Fn(&K, &K) -> Ordering + Send + Sync + 'static,
    {
        Self {
            compare: Arc::new(compare),
        }
    }

    /// Compares two keys.
    #[inline]
    pub fn compare(&self, left: &K, right: &K) -> Ordering {
        (self.compare)(left, right)
    }

    /// Returns the opposite order.
    #[must_use]
    pub fn reversed(&self) -> Self
    where
        K: 'static,
    {
        let compare = Arc::clone(&self.compare);
        Self::new(move |left, right| compare(right, left))
    }
}

impl<K> Clone for Comparator<K> {
    fn clone(&self) -> Self {
        Self {
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<K: Ord + 'static> Default for Comparator<K> {
    fn default() -> Self {
        Self::natural()
    }
}

impl<K> fmt::Debug for Comparator<K> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Comparator").finish_non_exhaustive()
    }
}

// =============================================================================
// KeyRange
// =============================================================================

/// A contiguous range of keys, expressed in comparator order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange<K> {
    lower: Bound<K>,
    upper: Bound<K>,
}

impl<K> KeyRange<K> {
    /// The range containing every key.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            lower: Bound::Unbounded,
            upper: Bound::Unbounded,
        }
    }

    /// Creates a range from explicit bounds.
    #[must_use]
    pub const fn new(lower: Bound<K>, upper: Bound<K>) -> Self {
        Self { lower, upper }
    }

    /// The lower bound.
    #[inline]
    pub const fn lower(&self) -> &Bound<K> {
        &self.lower
    }

    /// The upper bound.
    #[inline]
    pub const fn upper(&self) -> &Bound<K> {
        &self.upper
    }

    /// Returns `true` if `key` lies within the range.
    pub fn contains(&self, key: &K, comparator: &Comparator<K>) -> bool {
        let above_lower = match &self.lower {
            Bound::Unbounded => true,
            Bound::Included(lower) => comparator.compare(key, lower) != Ordering::Less,
            Bound::Excluded(lower) => comparator.compare(key, lower) == Ordering::Greater,
        };
        let below_upper = match &self.upper {
            Bound::Unbounded => true,
            Bound::Included(upper) => comparator.compare(key, upper) != Ordering::Greater,
            Bound::Excluded(upper) => comparator.compare(key, upper) == Ordering::Less,
        };
        above_lower && below_upper
    }

    /// Returns the range of keys contained in both `self` and `other`.
    ///
    /// Restricting a view and then restricting it again is equivalent to
    /// restricting it once with the intersection.
    #[must_use]
    pub fn intersect(&self, other: &Self, comparator: &Comparator<K>) -> Self
    where
        K: Clone,
    {
        Self {
            lower: tighter(&self.lower, &other.lower, comparator, Ordering::Greater),
            upper: tighter(&self.upper, &other.upper, comparator, Ordering::Less),
        }
    }
}

impl<K> Default for KeyRange<K> {
    fn default() -> Self {
        Self::full()
    }
}

/// Picks the more restrictive of two bounds. `wins` is the ordering a key
/// must have relative to the other to be the tighter one.
fn tighter<K: Clone>(
    left: &Bound<K>,
    right: &Bound<K>,
    comparator: &Comparator<K>,
    wins: Ordering,
) -> Bound<K> {
    match (left, right) {
        (Bound::Unbounded, bound) | (bound, Bound::Unbounded) => bound.clone(),
        (
            Bound::Included(left_key) | Bound::Excluded(left_key),
            Bound::Included(right_key) | Bound::Excluded(right_key),
        ) => {
            match comparator.compare(left_key, right_key) {
                Ordering::Equal => {
                    if matches!(left, Bound::Excluded(_)) {
                        left.clone()
                    } else {
                        right.clone()
                    }
                }
                ordering if ordering == wins => left.clone(),
                _ => right.clone(),
            }
        }
    }
}

// =============================================================================
// SortedSnapshot
// =============================================================================

/// A map kept sorted under a [`Comparator`].
///
/// Entries live in one contiguous vector, so a copy is a single allocation
/// and navigation is a binary search.
pub struct SortedSnapshot<K, V> {
    entries: Vec<(K, V)>,
    comparator: Comparator<K>,
}

impl<K: Ord + 'static, V> SortedSnapshot<K, V> {
    /// Creates an empty snapshot ordered by the natural order of `K`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(Comparator::natural())
    }
}

impl<K, V> SortedSnapshot<K, V> {
    /// Creates an empty snapshot ordered by `comparator`.
    #[must_use]
    pub const fn with_comparator(comparator: Comparator<K>) -> Self {
        Self {
            entries: Vec::new(),
            comparator,
        }
    }

    /// The comparator ordering this snapshot.
    #[inline]
    pub const fn comparator(&self) -> &Comparator<K> {
        &self.comparator
    }

    /// Iterates over the entries in comparator order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> + ExactSizeIterator {
        self.entries.iter().map(|(key, value)| (key, value))
    }

    fn search(&self, key: &K) -> Result<usize, usize> {
        self.entries
            .binary_search_by(|(candidate, _)| self.comparator.compare(candidate, key))
    }

    /// Index of the first entry satisfying the lower bound.
    pub(crate) fn start_index(&self, lower: &Bound<K>) -> usize {
        match lower {
            Bound::Unbounded => 0,
            Bound::Included(key) => self
                .entries
                .partition_point(|(candidate, _)| self.comparator.compare(candidate, key) == Ordering::Less),
            Bound::Excluded(key) => self
                .entries
                .partition_point(|(candidate, _)| self.comparator.compare(candidate, key) != Ordering::Greater),
        }
    }

    /// Index one past the last entry satisfying the upper bound.
    pub(crate) fn end_index(&self, upper: &Bound<K>) -> usize {
        match upper {
            Bound::Unbounded => self.entries.len(),
            Bound::Included(key) => self
                .entries
                .partition_point(|(candidate, _)| self.comparator.compare(candidate, key) != Ordering::Greater),
            Bound::Excluded(key) => self
                .entries
                .partition_point(|(candidate, _)| self.comparator.compare(candidate, key) == Ordering::Less),
        }
    }

    /// Positions covered by `range`. Empty when the bounds cross.
    pub(crate) fn index_range(&self, range: &KeyRange<K>) -> Range<usize> {
        let start = self.start_index(range.lower());
        let end = self.end_index(range.upper()).max(start);
        start..end
    }
}

impl<K, V> Snapshot for SortedSnapshot<K, V>
where
    K: Clone,
    V: Clone,
{
    type Key = K;
    type Value = V;

    fn empty_like(&self) -> Self {
        Self::with_comparator(self.comparator.clone())
    }

    fn get(&self, key: &K) -> Option<&V> {
        self.search(key)
            .ok()
            .map(|index| &self.entries[index].1)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.search(&key) {
            Ok(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            Err(index) => {
                self.entries.insert(index, (key, value));
                None
            }
        }
    }

    /// Sorts the incoming pairs once and merges them in, instead of shifting
    /// the vector for every pair.
    fn insert_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut incoming: Vec<(K, V)> = entries.into_iter().collect();
        // Reversed so a stable sort puts the last pair for a key first
        incoming.reverse();
        incoming.sort_by(|(left, _), (right, _)| self.comparator.compare(left, right));
        incoming.dedup_by(|later, kept| self.comparator.compare(&later.0, &kept.0) == Ordering::Equal);

        if self.entries.is_empty() {
            self.entries = incoming;
            return;
        }

        let existing = std::mem::take(&mut self.entries);
        let mut merged = Vec::with_capacity(existing.len() + incoming.len());
        let mut existing = existing.into_iter().peekable();
        let mut incoming = incoming.into_iter().peekable();
        while let (Some((old, _)), Some((new, _))) = (existing.peek(), incoming.peek()) {
            match self.comparator.compare(old, new) {
                Ordering::Less => merged.extend(existing.next()),
                Ordering::Greater => merged.extend(incoming.next()),
                Ordering::Equal => {
                    existing.next();
                    merged.extend(incoming.next());
                }
            }
        }
        merged.extend(existing);
        merged.extend(incoming);
        self.entries = merged;
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.search(key)
            .ok()
            .map(|index| self.entries.remove(index).1)
    }

    fn clear(&mut self) {
        self.entries.clear();
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

impl<K: Clone, V: Clone> Clone for SortedSnapshot<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            comparator: self.comparator.clone(),
        }
    }
}

impl<K: Ord + 'static, V> Default for SortedSnapshot<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Clone + 'static, V: Clone> FromIterator<(K, V)> for SortedSnapshot<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut snapshot = Self::new();
        snapshot.insert_all(iter);
        snapshot
    }
}

/// Equality compares entries only; two snapshots with different comparators
/// but the same entries in the same order are equal.
impl<K: PartialEq, V: PartialEq> PartialEq for SortedSnapshot<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<K: Eq, V: Eq> Eq for SortedSnapshot<K, V> {}

impl<K: Hash, V: Hash> Hash for SortedSnapshot<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.len().hash(state);
        for (key, value) in &self.entries {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SortedSnapshot<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for SortedSnapshot<K, V> {
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
impl<K, V> serde::Serialize for SortedSnapshot<K, V>
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
struct SortedSnapshotVisitor<K, V> {
    marker: std::marker::PhantomData<(K, V)>,
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for SortedSnapshotVisitor<K, V>
where
    K: serde::Deserialize<'de> + Ord + Clone + 'static,
    V: serde::Deserialize<'de> + Clone,
{
    type Value = SortedSnapshot<K, V>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some(entry) = access.next_entry()? {
            entries.push(entry);
        }
        let mut snapshot = SortedSnapshot::new();
        snapshot.insert_all(entries);
        Ok(snapshot)
    }
}

/// Deserialized snapshots use the natural order of `K`.
#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for SortedSnapshot<K, V>
where
    K: serde::Deserialize<'de> + Ord + Clone + 'static,
    V: serde::Deserialize<'de> + Clone,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(SortedSnapshotVisitor {
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

    fn snapshot_of(keys: &[i32]) -> SortedSnapshot<i32, i32> {
        keys.iter().map(|&key| (key, key * 10)).collect()
    }

    #[rstest]
    fn test_insert_keeps_order() {
        let snapshot = snapshot_of(&[5, 1, 9, 3]);
        let keys: Vec<i32> = snapshot.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![1, 3, 5, 9]);
    }

    #[rstest]
    fn test_insert_all_keeps_last_duplicate() {
        let mut snapshot = snapshot_of(&[2, 4, 6]);
        snapshot.insert_all([(5, 1), (4, 1), (1, 1), (5, 2), (4, 2), (8, 1)]);
        let entries: Vec<(i32, i32)> = snapshot.iter().map(|(key, value)| (*key, *value)).collect();
        assert_eq!(
            entries,
            vec![(1, 1), (2, 20), (4, 2), (5, 2), (6, 60), (8, 1)]
        );
    }

    #[rstest]
    fn test_insert_all_into_empty_matches_single_inserts() {
        let pairs: Vec<(i32, i32)> = (0..200).map(|step| ((step * 37) % 50, step)).collect();
        let mut bulk = SortedSnapshot::with_comparator(Comparator::<i32>::natural().reversed());
        bulk.insert_all(pairs.clone());
        let mut single = SortedSnapshot::with_comparator(Comparator::<i32>::natural().reversed());
        for (key, value) in pairs {
            single.insert(key, value);
        }
        assert_eq!(bulk, single);
        assert_eq!(bulk.len(), 50);
    }

    #[rstest]
    fn test_reversed_comparator() {
        let mut snapshot = SortedSnapshot::with_comparator(Comparator::<i32>::natural().reversed());
        for key in [2, 7, 4] {
            snapshot.insert(key, ());
        }
        let keys: Vec<i32> = snapshot.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, vec![7, 4, 2]);
    }

    #[rstest]
    #[case(Bound::Included(5), Bound::Unbounded, 2..5)]
    #[case(Bound::Excluded(5), Bound::Unbounded, 3..5)]
    #[case(Bound::Unbounded, Bound::Excluded(5), 0..2)]
    #[case(Bound::Unbounded, Bound::Included(5), 0..3)]
    #[case(Bound::Included(4), Bound::Included(4), 2..2)]
    #[case(Bound::Included(9), Bound::Included(1), 4..4)]
    fn test_index_range(
        #[case] lower: Bound<i32>,
        #[case] upper: Bound<i32>,
        #[case] expected: Range<usize>,
    ) {
        let snapshot = snapshot_of(&[1, 3, 5, 7, 9]);
        assert_eq!(snapshot.index_range(&KeyRange::new(lower, upper)), expected);
    }

    #[rstest]
    fn test_intersect_picks_tighter_bounds() {
        let comparator = Comparator::natural();
        let outer = KeyRange::new(Bound::Included(2), Bound::Excluded(10));
        let inner = KeyRange::new(Bound::Excluded(2), Bound::Included(20));
        let combined = outer.intersect(&inner, &comparator);
        assert_eq!(combined, KeyRange::new(Bound::Excluded(2), Bound::Excluded(10)));
    }

    #[rstest]
    fn test_contains_respects_bounds() {
        let comparator = Comparator::natural();
        let range = KeyRange::new(Bound::Excluded(1), Bound::Included(3));
        assert!(!range.contains(&1, &comparator));
        assert!(range.contains(&2, &comparator));
        assert!(range.contains(&3, &comparator));
        assert!(!range.contains(&4, &comparator));
    }

    #[rstest]
    fn test_display() {
        assert_eq!(format!("{}", snapshot_of(&[2, 1])), "{1: 10, 2: 20}");
        assert_eq!(format!("{}", SortedSnapshot::<i32, i32>::new()), "{}");
    }
}
