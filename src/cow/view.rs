//! Read-only navigable views over a sorted snapshot.
//!
//! Every navigation call on a [`TreeCopyOnWriteMap`](super::TreeCopyOnWriteMap)
//! is answered by the snapshot current at the time of the call. Range views
//! ([`SortedView`]) pin that snapshot: they keep reflecting it after later
//! writes, and they never allow removal. Removal must go through the map's
//! own `remove`, which publishes a new snapshot.

use std::ops::{Bound, Range};
use std::sync::Arc;

use super::sorted::{Comparator, KeyRange, SortedSnapshot};
use super::{CopyOnWriteMap, Snapshot, SnapshotIter};
use crate::error::CacheError;

// =============================================================================
// SortedView
// =============================================================================

/// A read-only, possibly range-restricted, possibly descending view of one
/// sorted snapshot.
///
/// Range arguments to [`sub_map`](Self::sub_map), [`head_map`](Self::head_map)
/// and [`tail_map`](Self::tail_map) are interpreted in the view's own
/// iteration order, so on a descending view `head_map(k, false)` holds the keys
/// greater than `k`. Nested restrictions compose as an intersection.
///
/// # Examples
///
/// ```rust
/// use lazycow::cow::TreeCopyOnWriteMap;
///
/// let map: TreeCopyOnWriteMap<i32, char> =
///     [(1, 'a'), (5, 'e'), (9, 'i')].into_iter().collect();
///
/// let tail = map.tail_map(5, true);
/// assert_eq!(tail.keys().collect::<Vec<_>>(), vec![5, 9]);
///
/// let descending = map.descending_map();
/// assert_eq!(descending.first_key(), Some(9));
/// assert_eq!(descending.floor_key(&6), Some(9));
/// ```
pub struct SortedView<K, V> {
    snapshot: Arc<SortedSnapshot<K, V>>,
    range: KeyRange<K>,
    descending: bool,
}

impl<K, V> SortedView<K, V>
where
    K: Clone + 'static,
    V: Clone,
{
    pub(crate) const fn new(
        snapshot: Arc<SortedSnapshot<K, V>>,
        range: KeyRange<K>,
        descending: bool,
    ) -> Self {
        Self {
            snapshot,
            range,
            descending,
        }
    }

    fn positions(&self) -> Range<usize> {
        self.snapshot.index_range(&self.range)
    }

    fn cloned_at(&self, index: usize) -> Option<(K, V)> {
        self.snapshot
            .entry_at(index)
            .map(|(key, value)| (key.clone(), value.clone()))
    }

    /// Returns the number of entries in the view.
    pub fn len(&self) -> usize {
        self.positions().len()
    }

    /// Returns `true` if the view contains no entries.
    pub fn is_empty(&self) -> bool {
        self.positions().is_empty()
    }

    /// Returns `true` if the view iterates from the greatest key down.
    #[inline]
    pub const fn is_descending(&self) -> bool {
        self.descending
    }

    /// The key range of the view, in ascending comparator terms.
    #[inline]
    pub const fn range(&self) -> &KeyRange<K> {
        &self.range
    }

    /// The order in which this view iterates.
    pub fn comparator(&self) -> Comparator<K> {
        if self.descending {
            self.snapshot.comparator().reversed()
        } else {
            self.snapshot.comparator().clone()
        }
    }

    /// Returns a clone of the value for `key`, if `key` lies in the view.
    pub fn get(&self, key: &K) -> Option<V> {
        if self.range.contains(key, self.snapshot.comparator()) {
            self.snapshot.get(key).cloned()
        } else {
            None
        }
    }

    /// Returns `true` if `key` lies in the view and is present.
    pub fn contains_key(&self, key: &K) -> bool {
        self.range.contains(key, self.snapshot.comparator()) && self.snapshot.contains_key(key)
    }

    // -------------------------------------------------------------------------
    // Ascending-order navigation
    // -------------------------------------------------------------------------

    fn ascending_first(&self) -> Option<usize> {
        let positions = self.positions();
        (!positions.is_empty()).then_some(positions.start)
    }

    fn ascending_last(&self) -> Option<usize> {
        let positions = self.positions();
        (!positions.is_empty()).then(|| positions.end - 1)
    }

    fn ascending_at_or_below(&self, bound: &Bound<K>) -> Option<usize> {
        let positions = self.positions();
        let end = self.snapshot.end_index(bound).min(positions.end);
        (end > positions.start).then(|| end - 1)
    }

    fn ascending_at_or_above(&self, bound: &Bound<K>) -> Option<usize> {
        let positions = self.positions();
        let start = self.snapshot.start_index(bound).max(positions.start);
        (start < positions.end).then_some(start)
    }

    // -------------------------------------------------------------------------
    // View-order navigation
    // -------------------------------------------------------------------------

    fn first_index(&self) -> Option<usize> {
        if self.descending {
            self.ascending_last()
        } else {
            self.ascending_first()
        }
    }

    fn last_index(&self) -> Option<usize> {
        if self.descending {
            self.ascending_first()
        } else {
            self.ascending_last()
        }
    }

    /// Greatest position in view order whose key is `<= key` in view order.
    fn floor_index(&self, key: &K, inclusive: bool) -> Option<usize> {
        let bound = if inclusive {
            Bound::Included(key.clone())
        } else {
            Bound::Excluded(key.clone())
        };
        if self.descending {
            self.ascending_at_or_above(&bound)
        } else {
            self.ascending_at_or_below(&bound)
        }
    }

    /// Least position in view order whose key is `>= key` in view order.
    fn ceiling_index(&self, key: &K, inclusive: bool) -> Option<usize> {
        let bound = if inclusive {
            Bound::Included(key.clone())
        } else {
            Bound::Excluded(key.clone())
        };
        if self.descending {
            self.ascending_at_or_below(&bound)
        } else {
            self.ascending_at_or_above(&bound)
        }
    }

    /// The first entry in view order.
    pub fn first_entry(&self) -> Option<(K, V)> {
        self.first_index().and_then(|index| self.cloned_at(index))
    }

    /// The last entry in view order.
    pub fn last_entry(&self) -> Option<(K, V)> {
        self.last_index().and_then(|index| self.cloned_at(index))
    }

    /// The first key in view order.
    pub fn first_key(&self) -> Option<K> {
        self.first_entry().map(|(key, _)| key)
    }

    /// The last key in view order.
    pub fn last_key(&self) -> Option<K> {
        self.last_entry().map(|(key, _)| key)
    }

    /// The greatest entry at or before `key`.
    pub fn floor_entry(&self, key: &K) -> Option<(K, V)> {
        self.floor_index(key, true).and_then(|index| self.cloned_at(index))
    }

    /// The greatest key at or before `key`.
    pub fn floor_key(&self, key: &K) -> Option<K> {
        self.floor_entry(key).map(|(key, _)| key)
    }

    /// The greatest entry strictly before `key`.
    pub fn lower_entry(&self, key: &K) -> Option<(K, V)> {
        self.floor_index(key, false).and_then(|index| self.cloned_at(index))
    }

    /// The greatest key strictly before `key`.
    pub fn lower_key(&self, key: &K) -> Option<K> {
        self.lower_entry(key).map(|(key, _)| key)
    }

    /// The least entry at or after `key`.
    pub fn ceiling_entry(&self, key: &K) -> Option<(K, V)> {
        self.ceiling_index(key, true).and_then(|index| self.cloned_at(index))
    }

    /// The least key at or after `key`.
    pub fn ceiling_key(&self, key: &K) -> Option<K> {
        self.ceiling_entry(key).map(|(key, _)| key)
    }

    /// The least entry strictly after `key`.
    pub fn higher_entry(&self, key: &K) -> Option<(K, V)> {
        self.ceiling_index(key, false).and_then(|index| self.cloned_at(index))
    }

    /// The least key strictly after `key`.
    pub fn higher_key(&self, key: &K) -> Option<K> {
        self.higher_entry(key).map(|(key, _)| key)
    }

    /// Always fails: a published snapshot is never mutated.
    ///
    /// # Errors
    ///
    /// Always returns [`CacheError::UnsupportedOperation`].
    pub fn pop_first(&self) -> Result<Option<(K, V)>, CacheError> {
        Err(CacheError::UnsupportedOperation("pop_first"))
    }

    /// Always fails: a published snapshot is never mutated.
    ///
    /// # Errors
    ///
    /// Always returns [`CacheError::UnsupportedOperation`].
    pub fn pop_last(&self) -> Result<Option<(K, V)>, CacheError> {
        Err(CacheError::UnsupportedOperation("pop_last"))
    }

    // -------------------------------------------------------------------------
    // Iteration
    // -------------------------------------------------------------------------

    /// Iterates over the entries in view order.
    pub fn iter(&self) -> SnapshotIter<SortedSnapshot<K, V>> {
        SnapshotIter::over(Arc::clone(&self.snapshot), self.positions(), self.descending)
    }

    /// Iterates over the keys in view order.
    pub fn keys(&self) -> impl DoubleEndedIterator<Item = K> + use<K, V> {
        self.iter().map(|(key, _)| key)
    }

    /// Iterates over the values in view order.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = V> + use<K, V> {
        self.iter().map(|(_, value)| value)
    }

    /// The keys of this view as a navigable set.
    pub fn key_set(&self) -> SortedKeySet<K, V> {
        SortedKeySet(self.clone())
    }

    // -------------------------------------------------------------------------
    // Derived views
    // -------------------------------------------------------------------------

    /// The same entries in the opposite order.
    #[must_use]
    pub fn descending_map(&self) -> Self {
        Self::new(Arc::clone(&self.snapshot), self.range.clone(), !self.descending)
    }

    /// Restricts to the keys between `from` and `to`, in view order.
    #[must_use]
    pub fn sub_map(&self, from: K, from_inclusive: bool, to: K, to_inclusive: bool) -> Self {
        self.restrict(bound(from, from_inclusive), bound(to, to_inclusive))
    }

    /// Restricts to the keys before `to`, in view order.
    #[must_use]
    pub fn head_map(&self, to: K, inclusive: bool) -> Self {
        self.restrict(Bound::Unbounded, bound(to, inclusive))
    }

    /// Restricts to the keys from `from` onwards, in view order.
    #[must_use]
    pub fn tail_map(&self, from: K, inclusive: bool) -> Self {
        self.restrict(bound(from, inclusive), Bound::Unbounded)
    }

    fn restrict(&self, first: Bound<K>, last: Bound<K>) -> Self {
        let requested = if self.descending {
            KeyRange::new(last, first)
        } else {
            KeyRange::new(first, last)
        };
        let range = self.range.intersect(&requested, self.snapshot.comparator());
        Self::new(Arc::clone(&self.snapshot), range, self.descending)
    }
}

const fn bound<K>(key: K, inclusive: bool) -> Bound<K> {
    if inclusive {
        Bound::Included(key)
    } else {
        Bound::Excluded(key)
    }
}

impl<K: Clone, V> Clone for SortedView<K, V> {
    fn clone(&self) -> Self {
        Self {
            snapshot: Arc::clone(&self.snapshot),
            range: self.range.clone(),
            descending: self.descending,
        }
    }
}

impl<K, V> std::fmt::Debug for SortedView<K, V>
where
    K: Clone + std::fmt::Debug + 'static,
    V: Clone + std::fmt::Debug,
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_map().entries(self.iter()).finish()
    }
}

// =============================================================================
// SortedKeySet
// =============================================================================

/// The keys of a [`SortedView`] as a read-only navigable set.
pub struct SortedKeySet<K, V>(SortedView<K, V>);

impl<K, V> SortedKeySet<K, V>
where
    K: Clone + 'static,
    V: Clone,
{
    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if `key` is in the set.
    pub fn contains(&self, key: &K) -> bool {
        self.0.contains_key(key)
    }

    /// The first key in set order.
    pub fn first(&self) -> Option<K> {
        self.0.first_key()
    }

    /// The last key in set order.
    pub fn last(&self) -> Option<K> {
        self.0.last_key()
    }

    /// The greatest key at or before `key`.
    pub fn floor(&self, key: &K) -> Option<K> {
        self.0.floor_key(key)
    }

    /// The least key at or after `key`.
    pub fn ceiling(&self, key: &K) -> Option<K> {
        self.0.ceiling_key(key)
    }

    /// The greatest key strictly before `key`.
    pub fn lower(&self, key: &K) -> Option<K> {
        self.0.lower_key(key)
    }

    /// The least key strictly after `key`.
    pub fn higher(&self, key: &K) -> Option<K> {
        self.0.higher_key(key)
    }

    /// The same keys in the opposite order.
    #[must_use]
    pub fn descending_set(&self) -> Self {
        Self(self.0.descending_map())
    }

    /// Iterates over the keys in set order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = K> + use<K, V> {
        self.0.keys()
    }
}

// =============================================================================
// Tree-only CopyOnWriteMap operations
// =============================================================================

impl<K, V> CopyOnWriteMap<SortedSnapshot<K, V>>
where
    K: Clone + 'static,
    V: Clone,
{
    /// Creates an empty map ordered by `comparator`.
    #[must_use]
    pub fn with_comparator(comparator: Comparator<K>) -> Self {
        Self::from_snapshot(SortedSnapshot::with_comparator(comparator))
    }

    /// Creates a map holding the entries of `source`, ordered the way
    /// `source` iterates.
    #[must_use]
    pub fn from_sorted(source: &SortedView<K, V>) -> Self {
        let mut snapshot = SortedSnapshot::with_comparator(source.comparator());
        for (key, value) in source.iter() {
            snapshot.insert(key, value);
        }
        Self::from_snapshot(snapshot)
    }

    /// The comparator ordering the map.
    pub fn comparator(&self) -> Comparator<K> {
        self.snapshot().comparator().clone()
    }

    /// A full ascending view of the current snapshot.
    pub fn view(&self) -> SortedView<K, V> {
        SortedView::new(self.snapshot(), KeyRange::full(), false)
    }

    /// The first key in comparator order.
    pub fn first_key(&self) -> Option<K> {
        self.view().first_key()
    }

    /// The last key in comparator order.
    pub fn last_key(&self) -> Option<K> {
        self.view().last_key()
    }

    /// The first entry in comparator order.
    pub fn first_entry(&self) -> Option<(K, V)> {
        self.view().first_entry()
    }

    /// The last entry in comparator order.
    pub fn last_entry(&self) -> Option<(K, V)> {
        self.view().last_entry()
    }

    /// The greatest key less than or equal to `key`.
    pub fn floor_key(&self, key: &K) -> Option<K> {
        self.view().floor_key(key)
    }

    /// The greatest entry whose key is less than or equal to `key`.
    pub fn floor_entry(&self, key: &K) -> Option<(K, V)> {
        self.view().floor_entry(key)
    }

    /// The least key greater than or equal to `key`.
    pub fn ceiling_key(&self, key: &K) -> Option<K> {
        self.view().ceiling_key(key)
    }

    /// The least entry whose key is greater than or equal to `key`.
    pub fn ceiling_entry(&self, key: &K) -> Option<(K, V)> {
        self.view().ceiling_entry(key)
    }

    /// The least key strictly greater than `key`.
    pub fn higher_key(&self, key: &K) -> Option<K> {
        self.view().higher_key(key)
    }

    /// The least entry whose key is strictly greater than `key`.
    pub fn higher_entry(&self, key: &K) -> Option<(K, V)> {
        self.view().higher_entry(key)
    }

    /// The greatest key strictly less than `key`.
    pub fn lower_key(&self, key: &K) -> Option<K> {
        self.view().lower_key(key)
    }

    /// The greatest entry whose key is strictly less than `key`.
    pub fn lower_entry(&self, key: &K) -> Option<(K, V)> {
        self.view().lower_entry(key)
    }

    /// Unsupported; remove entries with [`remove`](Self::remove).
    ///
    /// # Errors
    ///
    /// Always returns [`CacheError::UnsupportedOperation`].
    pub fn pop_first(&self) -> Result<Option<(K, V)>, CacheError> {
        Err(CacheError::UnsupportedOperation("pop_first"))
    }

    /// Unsupported; remove entries with [`remove`](Self::remove).
    ///
    /// # Errors
    ///
    /// Always returns [`CacheError::UnsupportedOperation`].
    pub fn pop_last(&self) -> Result<Option<(K, V)>, CacheError> {
        Err(CacheError::UnsupportedOperation("pop_last"))
    }

    /// The current snapshot in descending order.
    pub fn descending_map(&self) -> SortedView<K, V> {
        self.view().descending_map()
    }

    /// The keys of the current snapshot, ascending.
    pub fn navigable_key_set(&self) -> SortedKeySet<K, V> {
        self.view().key_set()
    }

    /// The keys of the current snapshot, descending.
    pub fn descending_key_set(&self) -> SortedKeySet<K, V> {
        self.view().descending_map().key_set()
    }

    /// The entries of the current snapshot between `from` and `to`.
    pub fn sub_map(&self, from: K, from_inclusive: bool, to: K, to_inclusive: bool) -> SortedView<K, V> {
        self.view().sub_map(from, from_inclusive, to, to_inclusive)
    }

    /// The entries of the current snapshot before `to`.
    pub fn head_map(&self, to: K, inclusive: bool) -> SortedView<K, V> {
        self.view().head_map(to, inclusive)
    }

    /// The entries of the current snapshot from `from` onwards.
    pub fn tail_map(&self, from: K, inclusive: bool) -> SortedView<K, V> {
        self.view().tail_map(from, inclusive)
    }
}

// =============================================================================
// Tests
// =============================================================================
