//! Copy-on-write maps.
//!
//! A [`CopyOnWriteMap`] holds one published, immutable snapshot. Readers load
//! the current snapshot without locking; writers serialize on a per-map
//! mutex, copy the snapshot, mutate the copy and publish it in one atomic
//! store. A reader therefore always sees a fully-formed map, either the one
//! before a write or the one after it.
//!
//! The container is generic over its [`Snapshot`] type, which supplies the
//! copy strategy and the ordering semantics:
//!
//! - [`HashCopyOnWriteMap`]: backed by [`LinkedSnapshot`], iterates in
//!   insertion order.
//! - [`TreeCopyOnWriteMap`]: backed by [`SortedSnapshot`], iterates in
//!   comparator order and offers the full navigation API through
//!   [`SortedView`].
//!
//! # Examples
//!
//! ```rust
//! use lazycow::cow::{HashCopyOnWriteMap, Snapshot, TreeCopyOnWriteMap};
//!
//! let map: HashCopyOnWriteMap<String, i32> = HashCopyOnWriteMap::new();
//! map.put("b".to_string(), 2);
//! map.put("a".to_string(), 1);
//!
//! // Snapshots are immutable; later writes do not affect them
//! let before = map.snapshot();
//! map.remove(&"a".to_string());
//! assert_eq!(before.len(), 2);
//! assert_eq!(map.len(), 1);
//!
//! let tree: TreeCopyOnWriteMap<i32, &str> = TreeCopyOnWriteMap::new();
//! tree.put(3, "three");
//! tree.put(1, "one");
//! assert_eq!(tree.first_key(), Some(1));
//! assert_eq!(tree.last_key(), Some(3));
//! ```

mod linked;
mod sorted;
mod view;

pub use linked::LinkedSnapshot;
pub use sorted::{Comparator, KeyRange, SortedSnapshot};
pub use view::{SortedKeySet, SortedView};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

/// Copy-on-write map iterating in insertion order.
pub type HashCopyOnWriteMap<K, V> = CopyOnWriteMap<LinkedSnapshot<K, V>>;

/// Copy-on-write map iterating in comparator order.
pub type TreeCopyOnWriteMap<K, V> = CopyOnWriteMap<SortedSnapshot<K, V>>;

// =============================================================================
// Snapshot
// =============================================================================

/// A map representation that can back a [`CopyOnWriteMap`].
///
/// Implementations are positional: every entry has an index in iteration
/// order, which lets owned iterators walk a snapshot held behind an [`Arc`].
pub trait Snapshot: Clone {
    /// The key type.
    type Key;
    /// The value type.
    type Value;

    /// Produces a fresh mutable copy with the same ordering semantics.
    ///
    /// Writers call this before applying a mutation. The default clones.
    #[inline]
    fn copy(&self) -> Self {
        self.clone()
    }

    /// Produces an empty map with the same ordering semantics.
    fn empty_like(&self) -> Self;

    /// Returns the value associated with `key`.
    fn get(&self, key: &Self::Key) -> Option<&Self::Value>;

    /// Inserts a pair, returning the previous value for the key.
    fn insert(&mut self, key: Self::Key, value: Self::Value) -> Option<Self::Value>;

    /// Inserts every pair of `entries`; later pairs win on duplicate keys.
    fn insert_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (Self::Key, Self::Value)>,
    {
        for (key, value) in entries {
            self.insert(key, value);
        }
    }

    /// Removes a key, returning its value.
    fn remove(&mut self, key: &Self::Key) -> Option<Self::Value>;

    /// Removes every entry.
    fn clear(&mut self);

    /// Returns the number of entries.
    fn len(&self) -> usize;

    /// Returns the entry at `index` in iteration order.
    fn entry_at(&self, index: usize) -> Option<(&Self::Key, &Self::Value)>;

    /// Returns `true` if the map contains no entries.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if the map contains `key`.
    #[inline]
    fn contains_key(&self, key: &Self::Key) -> bool {
        self.get(key).is_some()
    }

    /// Iterates over the entries in iteration order.
    fn iter(&self) -> impl Iterator<Item = (&Self::Key, &Self::Value)> {
        (0..self.len()).filter_map(|index| self.entry_at(index))
    }
}

// =============================================================================
// CopyOnWriteMap
// =============================================================================

/// A concurrent map with atomically published immutable snapshots.
///
/// Reads never block. Writes (`put`, `remove`, `put_all`, `replace_by`,
/// `clear`) are mutually exclusive with each other and publish a new
/// snapshot on every call.
///
/// # Type Parameters
///
/// * `S` - The snapshot representation, which decides ordering and the copy
///   strategy
pub struct CopyOnWriteMap<S> {
    snapshot: ArcSwap<S>,
    writer: Mutex<()>,
}

impl<S: Snapshot + Default> CopyOnWriteMap<S> {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::from_snapshot(S::default())
    }
}

impl<S: Snapshot> CopyOnWriteMap<S> {
    /// Creates a map whose first published snapshot is `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: S) -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(snapshot),
            writer: Mutex::new(()),
        }
    }

    /// Returns the snapshot currently in effect.
    ///
    /// The returned snapshot never changes, regardless of later writes.
    #[inline]
    pub fn snapshot(&self) -> Arc<S> {
        self.snapshot.load_full()
    }

    /// Returns the number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    /// Returns `true` if the map contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    /// Returns `true` if the map contains `key`.
    #[inline]
    pub fn contains_key(&self, key: &S::Key) -> bool {
        self.snapshot.load().contains_key(key)
    }

    /// Returns `true` if any entry holds `value`.
    pub fn contains_value(&self, value: &S::Value) -> bool
    where
        S::Value: PartialEq,
    {
        self.snapshot
            .load()
            .iter()
            .any(|(_, candidate)| candidate == value)
    }

    /// Returns a clone of the value associated with `key`.
    pub fn get(&self, key: &S::Key) -> Option<S::Value>
    where
        S::Value: Clone,
    {
        self.snapshot.load().get(key).cloned()
    }

    /// Iterates over the entries of the current snapshot.
    ///
    /// The iterator owns the snapshot, so it is unaffected by later writes.
    pub fn entries(&self) -> SnapshotIter<S> {
        SnapshotIter::new(self.snapshot())
    }

    /// Iterates over the keys of the current snapshot.
    pub fn keys(&self) -> impl Iterator<Item = S::Key> + use<S>
    where
        S::Key: Clone,
        S::Value: Clone,
    {
        self.entries().map(|(key, _)| key)
    }

    /// Iterates over the values of the current snapshot.
    pub fn values(&self) -> impl Iterator<Item = S::Value> + use<S>
    where
        S::Key: Clone,
        S::Value: Clone,
    {
        self.entries().map(|(_, value)| value)
    }

    /// Associates `value` with `key`, returning the previous value.
    pub fn put(&self, key: S::Key, value: S::Value) -> Option<S::Value> {
        self.write(|next| next.insert(key, value))
    }

    /// Returns the value for `key`, inserting `make()` first if it is absent.
    ///
    /// The lookup and the insert happen under the writer lock, so racing
    /// callers for the same key all receive the value that was published.
    /// Nothing is published when the key is already present.
    pub fn get_or_insert_with<F>(&self, key: S::Key, make: F) -> S::Value
    where
        S::Value: Clone,
        F: FnOnce() -> S::Value,
    {
        if let Some(existing) = self.get(&key) {
            return existing;
        }
        let _guard = self.writer.lock();
        let current = self.snapshot.load_full();
        if let Some(existing) = current.get(&key) {
            return existing.clone();
        }
        let mut next = current.copy();
        let value = make();
        next.insert(key, value.clone());
        self.publish(next);
        value
    }

    /// Removes `key`, returning its value.
    pub fn remove(&self, key: &S::Key) -> Option<S::Value> {
        self.write(|next| next.remove(key))
    }

    /// Inserts every pair of `entries` in one publication.
    pub fn put_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (S::Key, S::Value)>,
    {
        self.write(|next| next.insert_all(entries));
    }

    /// Atomically replaces the entire contents with `entries`.
    ///
    /// Readers observe either the full previous contents or the full new
    /// contents, never a mixture.
    pub fn replace_by<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (S::Key, S::Value)>,
    {
        self.write(|next| {
            next.clear();
            next.insert_all(entries);
        });
    }

    /// Publishes an empty snapshot.
    pub fn clear(&self) {
        let _guard = self.writer.lock();
        let empty = self.snapshot.load().empty_like();
        self.publish(empty);
    }

    fn write<R>(&self, mutation: impl FnOnce(&mut S) -> R) -> R {
        let _guard = self.writer.lock();
        let mut next = self.snapshot.load().copy();
        let result = mutation(&mut next);
        self.publish(next);
        result
    }

    fn publish(&self, next: S) {
        tracing::trace!(len = next.len(), "publishing snapshot");
        self.snapshot.store(Arc::new(next));
    }
}

// =============================================================================
// SnapshotIter
// =============================================================================

/// Owned iterator over the entries of one snapshot.
///
/// Yields cloned pairs. Holding the iterator keeps its snapshot alive.
pub struct SnapshotIter<S> {
    snapshot: Arc<S>,
    front: usize,
    back: usize,
    reversed: bool,
}

impl<S: Snapshot> SnapshotIter<S> {
    pub(crate) fn new(snapshot: Arc<S>) -> Self {
        let back = snapshot.len();
        Self::over(snapshot, 0..back, false)
    }

    pub(crate) fn over(snapshot: Arc<S>, range: std::ops::Range<usize>, reversed: bool) -> Self {
        Self {
            snapshot,
            front: range.start,
            back: range.end,
            reversed,
        }
    }

    fn cloned_at(&self, index: usize) -> Option<(S::Key, S::Value)>
    where
        S::Key: Clone,
        S::Value: Clone,
    {
        self.snapshot
            .entry_at(index)
            .map(|(key, value)| (key.clone(), value.clone()))
    }

    fn take_front(&mut self) -> Option<usize> {
        (self.front < self.back).then(|| {
            self.front += 1;
            self.front - 1
        })
    }

    fn take_back(&mut self) -> Option<usize> {
        (self.front < self.back).then(|| {
            self.back -= 1;
            self.back
        })
    }
}

impl<S> Iterator for SnapshotIter<S>
where
    S: Snapshot,
    S::Key: Clone,
    S::Value: Clone,
{
    type Item = (S::Key, S::Value);

    fn next(&mut self) -> Option<Self::Item> {
        let index = if self.reversed {
            self.take_back()?
        } else {
            self.take_front()?
        };
        self.cloned_at(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<S> DoubleEndedIterator for SnapshotIter<S>
where
    S: Snapshot,
    S::Key: Clone,
    S::Value: Clone,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        let index = if self.reversed {
            self.take_front()?
        } else {
            self.take_back()?
        };
        self.cloned_at(index)
    }
}

impl<S> ExactSizeIterator for SnapshotIter<S>
where
    S: Snapshot,
    S::Key: Clone,
    S::Value: Clone,
{
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<S: Snapshot + Default> Default for CopyOnWriteMap<S> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Snapshot> From<S> for CopyOnWriteMap<S> {
    #[inline]
    fn from(snapshot: S) -> Self {
        Self::from_snapshot(snapshot)
    }
}

impl<S> FromIterator<(S::Key, S::Value)> for CopyOnWriteMap<S>
where
    S: Snapshot + FromIterator<(S::Key, S::Value)>,
{
    fn from_iter<I: IntoIterator<Item = (S::Key, S::Value)>>(iter: I) -> Self {
        Self::from_snapshot(iter.into_iter().collect())
    }
}

impl<S: Snapshot + PartialEq> PartialEq for CopyOnWriteMap<S> {
    fn eq(&self, other: &Self) -> bool {
        *self.snapshot.load_full() == *other.snapshot.load_full()
    }
}

impl<S: Snapshot + Eq> Eq for CopyOnWriteMap<S> {}

impl<S: Snapshot + PartialEq> PartialEq<S> for CopyOnWriteMap<S> {
    fn eq(&self, other: &S) -> bool {
        *self.snapshot.load_full() == *other
    }
}

impl<S: Snapshot + Hash> Hash for CopyOnWriteMap<S> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.snapshot.load().hash(state);
    }
}

impl<S: Snapshot + fmt::Debug> fmt::Debug for CopyOnWriteMap<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.snapshot.load(), formatter)
    }
}

impl<S: Snapshot + fmt::Display> fmt::Display for CopyOnWriteMap<S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.snapshot.load(), formatter)
    }
}

static_assertions::assert_impl_all!(HashCopyOnWriteMap<String, i32>: Send, Sync);
static_assertions::assert_impl_all!(TreeCopyOnWriteMap<u64, Arc<String>>: Send, Sync);

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<S> serde::Serialize for CopyOnWriteMap<S>
where
    S: Snapshot + serde::Serialize,
{
    fn serialize<Ser>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error>
    where
        Ser: serde::Serializer,
    {
        self.snapshot.load().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, S> serde::Deserialize<'de> for CopyOnWriteMap<S>
where
    S: Snapshot + serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        S::deserialize(deserializer).map(Self::from_snapshot)
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
    fn test_write_publishes_new_snapshot() {
        let map: HashCopyOnWriteMap<i32, i32> = HashCopyOnWriteMap::new();
        let before = map.snapshot();
        map.put(1, 10);
        let after = map.snapshot();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(before.is_empty());
        assert_eq!(after.len(), 1);
    }

    #[rstest]
    fn test_get_or_insert_with_inserts_once() {
        let map: TreeCopyOnWriteMap<i32, i32> = TreeCopyOnWriteMap::new();
        assert_eq!(map.get_or_insert_with(1, || 10), 10);
        let published = map.snapshot();
        assert_eq!(map.get_or_insert_with(1, || unreachable!()), 10);
        assert!(Arc::ptr_eq(&published, &map.snapshot()));
        assert_eq!(map.len(), 1);
    }

    #[rstest]
    fn test_reads_share_snapshot_between_writes() {
        let map: TreeCopyOnWriteMap<i32, i32> = [(1, 1)].into_iter().collect();
        assert!(Arc::ptr_eq(&map.snapshot(), &map.snapshot()));
    }

    #[rstest]
    fn test_snapshot_iter_double_ended() {
        let map: TreeCopyOnWriteMap<i32, i32> = (1..=4).map(|key| (key, key)).collect();
        let mut iter = map.entries();
        assert_eq!(iter.len(), 4);
        assert_eq!(iter.next(), Some((1, 1)));
        assert_eq!(iter.next_back(), Some((4, 4)));
        assert_eq!(iter.collect::<Vec<_>>(), vec![(2, 2), (3, 3)]);
    }

    #[rstest]
    fn test_reversed_snapshot_iter() {
        let snapshot: Arc<SortedSnapshot<i32, i32>> =
            Arc::new((1..=3).map(|key| (key, key)).collect());
        let iter = SnapshotIter::over(snapshot, 0..3, true);
        let keys: Vec<i32> = iter.map(|(key, _)| key).collect();
        assert_eq!(keys, vec![3, 2, 1]);
    }
}
