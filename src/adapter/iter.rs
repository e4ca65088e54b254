//! Filtered iteration over an adapter.
//!
//! Every view of a [`ReferenceMapAdapter`](super::ReferenceMapAdapter) is
//! built on [`EntryIter`]: walk the index in view order, resolve each cell,
//! and skip the ones that produce no value.

use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::cow::{SnapshotIter, SortedSnapshot};
use crate::error::CacheError;
use crate::reference::{Loader, Reference};

type IndexEntries<K, V> = SnapshotIter<SortedSnapshot<K, Arc<Reference<K, V>>>>;

// =============================================================================
// Entry
// =============================================================================

/// A resolved key and value pair.
///
/// The value is resolved once, when the iterator yields the entry; reading
/// it again does not consult the loader.
#[derive(Clone, PartialEq, Eq)]
pub struct Entry<K, V> {
    key: K,
    value: Arc<V>,
}

impl<K, V> Entry<K, V> {
    pub(crate) const fn new(key: K, value: Arc<V>) -> Self {
        Self { key, value }
    }

    /// The key.
    #[inline]
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// The resolved value.
    #[inline]
    pub const fn value(&self) -> &Arc<V> {
        &self.value
    }

    /// Splits the entry into its key and value.
    #[inline]
    pub fn into_pair(self) -> (K, Arc<V>) {
        (self.key, self.value)
    }

    /// Always fails: entries are read-only.
    ///
    /// # Errors
    ///
    /// Always returns [`CacheError::UnsupportedOperation`].
    pub fn set_value(&self, _value: V) -> Result<Arc<V>, CacheError> {
        Err(CacheError::UnsupportedOperation("set_value"))
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Entry<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:?}={:?}", self.key, self.value)
    }
}

// =============================================================================
// EntryIter
// =============================================================================

/// Iterator over the resolvable entries of an adapter.
///
/// Cells that resolve to nothing, whether transiently or because they are
/// unloadable, are skipped.
pub struct EntryIter<K, V, L> {
    entries: IndexEntries<K, V>,
    loader: Arc<L>,
    current: Option<Arc<V>>,
}

impl<K, V, L> EntryIter<K, V, L>
where
    K: Clone,
    L: Loader<K, V>,
{
    pub(crate) const fn new(entries: IndexEntries<K, V>, loader: Arc<L>) -> Self {
        Self {
            entries,
            loader,
            current: None,
        }
    }

    /// Removes the entry most recently yielded, through the loader.
    ///
    /// Returns whether the loader removed it.
    ///
    /// # Errors
    ///
    /// - [`CacheError::UnsupportedOperation`] if the loader has no remove
    ///   capability.
    /// - [`CacheError::IllegalState`] if nothing has been yielded yet, or
    ///   the last entry was already removed.
    pub fn remove_current(&mut self) -> Result<bool, CacheError> {
        if !self.loader.supports_remove() {
            return Err(CacheError::UnsupportedOperation("remove"));
        }
        let value = self
            .current
            .take()
            .ok_or(CacheError::IllegalState("no current entry to remove"))?;
        Ok(self.loader.remove(&value))
    }
}

impl<K, V, L> Iterator for EntryIter<K, V, L>
where
    K: Clone,
    L: Loader<K, V>,
{
    type Item = Entry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let loader = &self.loader;
        let (key, value) = self
            .entries
            .by_ref()
            .find_map(|(key, reference)| loader.resolve(&reference).map(|value| (key, value)))?;
        self.current = Some(Arc::clone(&value));
        Some(Entry::new(key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.entries.size_hint().1)
    }
}

impl<K, V, L> FusedIterator for EntryIter<K, V, L>
where
    K: Clone,
    L: Loader<K, V>,
{
}

// =============================================================================
// Keys and values
// =============================================================================

/// Iterator over the keys of the resolvable entries.
pub struct KeyIter<K, V, L>(EntryIter<K, V, L>);

impl<K, V, L> KeyIter<K, V, L> {
    pub(crate) const fn new(entries: EntryIter<K, V, L>) -> Self {
        Self(entries)
    }
}

impl<K, V, L> Iterator for KeyIter<K, V, L>
where
    K: Clone,
    L: Loader<K, V>,
{
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|entry| entry.key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

/// Iterator over the resolved values.
pub struct ValueIter<K, V, L>(EntryIter<K, V, L>);

impl<K, V, L> ValueIter<K, V, L> {
    pub(crate) const fn new(entries: EntryIter<K, V, L>) -> Self {
        Self(entries)
    }
}

impl<K, V, L> Iterator for ValueIter<K, V, L>
where
    K: Clone,
    L: Loader<K, V>,
{
    type Item = Arc<V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|entry| entry.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}
