//! Key set, value collection and entry set of an adapter.
//!
//! The views borrow their adapter. Their `len` is the adapter's `len`, which
//! counts unloadable keys, while their iterators skip them.

use std::sync::Arc;

use super::{Entry, EntryIter, KeyIter, ReferenceMapAdapter, ValueIter};
use crate::reference::Loader;

// =============================================================================
// KeySet
// =============================================================================

/// The keys of a [`ReferenceMapAdapter`].
pub struct KeySet<'a, K, V, L> {
    adapter: &'a ReferenceMapAdapter<K, V, L>,
}

impl<'a, K, V, L> KeySet<'a, K, V, L>
where
    K: Clone + 'static,
    L: Loader<K, V>,
{
    pub(crate) const fn new(adapter: &'a ReferenceMapAdapter<K, V, L>) -> Self {
        Self { adapter }
    }

    /// Number of keys in range, including unloadable ones.
    pub fn len(&self) -> usize {
        self.adapter.len()
    }

    /// Returns `true` if iteration yields nothing.
    pub fn is_empty(&self) -> bool {
        self.adapter.is_empty()
    }

    /// Returns `true` if `key` is present and loadable.
    pub fn contains(&self, key: &K) -> bool {
        self.adapter.contains_key(key)
    }

    /// Iterates over the keys of resolvable entries.
    pub fn iter(&self) -> KeyIter<K, V, L> {
        KeyIter::new(self.adapter.iter())
    }
}

// =============================================================================
// Values
// =============================================================================

/// The values of a [`ReferenceMapAdapter`].
pub struct Values<'a, K, V, L> {
    adapter: &'a ReferenceMapAdapter<K, V, L>,
}

impl<'a, K, V, L> Values<'a, K, V, L>
where
    K: Clone + 'static,
    L: Loader<K, V>,
{
    pub(crate) const fn new(adapter: &'a ReferenceMapAdapter<K, V, L>) -> Self {
        Self { adapter }
    }

    /// Number of keys in range, including unloadable ones.
    pub fn len(&self) -> usize {
        self.adapter.len()
    }

    /// Returns `true` if iteration yields nothing.
    pub fn is_empty(&self) -> bool {
        self.adapter.is_empty()
    }

    /// Returns `true` if `value` is stored under its own key.
    pub fn contains(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.adapter.contains_value(value)
    }

    /// Iterates over the resolved values.
    pub fn iter(&self) -> ValueIter<K, V, L> {
        ValueIter::new(self.adapter.iter())
    }
}

// =============================================================================
// EntrySet
// =============================================================================

/// The entries of a [`ReferenceMapAdapter`].
pub struct EntrySet<'a, K, V, L> {
    adapter: &'a ReferenceMapAdapter<K, V, L>,
}

impl<'a, K, V, L> EntrySet<'a, K, V, L>
where
    K: Clone + 'static,
    L: Loader<K, V>,
{
    pub(crate) const fn new(adapter: &'a ReferenceMapAdapter<K, V, L>) -> Self {
        Self { adapter }
    }

    /// Number of keys in range, including unloadable ones.
    pub fn len(&self) -> usize {
        self.adapter.len()
    }

    /// Returns `true` if iteration yields nothing.
    pub fn is_empty(&self) -> bool {
        self.adapter.is_empty()
    }

    /// Returns `true` if the value currently resolved under `entry`'s key
    /// equals `entry`'s value.
    pub fn contains(&self, entry: &Entry<K, V>) -> bool
    where
        V: PartialEq,
    {
        self.contains_pair(entry.key(), entry.value())
    }

    /// Returns `true` if `key` resolves to a value equal to `value`.
    pub fn contains_pair(&self, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.adapter
            .get(key)
            .is_some_and(|resolved| *resolved == *value)
    }

    /// Iterates over the resolvable entries.
    pub fn iter(&self) -> EntryIter<K, V, L> {
        self.adapter.iter()
    }
}

impl<K, V, L> IntoIterator for &EntrySet<'_, K, V, L>
where
    K: Clone + 'static,
    L: Loader<K, V>,
{
    type Item = Entry<K, V>;
    type IntoIter = EntryIter<K, V, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, L> IntoIterator for &KeySet<'_, K, V, L>
where
    K: Clone + 'static,
    L: Loader<K, V>,
{
    type Item = K;
    type IntoIter = KeyIter<K, V, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, L> IntoIterator for &Values<'_, K, V, L>
where
    K: Clone + 'static,
    L: Loader<K, V>,
{
    type Item = Arc<V>;
    type IntoIter = ValueIter<K, V, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{FunctionLoader, Reference, ReferenceIndex};
    use rstest::rstest;

    fn adapter() -> ReferenceMapAdapter<i32, String, FunctionLoader<i32, String>> {
        let index: Arc<ReferenceIndex<i32, String>> = Arc::new(ReferenceIndex::new());
        for key in 1..=4 {
            index.put(key, Arc::new(Reference::new(key)));
        }
        if let Some(cell) = index.get(&3) {
            cell.mark_unloadable();
        }
        let loader = FunctionLoader::new(
            |reference: &Arc<Reference<i32, String>>| {
                reference.resolve_with(|key| Ok(key.to_string()))
            },
            |value: &String| value.parse().unwrap_or_default(),
        );
        ReferenceMapAdapter::new(index, Arc::new(loader))
    }

    #[rstest]
    fn test_views_share_filtering() {
        let map = adapter();
        assert_eq!(map.key_set().iter().collect::<Vec<_>>(), vec![1, 2, 4]);
        assert_eq!(
            map.values().iter().map(|value| value.to_string()).collect::<Vec<_>>(),
            vec!["1", "2", "4"]
        );
        assert_eq!(map.entry_set().iter().count(), 3);
    }

    #[rstest]
    fn test_views_report_unfiltered_len() {
        let map = adapter();
        assert_eq!(map.key_set().len(), 4);
        assert_eq!(map.values().len(), 4);
        assert_eq!(map.entry_set().len(), 4);
    }

    #[rstest]
    fn test_contains_pair() {
        let map = adapter();
        let entries = map.entry_set();
        assert!(entries.contains_pair(&2, &"2".to_string()));
        assert!(!entries.contains_pair(&2, &"two".to_string()));
        assert!(!entries.contains_pair(&3, &"3".to_string()));
    }
}
