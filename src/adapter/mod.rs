//! The ordered reference map adapter.
//!
//! A [`ReferenceMapAdapter`] presents a [`ReferenceIndex`] (sorted key to
//! cell) as a sorted key to value map. Values are resolved on demand through
//! the adapter's [`Loader`]; entries whose cell cannot produce a value are
//! silently skipped during iteration.
//!
//! The adapter stores no values. Every call reads the index's current
//! snapshot, so keys inserted or removed by the storage layer are visible to
//! every adapter derived from the same index immediately.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use lazycow::adapter::ReferenceMapAdapter;
//! use lazycow::reference::{FunctionLoader, Reference, ReferenceIndex};
//!
//! let index: Arc<ReferenceIndex<u32, String>> = Arc::new(ReferenceIndex::new());
//! for key in [1, 5, 9] {
//!     index.put(key, Arc::new(Reference::new(key)));
//! }
//!
//! let loader = FunctionLoader::new(
//!     |reference: &Arc<Reference<u32, String>>| {
//!         reference.resolve_with(|key| Ok(format!("build #{key}")))
//!     },
//!     |value: &String| value.trim_start_matches("build #").parse::<u32>().unwrap_or_default(),
//! );
//! let builds = ReferenceMapAdapter::new(index, Arc::new(loader));
//!
//! assert_eq!(builds.get(&5).as_deref().map(String::as_str), Some("build #5"));
//! assert_eq!(builds.tail_map(5).key_set().iter().collect::<Vec<_>>(), vec![5, 9]);
//! assert!(builds.remove(&5).is_err());
//! ```

mod iter;
mod views;

pub use iter::{Entry, EntryIter, KeyIter, ValueIter};
pub use views::{EntrySet, KeySet, Values};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::cow::{Comparator, KeyRange, SortedView};
use crate::error::CacheError;
use crate::reference::{Loader, Reference, ReferenceIndex};

/// A lazily resolving sorted map over a shared [`ReferenceIndex`].
///
/// Derived views ([`sub_map`](Self::sub_map), [`head_map`](Self::head_map),
/// [`tail_map`](Self::tail_map), [`range`](Self::range),
/// [`descending_map`](Self::descending_map)) are constant-time: they share
/// the index and the loader and only narrow the key range. Nested views
/// compose as the intersection of their ranges.
///
/// # Size and emptiness
///
/// [`len`](Self::len) counts every key in range, including keys whose cell
/// is unloadable, while iteration skips them. [`is_empty`](Self::is_empty)
/// follows iteration. A map with only unloadable cells therefore has a
/// non-zero length and is empty.
pub struct ReferenceMapAdapter<K, V, L> {
    index: Arc<ReferenceIndex<K, V>>,
    loader: Arc<L>,
    range: KeyRange<K>,
    descending: bool,
}

impl<K, V, L> ReferenceMapAdapter<K, V, L>
where
    K: Clone + 'static,
    L: Loader<K, V>,
{
    /// Creates an ascending adapter over the whole of `index`.
    #[must_use]
    pub fn new(index: Arc<ReferenceIndex<K, V>>, loader: Arc<L>) -> Self {
        Self {
            index,
            loader,
            range: KeyRange::full(),
            descending: false,
        }
    }

    /// The backing index.
    #[inline]
    pub const fn index(&self) -> &Arc<ReferenceIndex<K, V>> {
        &self.index
    }

    /// The loader shared by this adapter and every view derived from it.
    #[inline]
    pub const fn loader(&self) -> &Arc<L> {
        &self.loader
    }

    /// Returns `true` if this adapter iterates from the greatest key down.
    #[inline]
    pub const fn is_descending(&self) -> bool {
        self.descending
    }

    fn view(&self) -> SortedView<K, Arc<Reference<K, V>>> {
        SortedView::new(self.index.snapshot(), self.range.clone(), self.descending)
    }

    fn cell(&self, key: &K) -> Option<Arc<Reference<K, V>>> {
        self.view().get(key)
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    /// Returns the value for `key`, loading it if needed.
    ///
    /// Returns `None` if `key` is outside this view, absent from the index,
    /// or its cell cannot produce a value.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.cell(key)
            .and_then(|reference| self.loader.resolve(&reference))
    }

    /// Returns `true` if `key` is present and its cell is not unloadable.
    ///
    /// A cell that is not resident is resolved as a side effect, so a
    /// following [`get`](Self::get) is cheap.
    pub fn contains_key(&self, key: &K) -> bool {
        let Some(reference) = self.cell(key) else {
            return false;
        };
        if !reference.is_set() {
            self.loader.resolve(&reference);
        }
        !reference.is_unloadable()
    }

    /// Returns `true` if `value` is the value stored under its own key.
    ///
    /// The key is computed with [`Loader::key_of`], so this is a single
    /// lookup rather than a scan.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let key = self.loader.key_of(value);
        self.get(&key).is_some_and(|resolved| *resolved == *value)
    }

    /// Like [`contains_value`](Self::contains_value) for a value of unknown
    /// type. A value that is not a `V` is reported as absent.
    pub fn contains_any(&self, value: &dyn Any) -> bool
    where
        V: PartialEq + 'static,
    {
        value
            .downcast_ref::<V>()
            .is_some_and(|value| self.contains_value(value))
    }

    /// Removes the value stored under `key` through the loader.
    ///
    /// Returns the removed value, or `None` if there was no value or the
    /// loader declined to remove it.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::UnsupportedOperation`] if the loader has no
    /// remove capability.
    pub fn remove(&self, key: &K) -> Result<Option<Arc<V>>, CacheError> {
        if !self.loader.supports_remove() {
            return Err(CacheError::UnsupportedOperation("remove"));
        }
        Ok(self
            .get(key)
            .filter(|value| self.loader.remove(value)))
    }

    /// Number of keys in range, whether or not their values can be loaded.
    pub fn len(&self) -> usize {
        self.view().len()
    }

    /// Returns `true` if iteration yields nothing.
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// The first key in view order, without resolving it.
    pub fn first_key(&self) -> Option<K> {
        self.view().first_key()
    }

    /// The last key in view order, without resolving it.
    pub fn last_key(&self) -> Option<K> {
        self.view().last_key()
    }

    /// The order in which this adapter iterates.
    pub fn comparator(&self) -> Comparator<K> {
        self.view().comparator()
    }

    // -------------------------------------------------------------------------
    // Derived views
    // -------------------------------------------------------------------------

    fn derive(&self, view: &SortedView<K, Arc<Reference<K, V>>>) -> Self {
        Self {
            index: Arc::clone(&self.index),
            loader: Arc::clone(&self.loader),
            range: view.range().clone(),
            descending: view.is_descending(),
        }
    }

    /// Keys from `from` (inclusive) up to `to` (exclusive), in view order.
    #[must_use]
    pub fn sub_map(&self, from: K, to: K) -> Self {
        self.range(from, true, to, false)
    }

    /// Keys before `to` (exclusive), in view order.
    #[must_use]
    pub fn head_map(&self, to: K) -> Self {
        self.derive(&self.view().head_map(to, false))
    }

    /// Keys from `from` (inclusive) onwards, in view order.
    #[must_use]
    pub fn tail_map(&self, from: K) -> Self {
        self.derive(&self.view().tail_map(from, true))
    }

    /// Keys between `from` and `to`, in view order, with explicit
    /// inclusiveness.
    #[must_use]
    pub fn range(&self, from: K, from_inclusive: bool, to: K, to_inclusive: bool) -> Self {
        self.derive(&self.view().sub_map(from, from_inclusive, to, to_inclusive))
    }

    /// The same keys in the opposite order.
    #[must_use]
    pub fn descending_map(&self) -> Self {
        self.derive(&self.view().descending_map())
    }

    // -------------------------------------------------------------------------
    // Iteration
    // -------------------------------------------------------------------------

    /// Iterates over the resolvable entries in view order.
    ///
    /// The iterator walks the index snapshot current at the time of the
    /// call. Keys removed from the index afterwards may still be visited;
    /// their cells are resolved as usual.
    pub fn iter(&self) -> EntryIter<K, V, L> {
        EntryIter::new(self.view().iter(), Arc::clone(&self.loader))
    }

    /// The keys of this adapter.
    pub const fn key_set(&self) -> KeySet<'_, K, V, L> {
        KeySet::new(self)
    }

    /// The values of this adapter.
    pub const fn values(&self) -> Values<'_, K, V, L> {
        Values::new(self)
    }

    /// The entries of this adapter.
    pub const fn entry_set(&self) -> EntrySet<'_, K, V, L> {
        EntrySet::new(self)
    }
}

impl<'a, K, V, L> IntoIterator for &'a ReferenceMapAdapter<K, V, L>
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

impl<K: Clone, V, L> Clone for ReferenceMapAdapter<K, V, L> {
    fn clone(&self) -> Self {
        Self {
            index: Arc::clone(&self.index),
            loader: Arc::clone(&self.loader),
            range: self.range.clone(),
            descending: self.descending,
        }
    }
}

impl<K: fmt::Debug, V, L> fmt::Debug for ReferenceMapAdapter<K, V, L> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ReferenceMapAdapter")
            .field("range", &self.range)
            .field("descending", &self.descending)
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(
    ReferenceMapAdapter<u64, String, crate::reference::FunctionLoader<u64, String>>: Send,
    Sync,
    Clone
);

// =============================================================================
// Tests
// =============================================================================
