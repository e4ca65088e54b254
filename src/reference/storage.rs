//! A storage-backed loader wired to a shared reference index.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use super::{Loader, LruReclaimer, Reference, ReferenceIndex};
use crate::error::LoadError;

/// Durable storage holding the values behind an index.
///
/// This is the external collaborator that reads and deletes values. It knows
/// nothing about caching.
pub trait Storage<K, V>: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the value cannot be produced. The failure
    /// is treated as permanent for the requesting cell.
    fn load(&self, key: &K) -> Result<V, LoadError>;

    /// The key under which `value` is stored.
    fn key_of(&self, value: &V) -> K;

    /// Returns `true` if [`delete`](Self::delete) is available.
    fn supports_delete(&self) -> bool {
        false
    }

    /// Deletes the value stored under `key`. Returns `true` on success.
    fn delete(&self, _key: &K) -> bool {
        false
    }
}

/// A [`Loader`] resolving through a [`Storage`].
///
/// Successful resolutions are reported to an optional [`LruReclaimer`], which
/// bounds how many values stay resident. Removal deletes from storage first
/// and then drops the key from the shared index, so every adapter over that
/// index stops seeing it.
///
/// The reclaimer only tracks cells that resolved through this loader or were
/// added with [`register_resident`](Self::register_resident). A cell built
/// with [`Reference::with_value`] and put into the index directly stays
/// resident outside the capacity until its first resolution here.
pub struct IndexedLoader<K: Hash + Eq, V, S> {
    index: Arc<ReferenceIndex<K, V>>,
    storage: S,
    reclaimer: Option<LruReclaimer<K, V>>,
}

impl<K, V, S> IndexedLoader<K, V, S>
where
    K: Hash + Eq + Clone + 'static,
    S: Storage<K, V>,
{
    /// Creates a loader over `index` backed by `storage`.
    #[must_use]
    pub const fn new(index: Arc<ReferenceIndex<K, V>>, storage: S) -> Self {
        Self {
            index,
            storage,
            reclaimer: None,
        }
    }

    /// Bounds resident values with `reclaimer`.
    #[must_use]
    pub fn with_reclaimer(mut self, reclaimer: LruReclaimer<K, V>) -> Self {
        self.reclaimer = Some(reclaimer);
        self
    }

    /// The index this loader removes keys from.
    #[inline]
    pub const fn index(&self) -> &Arc<ReferenceIndex<K, V>> {
        &self.index
    }

    /// The storage backend.
    #[inline]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// The reclaimer, if one is configured.
    #[inline]
    pub const fn reclaimer(&self) -> Option<&LruReclaimer<K, V>> {
        self.reclaimer.as_ref()
    }

    /// Returns the cell for `key`, inserting an unset one if absent.
    ///
    /// Concurrent registrations of one key all return the same cell.
    pub fn register(&self, key: K) -> Arc<Reference<K, V>> {
        let cell_key = key.clone();
        self.index
            .get_or_insert_with(key, || Arc::new(Reference::new(cell_key)))
    }

    /// Returns the cell for `key`, inserting one already holding `value` if
    /// absent.
    ///
    /// A newly inserted cell is reported to the reclaimer, so it counts
    /// against the capacity like a loaded one. An existing cell is returned
    /// unchanged and `value` is dropped.
    pub fn register_resident(&self, key: K, value: V) -> Arc<Reference<K, V>> {
        let cell_key = key.clone();
        let mut inserted = None;
        let cell = self.index.get_or_insert_with(key, || {
            let cell = Arc::new(Reference::with_value(cell_key, value));
            inserted = Some(Arc::clone(&cell));
            cell
        });
        if let (Some(inserted), Some(reclaimer)) = (inserted, &self.reclaimer) {
            reclaimer.touch(&inserted);
        }
        cell
    }
}

impl<K, V, S> Loader<K, V> for IndexedLoader<K, V, S>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Send + Sync,
    S: Storage<K, V>,
{
    fn resolve(&self, reference: &Arc<Reference<K, V>>) -> Option<Arc<V>> {
        let value = reference.resolve_with(|key| self.storage.load(key))?;
        if let Some(reclaimer) = &self.reclaimer {
            reclaimer.touch(reference);
        }
        Some(value)
    }

    fn key_of(&self, value: &V) -> K {
        self.storage.key_of(value)
    }

    fn supports_remove(&self) -> bool {
        self.storage.supports_delete()
    }

    fn remove(&self, value: &Arc<V>) -> bool {
        let key = self.storage.key_of(value);
        if !self.storage.delete(&key) {
            return false;
        }
        self.index.remove(&key);
        if let Some(reclaimer) = &self.reclaimer {
            reclaimer.forget(&key);
        }
        true
    }
}

impl<K: Hash + Eq + Clone, V, S> fmt::Debug for IndexedLoader<K, V, S> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("IndexedLoader")
            .field("indexed", &self.index.len())
            .field("reclaimer", &self.reclaimer)
            .finish_non_exhaustive()
    }
}
