//! The reclaimable reference cell.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::LoadError;

/// The observable state of a [`Reference`].
///
/// ```text
/// Unset ──load ok──▶ Set ──reclaim──▶ Unset
///   │
///   └──load failed──▶ Unloadable (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceState {
    /// No value is resident and the cell is not known to be unloadable.
    Unset,
    /// A value is resident.
    Set,
    /// Loading failed permanently. The cell is never loaded again.
    Unloadable,
}

enum Slot<V> {
    Unset,
    Set(Arc<V>),
    Unloadable,
}

impl<V> Slot<V> {
    const fn state(&self) -> ReferenceState {
        match self {
            Self::Unset => ReferenceState::Unset,
            Self::Set(_) => ReferenceState::Set,
            Self::Unloadable => ReferenceState::Unloadable,
        }
    }
}

/// A one-cell holder for a lazily loaded value.
///
/// The cell always answers for the same key. Its value may be dropped by a
/// reclamation policy ([`reclaim`](Self::reclaim)) and is then loaded again
/// on the next [`resolve_with`](Self::resolve_with).
///
/// Values are handed out as [`Arc<V>`]: a caller holding one keeps the value
/// alive even after the cell itself has been reclaimed.
///
/// # Concurrency
///
/// The loading thread holds the cell's lock for the duration of the load, so
/// at most one load per cell runs at a time and racing resolvers observe the
/// winner's result. A load function must not resolve the same cell again.
///
/// # Examples
///
/// ```rust
/// use lazycow::reference::{Reference, ReferenceState};
///
/// let reference: Reference<u32, String> = Reference::new(7);
/// assert_eq!(reference.state(), ReferenceState::Unset);
///
/// let value = reference.resolve_with(|key| Ok(format!("build #{key}")));
/// assert_eq!(value.as_deref().map(String::as_str), Some("build #7"));
/// assert_eq!(reference.state(), ReferenceState::Set);
///
/// assert!(reference.reclaim());
/// assert_eq!(reference.state(), ReferenceState::Unset);
/// ```
pub struct Reference<K, V> {
    key: K,
    slot: Mutex<Slot<V>>,
}

impl<K, V> Reference<K, V> {
    /// Creates an unset cell for `key`.
    #[must_use]
    pub const fn new(key: K) -> Self {
        Self {
            key,
            slot: Mutex::new(Slot::Unset),
        }
    }

    /// Creates a cell for `key` with `value` already resident.
    #[must_use]
    pub fn with_value(key: K, value: V) -> Self {
        Self {
            key,
            slot: Mutex::new(Slot::Set(Arc::new(value))),
        }
    }

    /// The key this cell answers for.
    #[inline]
    pub const fn key(&self) -> &K {
        &self.key
    }

    /// The current state.
    pub fn state(&self) -> ReferenceState {
        self.slot.lock().state()
    }

    /// Returns `true` if a value is resident.
    pub fn is_set(&self) -> bool {
        self.state() == ReferenceState::Set
    }

    /// Returns `true` if loading failed permanently.
    pub fn is_unloadable(&self) -> bool {
        self.state() == ReferenceState::Unloadable
    }

    /// Returns the resident value without loading.
    pub fn get(&self) -> Option<Arc<V>> {
        match &*self.slot.lock() {
            Slot::Set(value) => Some(Arc::clone(value)),
            Slot::Unset | Slot::Unloadable => None,
        }
    }

    /// Returns the resident value, loading it with `load` if the cell is unset.
    ///
    /// A failed load moves the cell to [`ReferenceState::Unloadable`] and
    /// returns `None`; an unloadable cell returns `None` without calling
    /// `load`.
    pub fn resolve_with<F>(&self, load: F) -> Option<Arc<V>>
    where
        F: FnOnce(&K) -> Result<V, LoadError>,
    {
        let mut slot = self.slot.lock();
        match &*slot {
            Slot::Set(value) => return Some(Arc::clone(value)),
            Slot::Unloadable => return None,
            Slot::Unset => {}
        }
        match load(&self.key) {
            Ok(value) => {
                let value = Arc::new(value);
                *slot = Slot::Set(Arc::clone(&value));
                tracing::trace!("reference loaded");
                Some(value)
            }
            Err(error) => {
                tracing::debug!(%error, "load failed, reference is now unloadable");
                *slot = Slot::Unloadable;
                None
            }
        }
    }

    /// Drops the resident value, moving the cell from `Set` to `Unset`.
    ///
    /// Returns `false` if no value was resident.
    pub fn reclaim(&self) -> bool {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Set(_)) {
            *slot = Slot::Unset;
            true
        } else {
            false
        }
    }

    /// Marks an unset cell as permanently unloadable.
    ///
    /// Returns `false` if the cell was not unset.
    pub fn mark_unloadable(&self) -> bool {
        let mut slot = self.slot.lock();
        if matches!(*slot, Slot::Unset) {
            *slot = Slot::Unloadable;
            true
        } else {
            false
        }
    }
}

impl<K: fmt::Debug, V> fmt::Debug for Reference<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Reference")
            .field("key", &self.key)
            .field("state", &self.state())
            .finish()
    }
}

static_assertions::assert_impl_all!(Reference<u64, String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;

    #[rstest]
    fn test_unloadable_is_not_retried() {
        let attempts = Cell::new(0);
        let reference: Reference<i32, i32> = Reference::new(1);
        let load = |_: &i32| {
            attempts.set(attempts.get() + 1);
            Err(LoadError::NotFound)
        };
        assert_eq!(reference.resolve_with(load), None);
        assert_eq!(reference.resolve_with(load), None);
        assert_eq!(attempts.get(), 1);
        assert_eq!(reference.state(), ReferenceState::Unloadable);
    }

    #[rstest]
    fn test_set_value_skips_load() {
        let reference = Reference::with_value(1, "resident");
        let value = reference.resolve_with(|_| panic!("must not load"));
        assert_eq!(value.as_deref(), Some(&"resident"));
    }

    #[rstest]
    fn test_reclaim_then_reload() {
        let reference = Reference::with_value(3, 30);
        assert!(reference.reclaim());
        assert!(!reference.reclaim());
        assert_eq!(reference.get(), None);
        assert_eq!(reference.resolve_with(|key| Ok(key * 100)).as_deref(), Some(&300));
    }

    #[rstest]
    fn test_mark_unloadable_only_from_unset() {
        let unset: Reference<i32, i32> = Reference::new(1);
        assert!(unset.mark_unloadable());
        assert!(unset.is_unloadable());

        let set = Reference::with_value(2, 2);
        assert!(!set.mark_unloadable());
        assert!(set.is_set());
    }

    #[rstest]
    fn test_unloadable_survives_reclaim() {
        let reference: Reference<i32, i32> = Reference::new(1);
        reference.mark_unloadable();
        assert!(!reference.reclaim());
        assert_eq!(reference.state(), ReferenceState::Unloadable);
    }
}
