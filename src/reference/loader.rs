//! The loader capability.

use std::fmt;
use std::sync::Arc;

use super::Reference;

/// Strategy for materializing, identifying and removing values.
///
/// A loader is bound to an adapter when the adapter is constructed and is
/// shared by every view derived from it. It is the seam to the storage that
/// actually holds the values.
pub trait Loader<K, V>: Send + Sync {
    /// Returns the value of `reference`, loading it if needed.
    ///
    /// Returns `None` when the value cannot be obtained. A permanent failure
    /// should leave the reference [`Unloadable`](super::ReferenceState::Unloadable).
    fn resolve(&self, reference: &Arc<Reference<K, V>>) -> Option<Arc<V>>;

    /// The key under which `value` is stored.
    fn key_of(&self, value: &V) -> K;

    /// Returns `true` if [`remove`](Self::remove) is available.
    fn supports_remove(&self) -> bool {
        false
    }

    /// Removes `value` from storage and from the backing index.
    ///
    /// Returns `true` on success. Only called when
    /// [`supports_remove`](Self::supports_remove) returns `true`.
    fn remove(&self, _value: &Arc<V>) -> bool {
        false
    }
}

type Resolver<K, V> = Box<dyn Fn(&Arc<Reference<K, V>>) -> Option<Arc<V>> + Send + Sync>;
type KeyProvider<K, V> = Box<dyn Fn(&V) -> K + Send + Sync>;
type Remover<V> = Box<dyn Fn(&Arc<V>) -> bool + Send + Sync>;

/// A [`Loader`] assembled from closures.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use lazycow::reference::{FunctionLoader, Loader, Reference};
///
/// let loader = FunctionLoader::new(
///     |reference: &Arc<Reference<u32, String>>| {
///         reference.resolve_with(|key| Ok(format!("value-{key}")))
///     },
///     |value: &String| value.trim_start_matches("value-").parse::<u32>().unwrap_or_default(),
/// );
///
/// let reference = Arc::new(Reference::new(4));
/// assert_eq!(loader.resolve(&reference).as_deref().map(String::as_str), Some("value-4"));
/// assert_eq!(loader.key_of(&"value-4".to_string()), 4);
/// assert!(!loader.supports_remove());
/// ```
pub struct FunctionLoader<K, V> {
    resolver: Resolver<K, V>,
    key_provider: KeyProvider<K, V>,
    remover: Option<Remover<V>>,
}

impl<K, V> FunctionLoader<K, V> {
    /// Creates a read-only loader.
    pub fn new<R, P>(resolver: R, key_provider: P) -> Self
    where
        R: Fn(&Arc<Reference<K, V>>) -> Option<Arc<V>> + Send + Sync + 'static,
        P: Fn(&V) -> K + Send + Sync + 'static,
    {
        Self {
            resolver: Box::new(resolver),
            key_provider: Box::new(key_provider),
            remover: None,
        }
    }

    /// Adds a remove capability.
    #[must_use]
    pub fn with_remover<D>(mut self, remover: D) -> Self
    where
        D: Fn(&Arc<V>) -> bool + Send + Sync + 'static,
    {
        self.remover = Some(Box::new(remover));
        self
    }
}

impl<K, V> Loader<K, V> for FunctionLoader<K, V> {
    fn resolve(&self, reference: &Arc<Reference<K, V>>) -> Option<Arc<V>> {
        (self.resolver)(reference)
    }

    fn key_of(&self, value: &V) -> K {
        (self.key_provider)(value)
    }

    fn supports_remove(&self) -> bool {
        self.remover.is_some()
    }

    fn remove(&self, value: &Arc<V>) -> bool {
        self.remover.as_ref().is_some_and(|remover| remover(value))
    }
}

impl<K, V> fmt::Debug for FunctionLoader<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FunctionLoader")
            .field("removable", &self.remover.is_some())
            .finish_non_exhaustive()
    }
}
