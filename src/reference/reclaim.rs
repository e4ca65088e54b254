//! Explicit reclamation of resident values.
//!
//! Resident values are tracked in least-recently-used order. When more cells
//! are resident than the configured capacity allows, the least recently used
//! ones are downgraded from `Set` to `Unset`, and are loaded again on their
//! next access.

use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};

use lru::LruCache;
use parking_lot::Mutex;

use super::Reference;
use crate::error::CacheError;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for an [`LruReclaimer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReclaimConfig {
    capacity: NonZeroUsize,
}

impl ReclaimConfig {
    /// Number of resident values kept when nothing else is configured.
    pub const DEFAULT_CAPACITY: usize = 256;

    /// Environment variable read by [`from_env`](Self::from_env).
    pub const CAPACITY_VARIABLE: &'static str = "LAZYCOW_RECLAIM_CAPACITY";

    /// Creates a configuration keeping at most `capacity` resident values.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Configuration`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        NonZeroUsize::new(capacity)
            .map(|capacity| Self { capacity })
            .ok_or_else(|| CacheError::Configuration("capacity must be non-zero".to_string()))
    }

    /// Reads the configuration from the environment.
    ///
    /// # Environment Variables
    ///
    /// - `LAZYCOW_RECLAIM_CAPACITY`: maximum number of resident values
    ///   (default: 256)
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Configuration`] if the variable is set but is
    /// not a positive integer.
    pub fn from_env() -> Result<Self, CacheError> {
        Self::parse(std::env::var(Self::CAPACITY_VARIABLE).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Result<Self, CacheError> {
        let Some(value) = value else {
            return Ok(Self::default());
        };
        let capacity = value.trim().parse::<usize>().map_err(|_| {
            CacheError::Configuration(format!(
                "{}={value:?} is not a positive integer",
                Self::CAPACITY_VARIABLE
            ))
        })?;
        Self::new(capacity)
    }

    /// Maximum number of resident values.
    #[inline]
    pub const fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }
}

impl Default for ReclaimConfig {
    fn default() -> Self {
        Self {
            capacity: NonZeroUsize::new(Self::DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

// =============================================================================
// LruReclaimer
// =============================================================================

/// Bounds the number of resident values by reclaiming the least recently
/// used ones.
///
/// The reclaimer only holds weak handles: a cell removed from its index is
/// not kept alive by being tracked here.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use lazycow::reference::{LruReclaimer, ReclaimConfig, Reference};
///
/// let reclaimer = LruReclaimer::new(ReclaimConfig::new(1).unwrap());
/// let first = Arc::new(Reference::with_value(1, "one"));
/// let second = Arc::new(Reference::with_value(2, "two"));
///
/// reclaimer.touch(&first);
/// reclaimer.touch(&second);
///
/// assert!(!first.is_set());
/// assert!(second.is_set());
/// ```
pub struct LruReclaimer<K: Hash + Eq, V> {
    resident: Mutex<LruCache<K, Weak<Reference<K, V>>>>,
}

impl<K, V> LruReclaimer<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates a reclaimer with the given configuration.
    #[must_use]
    pub fn new(config: ReclaimConfig) -> Self {
        Self {
            resident: Mutex::new(LruCache::new(config.capacity())),
        }
    }

    /// Maximum number of resident values.
    pub fn capacity(&self) -> NonZeroUsize {
        self.resident.lock().cap()
    }

    /// Number of cells currently tracked as resident.
    pub fn resident(&self) -> usize {
        self.resident.lock().len()
    }

    /// Records an access to `reference` and reclaims the least recently used
    /// cell if capacity is exceeded.
    pub fn touch(&self, reference: &Arc<Reference<K, V>>) {
        let evicted = {
            let mut resident = self.resident.lock();
            match resident.push(reference.key().clone(), Arc::downgrade(reference)) {
                Some((key, evicted)) if key != *reference.key() => Some(evicted),
                _ => None,
            }
        };
        // Reclaim outside the lock; the evicted cell may be held by a slow load.
        if let Some(cell) = evicted.and_then(|evicted| evicted.upgrade()) {
            if cell.reclaim() {
                tracing::debug!("reclaimed least recently used reference");
            }
        }
    }

    /// Stops tracking `key` without reclaiming it.
    pub fn forget(&self, key: &K) {
        self.resident.lock().pop(key);
    }

    /// Reclaims every tracked cell.
    pub fn reclaim_all(&self) -> usize {
        let tracked: Vec<Weak<Reference<K, V>>> = {
            let mut resident = self.resident.lock();
            let tracked = resident.iter().map(|(_, cell)| Weak::clone(cell)).collect();
            resident.clear();
            tracked
        };
        let reclaimed = tracked
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|cell| cell.reclaim())
            .count();
        tracing::debug!(reclaimed, "reclaimed all resident references");
        reclaimed
    }
}

impl<K: Hash + Eq, V> fmt::Debug for LruReclaimer<K, V> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resident = self.resident.lock();
        formatter
            .debug_struct("LruReclaimer")
            .field("capacity", &resident.cap())
            .field("resident", &resident.len())
            .finish()
    }
}
