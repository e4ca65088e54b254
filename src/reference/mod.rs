//! Reclaimable references and the capabilities that fill them.
//!
//! A [`Reference`] is a one-cell holder for a value that is expensive to
//! materialize. It is filled by a [`Loader`], may be emptied again by an
//! [`LruReclaimer`], and becomes permanently [`Unloadable`] when a load fails.
//!
//! The cells live in a [`ReferenceIndex`], a sorted copy-on-write map from
//! key to cell. The index is the ground truth for which keys exist; whether
//! a key's value is currently resident is a separate question answered by
//! its cell.
//!
//! [`Unloadable`]: ReferenceState::Unloadable
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use lazycow::error::LoadError;
//! use lazycow::reference::{IndexedLoader, Loader, ReferenceIndex, Storage};
//!
//! struct Squares;
//!
//! impl Storage<u64, u64> for Squares {
//!     fn load(&self, key: &u64) -> Result<u64, LoadError> {
//!         Ok(key * key)
//!     }
//!
//!     fn key_of(&self, value: &u64) -> u64 {
//!         value.isqrt()
//!     }
//! }
//!
//! let index = Arc::new(ReferenceIndex::<u64, u64>::new());
//! let loader = IndexedLoader::new(Arc::clone(&index), Squares);
//! let cell = loader.register(12);
//!
//! assert_eq!(loader.resolve(&cell).as_deref(), Some(&144));
//! assert!(cell.is_set());
//! ```

mod cell;
mod loader;
mod reclaim;
mod storage;

pub use cell::{Reference, ReferenceState};
pub use loader::{FunctionLoader, Loader};
pub use reclaim::{LruReclaimer, ReclaimConfig};
pub use storage::{IndexedLoader, Storage};

use std::sync::Arc;

use crate::cow::TreeCopyOnWriteMap;

/// The sorted key to cell structure backing a
/// [`ReferenceMapAdapter`](crate::adapter::ReferenceMapAdapter).
pub type ReferenceIndex<K, V> = TreeCopyOnWriteMap<K, Arc<Reference<K, V>>>;
