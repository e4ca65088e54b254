//! # lazycow
//!
//! A lazily resolving, copy-on-write, ordered cache map.
//!
//! ## Overview
//!
//! This library lets a large, monotonically keyed collection of values that
//! are expensive to materialize be addressed as an ordinary sorted map, while
//! the values themselves may be dropped and transparently reloaded. It
//! includes:
//!
//! - **Copy-On-Write Maps**: [`CopyOnWriteMap`](cow::CopyOnWriteMap) with
//!   lock-free snapshot reads, in an insertion-ordered and a sorted variant
//! - **Reclaimable References**: [`Reference`](reference::Reference) cells
//!   with an explicit `Unset`/`Set`/`Unloadable` state machine
//! - **Loaders**: the [`Loader`](reference::Loader) seam to external storage,
//!   plus a storage-backed implementation with LRU reclamation
//! - **Reference Map Adapter**: [`ReferenceMapAdapter`](adapter::ReferenceMapAdapter),
//!   a lazy sorted key to value projection with composable range views
//!
//! ## Feature Flags
//!
//! - `serde`: `Serialize`/`Deserialize` for the copy-on-write maps and
//!   [`ReclaimConfig`](reference::ReclaimConfig)
//! - `fxhash`: faster key hashing for the insertion-ordered map
//! - `full`: Enable all features
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lazycow::prelude::*;
//!
//! let index: Arc<ReferenceIndex<u32, String>> = Arc::new(ReferenceIndex::new());
//! index.put(1, Arc::new(Reference::new(1)));
//! index.put(2, Arc::new(Reference::new(2)));
//!
//! let loader = FunctionLoader::new(
//!     |reference: &Arc<Reference<u32, String>>| match *reference.key() {
//!         2 => reference.resolve_with(|_| Err(LoadError::NotFound)),
//!         _ => reference.resolve_with(|key| Ok(format!("build #{key}"))),
//!     },
//!     |value: &String| value.trim_start_matches("build #").parse::<u32>().unwrap_or_default(),
//! );
//! let builds = ReferenceMapAdapter::new(index, Arc::new(loader));
//!
//! // Both keys count, only the loadable one is iterated
//! assert_eq!(builds.len(), 2);
//! assert_eq!(builds.iter().count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use lazycow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::adapter::*;
    pub use crate::cow::*;
    pub use crate::error::*;
    pub use crate::reference::*;
}

pub mod adapter;
pub mod cow;
pub mod error;
pub mod reference;
