//! Error types.
//!
//! Two kinds of failure exist in this crate:
//!
//! - [`LoadError`] is produced by a [`Storage`](crate::reference::Storage) when
//!   a value cannot be materialized. It never reaches callers of the adapter:
//!   the reference cell absorbs it and becomes
//!   [`Unloadable`](crate::reference::ReferenceState::Unloadable).
//! - [`CacheError`] is surfaced to callers when they ask for something the
//!   contract forbids, such as removing through a read-only adapter.

use thiserror::Error;

// =============================================================================
// Cache Error
// =============================================================================

/// Errors surfaced to callers of the maps and adapters.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The operation is not supported by this map or view.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// The operation was called at a point where it is not allowed.
    #[error("Illegal state: {0}")]
    IllegalState(&'static str),

    /// Runtime configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

// =============================================================================
// Load Error
// =============================================================================

/// Errors returned by a storage backend while loading a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// No value exists for the key.
    #[error("Value not found")]
    NotFound,

    /// The stored representation could not be decoded.
    #[error("Stored value is corrupt: {0}")]
    Corrupt(String),

    /// The storage backend failed.
    #[error("Storage failure: {0}")]
    Storage(String),
}
