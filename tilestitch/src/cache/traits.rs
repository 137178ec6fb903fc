//! Core traits for the tile blob store.
//!
//! The `Cache` trait provides a domain-agnostic key-value interface. Tile
//! coordinates are translated to keys by [`TileFetcher`](super::TileFetcher);
//! providers only ever see strings and bytes.
//!
//! # Design Principles
//!
//! - **String keys**: Human-readable for debugging
//! - **Vec<u8> values**: Raw encoded tile bytes, no serialization opinions
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` for trait object support

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key cannot be mapped onto the store.
    #[error("Invalid cache key '{0}'")]
    InvalidKey(String),

    /// Background task failed.
    #[error("Cache task failed: {0}")]
    Task(String),
}

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Generic cache interface for key-value storage.
///
/// Entries are immutable once written from the caller's point of view:
/// a tile at a given key never changes, so there is no invalidation.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` for use across async tasks.
pub trait Cache: Send + Sync {
    /// Store a value with the given key, replacing any existing value.
    ///
    /// Readers must never observe a partially written value.
    fn set(&self, key: &str, value: Vec<u8>) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Retrieve a value by key.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(data))` if the key exists
    /// - `Ok(None)` if the key is not found
    /// - `Err(_)` if an error occurs
    fn get(&self, key: &str) -> BoxFuture<'_, Result<Option<Vec<u8>>, CacheError>>;

    /// Delete a value by key, returning whether it existed.
    fn delete(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>>;

    /// Check if a key exists without retrieving the value.
    fn contains(&self, key: &str) -> BoxFuture<'_, Result<bool, CacheError>>;

    /// Get the current number of entries in the cache.
    fn entry_count(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::InvalidKey(String::new());
        assert_eq!(format!("{}", err), "Invalid cache key ''");
    }

    #[test]
    fn test_cache_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cache_err: CacheError = io_err.into();
        assert!(matches!(cache_err, CacheError::Io(_)));
    }
}
