//! Core traits for the persistent resource cache.
//!
//! The cache mirrors a browser Cache Storage API: a [`CacheStorage`] opens
//! named [`CacheHandle`]s, and each handle stores [`CacheEntry`] values under
//! string keys. Providers implement both traits so the fetch pipeline can run
//! against memory, disk or test doubles through the same interface.
//!
//! # Design Principles
//!
//! - **String keys**: Collection-qualified resource keys, human-readable in logs
//! - **Response-shaped values**: body, status and headers, as a fetch returned them
//! - **Minimal interface**: only `lookup` and `put`; entries are never invalidated
//!   by the pipeline itself
//! - **Dyn-compatible**: Uses `Pin<Box<dyn Future>>` for trait object support

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A stored response for one resource.
///
/// Entries are immutable once stored. A later `put` with the same key
/// replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Response body.
    pub body: Bytes,

    /// HTTP status the body was served with.
    pub status: u16,

    /// Response headers, lower-cased names.
    pub headers: BTreeMap<String, String>,
}

impl CacheEntry {
    /// Create an entry with no headers.
    pub fn new(body: impl Into<Bytes>, status: u16) -> Self {
        Self {
            body: body.into(),
            status,
            headers: BTreeMap::new(),
        }
    }

    /// Add a header to the entry.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the stored status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Approximate memory footprint, used as the LRU weight.
    pub fn weight(&self) -> usize {
        self.body.len()
            + self
                .headers
                .iter()
                .map(|(name, value)| name.len() + value.len())
                .sum::<usize>()
    }
}

/// Errors that can occur during cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error during cache operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to serialize an entry for storage.
    #[error("Failed to encode cache entry: {0}")]
    Encode(String),

    /// A stored entry could not be read back.
    #[error("Failed to decode cache entry {key}: {reason}")]
    Decode { key: String, reason: String },

    /// The storage mechanism is not available in this runtime.
    #[error("Cache storage unavailable: {0}")]
    Unavailable(String),
}

/// Opens named caches.
///
/// Equivalent to `caches.open(name)` in a browser. Opening the same name twice
/// must yield handles that observe the same entries.
pub trait CacheStorage: Send + Sync {
    /// Open (creating if needed) the cache with the given name.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the backing storage cannot be prepared.
    fn open(&self, name: &str) -> BoxFuture<'_, Result<Arc<dyn CacheHandle>, CacheError>>;

    /// Short provider name for logging ("memory", "disk").
    fn kind(&self) -> &'static str;
}

/// Key-value access to one opened cache.
///
/// All implementations must be `Send + Sync`; concurrent `put` calls for
/// different keys must not corrupt each other.
pub trait CacheHandle: Send + Sync {
    /// Look up an entry by key (the `match` operation).
    ///
    /// # Returns
    ///
    /// - `Ok(Some(entry))` if the key exists
    /// - `Ok(None)` if the key is not found
    /// - `Err(_)` if an error occurs
    fn lookup(&self, key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>>;

    /// Store an entry, replacing any existing entry with the same key.
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the entry cannot be written.
    fn put(&self, key: &str, entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>>;

    /// Number of entries currently stored.
    fn entry_count(&self) -> u64;

    /// Total stored size in bytes.
    fn size_bytes(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_entry_success_range() {
        assert!(CacheEntry::new("{}", 200).is_success());
        assert!(CacheEntry::new("{}", 204).is_success());
        assert!(!CacheEntry::new("", 404).is_success());
        assert!(!CacheEntry::new("", 500).is_success());
    }

    #[test]
    fn test_cache_entry_header_names_lowercased() {
        let entry = CacheEntry::new("{}", 200).with_header("Content-Type", "application/json");
        assert_eq!(
            entry.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );
    }

    #[test]
    fn test_cache_entry_weight() {
        let entry = CacheEntry::new(vec![0u8; 10], 200).with_header("etag", "abc");
        assert_eq!(entry.weight(), 10 + 4 + 3);
    }

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::Decode {
            key: "k".to_string(),
            reason: "truncated".to_string(),
        };
        assert!(err.to_string().contains("truncated"));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let cache_err: CacheError = io_err.into();
        assert!(matches!(cache_err, CacheError::Io(_)));
    }
}
