//! In-memory cache provider using moka.
//!
//! Entries live for the lifetime of the process. Each named cache is a
//! byte-weighted moka LRU, so a long-running process cannot grow without bound.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use moka::future::Cache as MokaCache;

use crate::cache::traits::{BoxFuture, CacheEntry, CacheError, CacheHandle, CacheStorage};

/// In-memory cache storage.
///
/// Named handles are kept in a `DashMap`, so opening the same name twice
/// returns the same underlying cache.
pub struct MemoryCacheStorage {
    /// Maximum size in bytes for each opened cache.
    max_size_bytes: u64,

    /// Optional time-to-live for entries.
    ttl: Option<Duration>,

    /// Caches opened so far, by name.
    handles: DashMap<String, Arc<MemoryCacheHandle>>,
}

impl MemoryCacheStorage {
    /// Create a new memory cache storage.
    ///
    /// # Arguments
    ///
    /// * `max_size_bytes` - Maximum size of each opened cache in bytes
    /// * `ttl` - Optional time-to-live for entries
    pub fn new(max_size_bytes: u64, ttl: Option<Duration>) -> Self {
        Self {
            max_size_bytes,
            ttl,
            handles: DashMap::new(),
        }
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn open(&self, name: &str) -> BoxFuture<'_, Result<Arc<dyn CacheHandle>, CacheError>> {
        let handle = self
            .handles
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCacheHandle::new(self.max_size_bytes, self.ttl)))
            .clone();
        Box::pin(async move { Ok(handle as Arc<dyn CacheHandle>) })
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}

/// One named in-memory cache.
pub struct MemoryCacheHandle {
    /// The underlying moka cache.
    cache: MokaCache<String, CacheEntry>,
}

impl MemoryCacheHandle {
    /// Create a new handle with the given limits.
    pub fn new(max_size_bytes: u64, ttl: Option<Duration>) -> Self {
        let mut builder = MokaCache::builder()
            // Weight each entry by its key and response size
            .weigher(|key: &String, entry: &CacheEntry| -> u32 {
                u32::try_from(key.len() + entry.weight()).unwrap_or(u32::MAX)
            })
            .max_capacity(max_size_bytes);

        if let Some(ttl_duration) = ttl {
            builder = builder.time_to_live(ttl_duration);
        }

        Self {
            cache: builder.build(),
        }
    }

    /// Run pending maintenance so size and count reflect recent writes.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl CacheHandle for MemoryCacheHandle {
    fn lookup(&self, key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.cache.get(&key).await) })
    }

    fn put(&self, key: &str, entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            self.cache.insert(key, entry).await;
            Ok(())
        })
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    fn size_bytes(&self) -> u64 {
        self.cache.weighted_size()
    }
}
