//! Resource cache client.
//!
//! This client wraps an optional [`CacheHandle`] with:
//! - Key translation: resource path → `"{collection_url}/{resource_path}"`
//! - Degradation: without a handle every lookup misses and nothing is written
//! - Error absorption: cache failures are logged and treated as misses
//!
//! Caching is an optimization; a failing cache never fails a resource request.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::traits::{CacheEntry, CacheHandle, CacheStorage};

/// Join a collection URL and a resource path with exactly one slash.
///
/// Used both as the cache key and as the direct-fetch URL.
pub fn qualify(collection_url: &str, resource_path: &str) -> String {
    format!(
        "{}/{}",
        collection_url.trim_end_matches('/'),
        resource_path.trim_start_matches('/')
    )
}

/// Collection-scoped view of the persistent cache.
#[derive(Clone)]
pub struct ResourceCache {
    /// The opened cache, or `None` when storage is unavailable.
    handle: Option<Arc<dyn CacheHandle>>,

    /// Collection URL used to qualify keys.
    collection_url: String,
}

impl ResourceCache {
    /// Create a cache client over an opened handle.
    pub fn new(handle: Arc<dyn CacheHandle>, collection_url: impl Into<String>) -> Self {
        Self {
            handle: Some(handle),
            collection_url: collection_url.into(),
        }
    }

    /// Create a client that always misses and never stores.
    pub fn unavailable(collection_url: impl Into<String>) -> Self {
        Self {
            handle: None,
            collection_url: collection_url.into(),
        }
    }

    /// Open `cache_name` in `storage`, degrading to an always-miss cache if
    /// no storage is given or opening fails.
    pub async fn open(
        storage: Option<&dyn CacheStorage>,
        cache_name: &str,
        collection_url: impl Into<String>,
    ) -> Self {
        let collection_url = collection_url.into();
        let Some(storage) = storage else {
            debug!("No cache storage configured, resource cache disabled");
            return Self::unavailable(collection_url);
        };

        match storage.open(cache_name).await {
            Ok(handle) => {
                debug!(
                    kind = storage.kind(),
                    cache = cache_name,
                    "Resource cache opened"
                );
                Self::new(handle, collection_url)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    kind = storage.kind(),
                    cache = cache_name,
                    "Cache storage unavailable, every resource will be fetched"
                );
                Self::unavailable(collection_url)
            }
        }
    }

    /// Whether a persistent cache is backing this client.
    pub fn is_available(&self) -> bool {
        self.handle.is_some()
    }

    /// The collection-qualified key for a resource path.
    pub fn key_for(&self, resource_path: &str) -> String {
        qualify(&self.collection_url, resource_path)
    }

    /// Look up a resource.
    ///
    /// # Returns
    ///
    /// `Some(entry)` on a hit, `None` on a miss, when unavailable, or when
    /// the cache read failed.
    pub async fn lookup(&self, resource_path: &str) -> Option<CacheEntry> {
        let handle = self.handle.as_ref()?;
        let key = self.key_for(resource_path);
        match handle.lookup(&key).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, key = %key, "Resource cache lookup failed");
                None
            }
        }
    }

    /// Store a resource. A no-op when unavailable; failures are logged.
    pub async fn put(&self, resource_path: &str, entry: CacheEntry) {
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        let key = self.key_for(resource_path);
        if let Err(e) = handle.put(&key, entry).await {
            warn!(error = %e, key = %key, "Resource cache put failed");
        }
    }
}
