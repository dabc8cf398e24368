//! Persistent resource cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │  ResourceCache                                  │
//! │                                                 │
//! │  resource path → "{collection_url}/{path}"      │
//! │  degrade to always-miss when unavailable        │
//! └────────────────────────┬────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────┐
//! │  Arc<dyn CacheHandle>   (opened by CacheStorage) │
//! │                                                 │
//! │  MemoryCacheStorage │ DiskCacheStorage          │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod providers;
mod resource;
mod traits;

pub use providers::{
    clear_disk_cache, disk_cache_stats, ClearResult, DiskCacheHandle, DiskCacheStorage,
    MemoryCacheHandle, MemoryCacheStorage,
};
pub use resource::{qualify, ResourceCache};
pub use traits::{BoxFuture, CacheEntry, CacheError, CacheHandle, CacheStorage};

#[cfg(test)]
pub use resource::tests::{BrokenStorage, RecordingCache};
