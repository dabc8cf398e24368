//! Cache storage provider implementations.
//!
//! # Available Providers
//!
//! - [`MemoryCacheStorage`]: In-memory LRU cache using moka
//! - [`DiskCacheStorage`]: On-disk cache that persists across restarts

mod disk;
mod memory;

pub use disk::{clear_disk_cache, disk_cache_stats, ClearResult, DiskCacheHandle, DiskCacheStorage};
pub use memory::{MemoryCacheHandle, MemoryCacheStorage};
