//! On-disk cache provider.
//!
//! Persists entries across process restarts, standing in for the browser's
//! persistent HTTP cache. Layout:
//!
//! ```text
//! {root}/
//!   {cache_name}/
//!     {sha256(key)}.entry     bincode-encoded StoredEntry
//! ```
//!
//! Writes go to a temporary file first and are renamed into place, so a
//! concurrent reader never observes a partially written entry. Entry sizes
//! are indexed by file path, so concurrent writes of one key count once.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::cache::traits::{BoxFuture, CacheEntry, CacheError, CacheHandle, CacheStorage};

/// File extension for stored entries.
const ENTRY_EXTENSION: &str = "entry";

/// Entry as written to disk. The key is stored to detect hash collisions.
#[derive(Serialize, Deserialize)]
struct StoredEntry {
    key: String,
    entry: CacheEntry,
}

/// Disk-backed cache storage rooted at a directory.
pub struct DiskCacheStorage {
    root: PathBuf,
}

impl DiskCacheStorage {
    /// Create a storage rooted at `root`. Nothing is created until `open`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this storage.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CacheStorage for DiskCacheStorage {
    fn open(&self, name: &str) -> BoxFuture<'_, Result<Arc<dyn CacheHandle>, CacheError>> {
        let dir = self.root.join(sanitize_cache_name(name));
        Box::pin(async move {
            tokio::fs::create_dir_all(&dir).await?;
            let sizes = scan_dir(&dir).await?;
            let bytes: u64 = sizes.iter().map(|item| *item.value()).sum();
            debug!(
                dir = %dir.display(),
                entries = sizes.len(),
                bytes,
                "Opened disk cache"
            );
            Ok(Arc::new(DiskCacheHandle {
                dir,
                sizes,
                bytes: AtomicU64::new(bytes),
                temp_counter: AtomicU64::new(0),
            }) as Arc<dyn CacheHandle>)
        })
    }

    fn kind(&self) -> &'static str {
        "disk"
    }
}

/// One named on-disk cache.
pub struct DiskCacheHandle {
    dir: PathBuf,
    sizes: DashMap<PathBuf, u64>,
    bytes: AtomicU64,
    temp_counter: AtomicU64,
}

impl DiskCacheHandle {
    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{:x}.{}", digest, ENTRY_EXTENSION))
    }
}

impl CacheHandle for DiskCacheHandle {
    fn lookup(&self, key: &str) -> BoxFuture<'_, Result<Option<CacheEntry>, CacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            let raw = match tokio::fs::read(self.path_for(&key)).await {
                Ok(raw) => raw,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(e.into()),
            };

            let stored: StoredEntry =
                bincode::deserialize(&raw).map_err(|e| CacheError::Decode {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;

            if stored.key != key {
                debug!(key = %key, stored_key = %stored.key, "Disk cache hash collision");
                return Ok(None);
            }

            Ok(Some(stored.entry))
        })
    }

    fn put(&self, key: &str, entry: CacheEntry) -> BoxFuture<'_, Result<(), CacheError>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.path_for(&key);
            let stored = StoredEntry { key, entry };
            let encoded =
                bincode::serialize(&stored).map_err(|e| CacheError::Encode(e.to_string()))?;

            let temp = self.dir.join(format!(
                ".tmp-{}-{}",
                std::process::id(),
                self.temp_counter.fetch_add(1, Ordering::Relaxed)
            ));
            tokio::fs::write(&temp, &encoded).await?;
            if let Err(e) = tokio::fs::rename(&temp, &path).await {
                let _ = tokio::fs::remove_file(&temp).await;
                return Err(e.into());
            }

            let written = encoded.len() as u64;
            self.bytes.fetch_add(written, Ordering::Relaxed);
            if let Some(old) = self.sizes.insert(path, written) {
                let _ = self
                    .bytes
                    .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |b| {
                        Some(b.saturating_sub(old))
                    });
            }
            Ok(())
        })
    }

    fn entry_count(&self) -> u64 {
        self.sizes.len() as u64
    }

    fn size_bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Replace characters that are unsafe in a directory name.
fn sanitize_cache_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "default".to_string()
    } else {
        sanitized
    }
}

/// Index entry files in one cache directory by path, with their sizes.
async fn scan_dir(dir: &Path) -> io::Result<DashMap<PathBuf, u64>> {
    let sizes = DashMap::new();
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    while let Some(item) = read_dir.next_entry().await? {
        let path = item.path();
        if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
            let len = item.metadata().await.map(|m| m.len()).unwrap_or(0);
            sizes.insert(path, len);
        }
    }
    Ok(sizes)
}

/// Result of clearing a disk cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClearResult {
    /// Number of entry files deleted.
    pub files_deleted: u64,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

/// Delete every entry file below a disk cache root.
///
/// Missing roots are treated as already empty.
pub fn clear_disk_cache(root: &Path) -> io::Result<ClearResult> {
    let mut result = ClearResult::default();
    for path in entry_files(root)? {
        let len = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        std::fs::remove_file(&path)?;
        result.files_deleted += 1;
        result.bytes_freed += len;
    }
    Ok(result)
}

/// Count entry files and their total size below a disk cache root.
pub fn disk_cache_stats(root: &Path) -> io::Result<(u64, u64)> {
    let mut files = 0;
    let mut bytes = 0;
    for path in entry_files(root)? {
        files += 1;
        bytes += std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    }
    Ok((files, bytes))
}

/// Entry files in every cache directory directly below `root`.
fn entry_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let caches = match std::fs::read_dir(root) {
        Ok(caches) => caches,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(e),
    };
    for cache in caches {
        let cache = cache?.path();
        if !cache.is_dir() {
            continue;
        }
        for item in std::fs::read_dir(&cache)? {
            let path = item?.path();
            if path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION) {
                files.push(path);
            }
        }
    }
    Ok(files)
}
