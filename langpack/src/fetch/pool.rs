//! Request pooling.
//!
//! The [`ResourcePool`] guarantees at most one network/cache sequence per
//! resource path: the first caller creates a shared future, later callers
//! receive clones of it. Futures still in flight are tracked in an unbounded
//! map and are never evicted. Once a future settles with a definitive answer
//! its result moves into a bounded LRU. Both can be dropped explicitly with
//! [`ResourcePool::clear`].
//!
//! Transient failures (timeouts, batch/transport errors, shutdown) are not
//! recorded, so the next request retries. Definitive answers such as a 404
//! or an undecodable body stay pooled.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{FutureExt, Shared};
use moka::sync::Cache;
use tracing::{debug, trace};

use crate::bundle::{parse_resource_map, ResourceMap};
use crate::cache::{qualify, BoxFuture, CacheEntry};
use crate::fetch::{FetchError, HttpClient, RequestCoalescer};

/// Default maximum number of settled resources kept in the pool.
pub const DEFAULT_POOL_CAPACITY: u64 = 512;

/// Default bound on a single pooled request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// A pooled, cloneable resource future.
pub type SharedResource = Shared<BoxFuture<'static, Result<Arc<ResourceMap>, FetchError>>>;

type ResourceResult = Result<Arc<ResourceMap>, FetchError>;

/// How pooled resources are fetched.
#[derive(Clone)]
pub enum FetchMode {
    /// Through the debounced coalescer, cache first.
    Batched(RequestCoalescer),

    /// One GET per resource against the collection, no client-side caching.
    Direct {
        http: Arc<dyn HttpClient>,
        collection_url: String,
    },
}

impl FetchMode {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            FetchMode::Batched(_) => "batched",
            FetchMode::Direct { .. } => "direct",
        }
    }
}

/// A future that has not settled yet, tagged with the id it was created under.
#[derive(Clone)]
struct InFlight {
    id: u64,
    future: SharedResource,
}

/// Deduplicating pool of resource futures.
pub struct ResourcePool {
    mode: FetchMode,
    in_flight: Arc<DashMap<String, InFlight>>,
    settled: Cache<String, ResourceResult>,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl ResourcePool {
    /// Create a pool keeping at most `capacity` settled resources.
    ///
    /// In-flight requests do not count against `capacity`.
    pub fn new(mode: FetchMode, capacity: u64, request_timeout: Duration) -> Self {
        Self {
            mode,
            in_flight: Arc::new(DashMap::new()),
            settled: Cache::new(capacity),
            next_id: AtomicU64::new(0),
            request_timeout,
        }
    }

    /// The fetch mode in use.
    pub fn mode(&self) -> &FetchMode {
        &self.mode
    }

    /// Return the pooled future for `resource_path`, creating it if absent.
    ///
    /// Concurrent callers for the same path share one future; the fetch
    /// behind it runs once.
    pub fn pool(&self, resource_path: &str) -> SharedResource {
        if let Some(result) = self.settled.get(resource_path) {
            return ready(result);
        }

        match self.in_flight.entry(resource_path.to_string()) {
            Entry::Occupied(entry) => entry.get().future.clone(),
            Entry::Vacant(entry) => {
                // A future may have settled between the lookup above and
                // taking the shard lock.
                if let Some(result) = self.settled.get(resource_path) {
                    return ready(result);
                }

                debug!(resource = resource_path, mode = self.mode.name(), "Pooling resource");
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let future = self.create(resource_path, id);
                entry.insert(InFlight {
                    id,
                    future: future.clone(),
                });
                future
            }
        }
    }

    /// Whether a future for `resource_path` is pooled.
    pub fn contains(&self, resource_path: &str) -> bool {
        self.in_flight.contains_key(resource_path) || self.settled.contains_key(resource_path)
    }

    /// Number of pooled resources, in flight and settled.
    pub fn len(&self) -> u64 {
        self.settled.run_pending_tasks();
        self.in_flight.len() as u64 + self.settled.entry_count()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every pooled future. Futures already handed out keep running.
    pub fn clear(&self) {
        self.in_flight.clear();
        self.settled.invalidate_all();
        self.settled.run_pending_tasks();
    }

    fn create(&self, resource_path: &str, id: u64) -> SharedResource {
        let resource = resource_path.to_string();
        let mode = self.mode.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let settled = self.settled.clone();
        let timeout = self.request_timeout;

        let fut: BoxFuture<'static, ResourceResult> = Box::pin(async move {
            let result = match tokio::time::timeout(timeout, fetch(&mode, &resource)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    resource: resource.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };

            settle(&in_flight, &settled, &resource, id, &result);
            result
        });

        fut.shared()
    }
}

/// Move a settled future out of the in-flight map.
///
/// Only the entry created under `id` is touched; a newer future pooled after
/// [`ResourcePool::clear`] stays in place. Definitive results are recorded in
/// `settled` while the shard lock is held so no caller sees the path as absent.
fn settle(
    in_flight: &DashMap<String, InFlight>,
    settled: &Cache<String, ResourceResult>,
    resource: &str,
    id: u64,
    result: &ResourceResult,
) {
    match in_flight.entry(resource.to_string()) {
        Entry::Occupied(entry) if entry.get().id == id => {
            match result {
                Err(e) if e.is_transient() => {
                    trace!(resource, error = %e, "Evicting transient failure");
                }
                _ => settled.insert(resource.to_string(), result.clone()),
            }
            entry.remove();
        }
        _ => trace!(resource, "Pooled entry was replaced, dropping result"),
    }
}

fn ready(result: ResourceResult) -> SharedResource {
    let fut: BoxFuture<'static, ResourceResult> = Box::pin(futures::future::ready(result));
    fut.shared()
}

async fn fetch(mode: &FetchMode, resource: &str) -> Result<Arc<ResourceMap>, FetchError> {
    let entry = match mode {
        FetchMode::Batched(coalescer) => coalescer.enqueue(resource).await.wait().await?,
        FetchMode::Direct {
            http,
            collection_url,
        } => {
            let response = http.get(&qualify(collection_url, resource)).await?;
            if !response.is_ok() {
                return Err(FetchError::SingleFetchFailed {
                    resource: resource.to_string(),
                    status: response.status,
                });
            }
            CacheEntry {
                body: response.body,
                status: response.status,
                headers: response.headers,
            }
        }
    };

    parse_resource_map(&entry.body)
        .map(Arc::new)
        .map_err(|e| FetchError::Decode {
            resource: resource.to_string(),
            reason: e.to_string(),
        })
}
