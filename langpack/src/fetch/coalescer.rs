//! Request coalescer daemon.
//!
//! The [`RequestCoalescer`] collects resource requests that arrive in quick
//! succession and flushes them as one batch:
//! - Each request arriving while idle restarts the debounce window
//! - A batch that reaches `max_batch_size` flushes immediately
//! - On flush, cached resources are answered straight from the cache
//! - Cache misses go to the [`BatchFetcher`] as one network request
//! - Requests arriving during a flush wait for the next one
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      CoalescerDaemon                         │
//! │                                                              │
//! │  enqueue() ──► mpsc ──► ┌──────────┐                         │
//! │                         │  Idle    │ debounce window          │
//! │                         └────┬─────┘                         │
//! │                              │ window elapsed / batch full   │
//! │                              ▼                               │
//! │                         ┌──────────┐                         │
//! │                         │ Fetching │──► Cache hit ──► reply  │
//! │                         └────┬─────┘                         │
//! │                              │ misses                        │
//! │                              ▼                               │
//! │                        BatchFetcher ──► reply + cache put    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The daemon task owns the queue; callers only hold a channel sender, so
//! no lock guards the batch.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::cache::ResourceCache;
use crate::fetch::{BatchFetcher, FetchError, PendingResource, ResourceRequest};

// =============================================================================
// Configuration
// =============================================================================

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(16);

/// Default maximum number of resources per batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 64;

/// Default channel capacity for resource requests.
pub const DEFAULT_REQUEST_CHANNEL_CAPACITY: usize = 1024;

/// Configuration for the request coalescer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoalescerConfig {
    /// Quiet period after the last request before a batch is flushed.
    pub debounce: Duration,

    /// Batch size that triggers an immediate flush.
    pub max_batch_size: usize,

    /// Request channel capacity.
    pub channel_capacity: usize,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            channel_capacity: DEFAULT_REQUEST_CHANNEL_CAPACITY,
        }
    }
}

// =============================================================================
// State
// =============================================================================

/// Coalescer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoalescerState {
    /// Collecting requests, no flush running.
    Idle,
    /// A flush is running; new requests wait for the next flush.
    Fetching,
}

impl CoalescerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => CoalescerState::Fetching,
            _ => CoalescerState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            CoalescerState::Idle => 0,
            CoalescerState::Fetching => 1,
        }
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Handle for submitting requests to the coalescer daemon.
///
/// Cheap to clone; all clones feed the same daemon.
#[derive(Clone)]
pub struct RequestCoalescer {
    request_tx: mpsc::Sender<ResourceRequest>,
    state: Arc<AtomicU8>,
    flushes: Arc<AtomicU64>,
}

impl RequestCoalescer {
    /// Spawn the daemon and return its handle.
    ///
    /// The daemon runs until `shutdown` is cancelled or every handle is
    /// dropped. Requests still queued at shutdown are answered with
    /// `FetchError::Cancelled`.
    pub fn start(
        config: CoalescerConfig,
        cache: ResourceCache,
        fetcher: BatchFetcher,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (request_tx, request_rx) = mpsc::channel(config.channel_capacity.max(1));
        let state = Arc::new(AtomicU8::new(CoalescerState::Idle.as_u8()));
        let flushes = Arc::new(AtomicU64::new(0));

        let daemon = CoalescerDaemon {
            config,
            cache,
            fetcher,
            request_rx,
            state: Arc::clone(&state),
            flushes: Arc::clone(&flushes),
        };
        let handle = tokio::spawn(daemon.run(shutdown));

        (
            Self {
                request_tx,
                state,
                flushes,
            },
            handle,
        )
    }

    /// Queue a resource for the next flush.
    pub async fn enqueue(&self, resource_path: &str) -> PendingResource {
        let (request, pending) = ResourceRequest::new(resource_path);
        if self.request_tx.send(request).await.is_err() {
            return PendingResource::failed(resource_path, FetchError::Cancelled);
        }
        pending
    }

    /// Current daemon state.
    pub fn state(&self) -> CoalescerState {
        CoalescerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of flushes completed so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Acquire)
    }
}

// =============================================================================
// Daemon
// =============================================================================

struct CoalescerDaemon {
    config: CoalescerConfig,
    cache: ResourceCache,
    fetcher: BatchFetcher,
    request_rx: mpsc::Receiver<ResourceRequest>,
    state: Arc<AtomicU8>,
    flushes: Arc<AtomicU64>,
}

impl CoalescerDaemon {
    async fn run(mut self, shutdown: CancellationToken) {
        info!(
            debounce_ms = self.config.debounce.as_millis() as u64,
            max_batch_size = self.config.max_batch_size,
            endpoint = self.fetcher.endpoint(),
            "Request coalescer started"
        );

        loop {
            let first = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                request = self.request_rx.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            let mut batch = vec![first];
            if !self.collect(&mut batch, &shutdown).await {
                break;
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.flush(batch) => {}
            }
        }

        self.state.store(CoalescerState::Idle.as_u8(), Ordering::Release);
        self.request_rx.close();
        info!("Request coalescer stopped");
    }

    /// Extend `batch` until the debounce window passes with no new request
    /// or the batch is full. Returns `false` on shutdown.
    async fn collect(
        &mut self,
        batch: &mut Vec<ResourceRequest>,
        shutdown: &CancellationToken,
    ) -> bool {
        while batch.len() < self.config.max_batch_size {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return false,
                request = self.request_rx.recv() => match request {
                    Some(request) => batch.push(request),
                    None => return true,
                },
                _ = tokio::time::sleep(self.config.debounce) => return true,
            }
        }
        true
    }

    #[instrument(skip_all, fields(batch_size = batch.len()))]
    async fn flush(&self, batch: Vec<ResourceRequest>) {
        self.state
            .store(CoalescerState::Fetching.as_u8(), Ordering::Release);

        let mut misses = Vec::with_capacity(batch.len());
        let mut hits = 0usize;
        for request in batch {
            match self.cache.lookup(request.resource_path()).await {
                Some(entry) => {
                    hits += 1;
                    request.resolve(entry);
                }
                None => misses.push(request),
            }
        }

        debug!(hits, misses = misses.len(), "Flushing resource batch");

        if !misses.is_empty() {
            self.fetcher.fetch(misses).await;
        }

        self.flushes.fetch_add(1, Ordering::AcqRel);
        self.state.store(CoalescerState::Idle.as_u8(), Ordering::Release);
    }
}
