//! Pending resource requests.

use tokio::sync::oneshot;
use tracing::trace;

use crate::cache::CacheEntry;
use crate::fetch::FetchError;

/// Result delivered to a requester.
pub type ResourceResult = Result<CacheEntry, FetchError>;

/// A request for one resource, owned by the coalescing queue until flushed.
///
/// Resolving or rejecting consumes the request, so each requester is
/// answered exactly once.
#[derive(Debug)]
pub struct ResourceRequest {
    resource_path: String,
    reply: oneshot::Sender<ResourceResult>,
}

impl ResourceRequest {
    /// Create a request and the handle its requester waits on.
    pub fn new(resource_path: impl Into<String>) -> (Self, PendingResource) {
        let resource_path = resource_path.into();
        let (reply, rx) = oneshot::channel();
        let pending = PendingResource {
            resource_path: resource_path.clone(),
            rx,
        };
        (
            Self {
                resource_path,
                reply,
            },
            pending,
        )
    }

    /// The requested resource path.
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// Publish a successful result.
    pub fn resolve(self, entry: CacheEntry) {
        self.send(Ok(entry));
    }

    /// Publish a failure.
    pub fn reject(self, error: FetchError) {
        self.send(Err(error));
    }

    fn send(self, result: ResourceResult) {
        if self.reply.send(result).is_err() {
            // Requester gave up (timeout or shutdown); nothing to deliver to.
            trace!(resource = %self.resource_path, "Requester dropped before reply");
        }
    }
}

/// The requester's side of a [`ResourceRequest`].
#[derive(Debug)]
pub struct PendingResource {
    resource_path: String,
    rx: oneshot::Receiver<ResourceResult>,
}

impl PendingResource {
    /// A pending resource that has already failed.
    pub(crate) fn failed(resource_path: impl Into<String>, error: FetchError) -> Self {
        let (request, pending) = ResourceRequest::new(resource_path);
        request.reject(error);
        pending
    }

    /// The requested resource path.
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// Wait for the result.
    ///
    /// A request dropped without an answer (coalescer shut down) yields
    /// `FetchError::Cancelled`.
    pub async fn wait(self) -> ResourceResult {
        self.rx.await.unwrap_or(Err(FetchError::Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_delivers_entry() {
        let (request, pending) = ResourceRequest::new("app/en-us.json");
        assert_eq!(pending.resource_path(), "app/en-us.json");

        request.resolve(CacheEntry::new("{}", 200));
        let entry = pending.wait().await.unwrap();
        assert_eq!(entry.status, 200);
    }

    #[tokio::test]
    async fn test_reject_delivers_error() {
        let (request, pending) = ResourceRequest::new("r");
        request.reject(FetchError::BatchFetchFailed {
            reason: "503".to_string(),
        });
        assert!(matches!(
            pending.wait().await,
            Err(FetchError::BatchFetchFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_dropped_request_is_cancelled() {
        let (request, pending) = ResourceRequest::new("r");
        drop(request);
        assert_eq!(pending.wait().await, Err(FetchError::Cancelled));
    }

    #[test]
    fn test_resolve_after_requester_dropped_is_silent() {
        let (request, pending) = ResourceRequest::new("r");
        drop(pending);
        request.resolve(CacheEntry::new("{}", 200));
    }
}
