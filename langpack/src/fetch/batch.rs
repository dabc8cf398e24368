//! Batch fetcher.
//!
//! Turns a list of cache-miss resource requests into one POST to the batch
//! endpoint and distributes the individual results.
//!
//! # Wire Format
//!
//! Request:
//!
//! ```json
//! { "resources": ["app/el-gr.json", "app/en-us.json"] }
//! ```
//!
//! Response, one result per requested resource in request order:
//!
//! ```json
//! { "responses": [
//!     { "status": 200, "headers": { "content-type": "application/json" }, "body": "{...}" },
//!     { "status": 404, "headers": {}, "body": "" }
//! ] }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::cache::{CacheEntry, ResourceCache};
use crate::fetch::{FetchError, HttpClient, ResourceRequest};

/// Body of a batch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequestBody {
    /// Resource paths, in the order results are expected back.
    pub resources: Vec<String>,
}

/// Body of a batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponseBody {
    /// One result per requested resource.
    pub responses: Vec<BatchItem>,
}

/// One resource's result inside a batch response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// HTTP status for this resource.
    pub status: u16,

    /// Response headers for this resource.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Response body as text.
    #[serde(default)]
    pub body: String,
}

/// Counts from one batch, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Requests resolved with a resource.
    pub succeeded: usize,
    /// Requests rejected.
    pub failed: usize,
}

/// Issues batch requests and publishes their results.
#[derive(Clone)]
pub struct BatchFetcher {
    http: Arc<dyn HttpClient>,
    endpoint: String,
    cache: ResourceCache,
}

impl BatchFetcher {
    /// Create a fetcher posting to `endpoint` and storing successes in `cache`.
    pub fn new(
        http: Arc<dyn HttpClient>,
        endpoint: impl Into<String>,
        cache: ResourceCache,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            cache,
        }
    }

    /// The batch endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch every request in one round trip.
    ///
    /// Each request is answered exactly once. Successful results are written
    /// to the cache; all writes complete before this returns. A failed batch
    /// call rejects every request and caches nothing.
    #[instrument(skip_all, fields(batch_size = requests.len()))]
    pub async fn fetch(&self, requests: Vec<ResourceRequest>) -> BatchOutcome {
        if requests.is_empty() {
            return BatchOutcome::default();
        }

        let body = BatchRequestBody {
            resources: requests
                .iter()
                .map(|r| r.resource_path().to_string())
                .collect(),
        };
        let payload = match serde_json::to_vec(&body) {
            Ok(payload) => payload,
            Err(e) => return reject_all(requests, format!("failed to encode request: {}", e)),
        };

        let response = match self.http.post_json(&self.endpoint, payload).await {
            Ok(response) if response.is_ok() => response,
            Ok(response) => {
                return reject_all(
                    requests,
                    format!("HTTP {} from {}", response.status, self.endpoint),
                )
            }
            Err(e) => return reject_all(requests, e.to_string()),
        };

        let parsed: BatchResponseBody = match serde_json::from_slice(&response.body) {
            Ok(parsed) => parsed,
            Err(e) => return reject_all(requests, format!("invalid batch response: {}", e)),
        };

        if parsed.responses.len() != requests.len() {
            warn!(
                requested = requests.len(),
                received = parsed.responses.len(),
                "Batch response size mismatch"
            );
        }

        let mut outcome = BatchOutcome::default();
        let mut writes = Vec::new();
        let mut items = parsed.responses.into_iter();

        for request in requests {
            let resource = request.resource_path().to_string();
            match items.next() {
                Some(item) if (200..300).contains(&item.status) => {
                    let entry = CacheEntry {
                        body: Bytes::from(item.body),
                        status: item.status,
                        headers: item.headers,
                    };
                    let cache = &self.cache;
                    let stored = entry.clone();
                    writes.push(async move { cache.put(&resource, stored).await });
                    request.resolve(entry);
                    outcome.succeeded += 1;
                }
                Some(item) => {
                    debug!(
                        resource = %resource,
                        status = item.status,
                        "Resource failed within batch"
                    );
                    request.reject(FetchError::SingleFetchFailed {
                        resource,
                        status: item.status,
                    });
                    outcome.failed += 1;
                }
                None => {
                    request.reject(FetchError::MissingBatchResponse { resource });
                    outcome.failed += 1;
                }
            }
        }

        join_all(writes).await;

        debug!(
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "Batch fetch complete"
        );
        outcome
    }
}

/// Reject every request with `BatchFetchFailed`.
fn reject_all(requests: Vec<ResourceRequest>, reason: String) -> BatchOutcome {
    warn!(batch_size = requests.len(), reason = %reason, "Batch fetch failed");
    let failed = requests.len();
    for request in requests {
        request.reject(FetchError::BatchFetchFailed {
            reason: reason.clone(),
        });
    }
    BatchOutcome {
        succeeded: 0,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RecordingCache;
    use crate::fetch::{MockHttpClient, MockRequest, PendingResource};

    fn requests(paths: &[&str]) -> (Vec<ResourceRequest>, Vec<PendingResource>) {
        paths.iter().map(|p| ResourceRequest::new(*p)).unzip()
    }

    fn fetcher(mock: MockHttpClient) -> (BatchFetcher, Arc<MockHttpClient>, Arc<RecordingCache>) {
        let mock = Arc::new(mock);
        let cache = Arc::new(RecordingCache::default());
        let fetcher = BatchFetcher::new(
            mock.clone(),
            "https://cdn/batch",
            ResourceCache::new(cache.clone(), "https://cdn/app"),
        );
        (fetcher, mock, cache)
    }

    #[tokio::test]
    async fn test_batch_all_succeed_single_request() {
        let (fetcher, mock, cache) = fetcher(
            MockHttpClient::new()
                .with_resource("a.json", r#"{"k":"a"}"#)
                .with_resource("b.json", r#"{"k":"b"}"#),
        );
        let (reqs, pending) = requests(&["a.json", "b.json"]);

        let outcome = fetcher.fetch(reqs).await;

        assert_eq!(outcome, BatchOutcome { succeeded: 2, failed: 0 });
        assert_eq!(
            mock.requests(),
            vec![MockRequest::Post {
                url: "https://cdn/batch".to_string(),
                resources: vec!["a.json".to_string(), "b.json".to_string()],
            }]
        );
        assert_eq!(cache.put_count(), 2);

        let mut bodies = Vec::new();
        for p in pending {
            bodies.push(p.wait().await.unwrap().body);
        }
        assert_eq!(&bodies[0][..], br#"{"k":"a"}"#);
        assert_eq!(&bodies[1][..], br#"{"k":"b"}"#);
    }

    #[tokio::test]
    async fn test_batch_partial_failure_isolated() {
        let (fetcher, _mock, cache) = fetcher(
            MockHttpClient::new()
                .with_resource("one.json", "{}")
                .with_status("two.json", 404)
                .with_resource("three.json", "{}"),
        );
        let (reqs, pending) = requests(&["one.json", "two.json", "three.json"]);

        let outcome = fetcher.fetch(reqs).await;
        assert_eq!(outcome, BatchOutcome { succeeded: 2, failed: 1 });

        let mut results = Vec::new();
        for p in pending {
            results.push(p.wait().await);
        }
        assert!(results[0].is_ok());
        assert_eq!(
            results[1],
            Err(FetchError::SingleFetchFailed {
                resource: "two.json".to_string(),
                status: 404
            })
        );
        assert!(results[2].is_ok());
        assert_eq!(cache.put_count(), 2);
    }

    #[tokio::test]
    async fn test_batch_total_failure_rejects_all() {
        let (fetcher, _mock, cache) = fetcher(
            MockHttpClient::new()
                .with_resource("one.json", "{}")
                .with_resource("two.json", "{}")
                .with_resource("three.json", "{}")
                .with_batch_status(503),
        );
        let (reqs, pending) = requests(&["one.json", "two.json", "three.json"]);

        let outcome = fetcher.fetch(reqs).await;
        assert_eq!(outcome, BatchOutcome { succeeded: 0, failed: 3 });

        for p in pending {
            assert!(matches!(
                p.wait().await,
                Err(FetchError::BatchFetchFailed { .. })
            ));
        }
        assert_eq!(cache.put_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_transport_failure_rejects_all() {
        let (fetcher, _mock, cache) = fetcher(
            MockHttpClient::new()
                .with_resource("a.json", "{}")
                .with_transport_failure(),
        );
        let (reqs, pending) = requests(&["a.json"]);

        fetcher.fetch(reqs).await;

        for p in pending {
            assert!(matches!(
                p.wait().await,
                Err(FetchError::BatchFetchFailed { .. })
            ));
        }
        assert_eq!(cache.put_count(), 0);
    }

    #[tokio::test]
    async fn test_batch_short_response_rejects_unmatched() {
        let (fetcher, _mock, _cache) = fetcher(
            MockHttpClient::new()
                .with_resource("a.json", "{}")
                .with_resource("b.json", "{}")
                .with_batch_limit(1),
        );
        let (reqs, mut pending) = requests(&["a.json", "b.json"]);

        fetcher.fetch(reqs).await;

        let second = pending.pop().unwrap();
        assert_eq!(
            second.wait().await,
            Err(FetchError::MissingBatchResponse {
                resource: "b.json".to_string()
            })
        );
        assert!(pending.pop().unwrap().wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_batch_empty_is_noop() {
        let (fetcher, mock, _cache) = fetcher(MockHttpClient::new());
        assert_eq!(fetcher.fetch(Vec::new()).await, BatchOutcome::default());
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_batch_item_defaults() {
        let parsed: BatchResponseBody =
            serde_json::from_str(r#"{"responses":[{"status":404}]}"#).unwrap();
        assert_eq!(parsed.responses[0].body, "");
        assert!(parsed.responses[0].headers.is_empty());
    }
}
