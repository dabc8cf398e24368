//! Override resource fetching.
//!
//! This module turns resource paths into parsed resource maps:
//!
//! - [`ResourcePool`] deduplicates requests per resource path
//! - [`RequestCoalescer`] debounces requests into batches and answers cache hits
//! - [`BatchFetcher`] issues one POST per batch and publishes each result
//! - [`HttpClient`] abstracts the network so tests can inject mocks
//!
//! Without a batch endpoint or cache storage, the pool runs in direct mode and
//! issues one GET per resource instead.

mod batch;
mod coalescer;
mod error;
mod http;
mod pool;
mod request;

pub use batch::{BatchFetcher, BatchItem, BatchOutcome, BatchRequestBody, BatchResponseBody};
pub use coalescer::{
    CoalescerConfig, CoalescerState, RequestCoalescer, DEFAULT_DEBOUNCE, DEFAULT_MAX_BATCH_SIZE,
    DEFAULT_REQUEST_CHANNEL_CAPACITY,
};
pub use error::FetchError;
pub use http::{HttpClient, HttpResponse, ReqwestClient, DEFAULT_HTTP_TIMEOUT};
pub use pool::{
    FetchMode, ResourcePool, SharedResource, DEFAULT_POOL_CAPACITY, DEFAULT_REQUEST_TIMEOUT,
};
pub use request::{PendingResource, ResourceRequest, ResourceResult};

#[cfg(test)]
pub use http::tests::{MockHttpClient, MockRequest};
