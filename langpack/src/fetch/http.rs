//! HTTP client abstraction for testability

use std::collections::BTreeMap;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;

use crate::cache::BoxFuture;
use crate::fetch::FetchError;

/// Default HTTP request timeout.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// A fully read HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,

    /// Response headers, lower-cased names.
    pub headers: BTreeMap<String, String>,

    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response with no headers.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Add a header to the response.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Whether the status is 2xx (`response.ok`).
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Trait for HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
///
/// Implementations return `Ok` for any response that arrived, whatever its
/// status; `Err` is reserved for transport failures.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request.
    fn get(&self, url: &str) -> BoxFuture<'_, Result<HttpResponse, FetchError>>;

    /// Performs an HTTP POST with a JSON body.
    fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> BoxFuture<'_, Result<HttpResponse, FetchError>>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_HTTP_TIMEOUT)
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse, FetchError> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(format!("Failed to read response: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> BoxFuture<'_, Result<HttpResponse, FetchError>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| FetchError::Http(format!("Request failed: {}", e)))?;
            Self::read(response).await
        })
    }

    fn post_json(
        &self,
        url: &str,
        body: Vec<u8>,
    ) -> BoxFuture<'_, Result<HttpResponse, FetchError>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self
                .client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await
                .map_err(|e| FetchError::Http(format!("Request failed: {}", e)))?;
            Self::read(response).await
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// A request observed by [`MockHttpClient`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MockRequest {
        Get(String),
        Post { url: String, resources: Vec<String> },
    }

    /// Mock HTTP client serving resources by path.
    ///
    /// GETs match any URL ending in a registered resource path. POSTs are
    /// answered in the batch wire format using the same registry.
    pub struct MockHttpClient {
        resources: HashMap<String, (u16, String)>,
        batch_status: u16,
        batch_limit: Option<usize>,
        delay: Option<Duration>,
        fail_transport: bool,
        requests: Mutex<Vec<MockRequest>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self {
                resources: HashMap::new(),
                batch_status: 200,
                batch_limit: None,
                delay: None,
                fail_transport: false,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn with_resource(mut self, path: &str, body: &str) -> Self {
            self.resources
                .insert(path.to_string(), (200, body.to_string()));
            self
        }

        pub fn with_status(mut self, path: &str, status: u16) -> Self {
            self.resources.insert(path.to_string(), (status, String::new()));
            self
        }

        pub fn with_batch_status(mut self, status: u16) -> Self {
            self.batch_status = status;
            self
        }

        /// Only answer the first `limit` resources of each batch.
        pub fn with_batch_limit(mut self, limit: usize) -> Self {
            self.batch_limit = Some(limit);
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn with_transport_failure(mut self) -> Self {
            self.fail_transport = true;
            self
        }

        pub fn requests(&self) -> Vec<MockRequest> {
            self.requests.lock().clone()
        }

        pub fn post_count(&self) -> usize {
            self.requests()
                .iter()
                .filter(|r| matches!(r, MockRequest::Post { .. }))
                .count()
        }

        pub fn get_count(&self) -> usize {
            self.requests()
                .iter()
                .filter(|r| matches!(r, MockRequest::Get(_)))
                .count()
        }

        /// Every resource path requested, via GET or inside a batch.
        pub fn requested_resources(&self) -> Vec<String> {
            let mut all = Vec::new();
            for request in self.requests() {
                match request {
                    MockRequest::Get(url) => all.push(url),
                    MockRequest::Post { resources, .. } => all.extend(resources),
                }
            }
            all
        }

        fn find(&self, url: &str) -> (u16, String) {
            self.resources
                .iter()
                .find(|(path, _)| url == path.as_str() || url.ends_with(&format!("/{}", path)))
                .map(|(_, answer)| answer.clone())
                .unwrap_or((404, String::new()))
        }

        async fn pause(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str) -> BoxFuture<'_, Result<HttpResponse, FetchError>> {
            self.requests.lock().push(MockRequest::Get(url.to_string()));
            let url = url.to_string();
            Box::pin(async move {
                self.pause().await;
                if self.fail_transport {
                    return Err(FetchError::Http("connection refused".to_string()));
                }
                let (status, body) = self.find(&url);
                Ok(HttpResponse::new(status, body).with_header("content-type", "application/json"))
            })
        }

        fn post_json(
            &self,
            url: &str,
            body: Vec<u8>,
        ) -> BoxFuture<'_, Result<HttpResponse, FetchError>> {
            let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
            let resources: Vec<String> = parsed["resources"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap().to_string())
                .collect();
            self.requests.lock().push(MockRequest::Post {
                url: url.to_string(),
                resources: resources.clone(),
            });

            Box::pin(async move {
                self.pause().await;
                if self.fail_transport {
                    return Err(FetchError::Http("connection refused".to_string()));
                }
                if self.batch_status != 200 {
                    return Ok(HttpResponse::new(self.batch_status, "upstream error"));
                }
                let limit = self.batch_limit.unwrap_or(resources.len());
                let responses: Vec<serde_json::Value> = resources
                    .iter()
                    .take(limit)
                    .map(|path| {
                        let (status, body) = self.find(path);
                        serde_json::json!({
                            "status": status,
                            "headers": { "content-type": "application/json" },
                            "body": body,
                        })
                    })
                    .collect();
                let payload = serde_json::json!({ "responses": responses });
                Ok(HttpResponse::new(200, serde_json::to_vec(&payload).unwrap()))
            })
        }
    }

    #[tokio::test]
    async fn test_mock_get_matches_resource_suffix() {
        let mock = MockHttpClient::new().with_resource("app/en-us.json", r#"{"a":"b"}"#);

        let hit = mock.get("https://cdn/app/en-us.json").await.unwrap();
        assert!(hit.is_ok());
        assert_eq!(&hit.body[..], br#"{"a":"b"}"#);

        let miss = mock.get("https://cdn/app/fr-fr.json").await.unwrap();
        assert_eq!(miss.status, 404);
        assert_eq!(mock.get_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_batch_records_resources() {
        let mock = MockHttpClient::new().with_resource("a", "{}");
        let body = serde_json::to_vec(&serde_json::json!({"resources": ["a", "b"]})).unwrap();

        let response = mock.post_json("https://cdn/batch", body).await.unwrap();
        assert!(response.is_ok());
        assert_eq!(mock.post_count(), 1);
        assert_eq!(mock.requested_resources(), vec!["a", "b"]);
    }

    #[test]
    fn test_http_response_is_ok() {
        assert!(HttpResponse::new(200, "").is_ok());
        assert!(HttpResponse::new(299, "").is_ok());
        assert!(!HttpResponse::new(304, "").is_ok());
        assert!(!HttpResponse::new(503, "").is_ok());
    }
}
