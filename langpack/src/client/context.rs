//! The localization client context.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::config::ClientConfig;
use crate::bundle::ResolvedResourceBundle;
use crate::cache::{CacheStorage, ResourceCache};
use crate::fetch::{
    BatchFetcher, CoalescerState, FetchMode, HttpClient, RequestCoalescer, ResourcePool,
    SharedResource,
};
use crate::resolve::{LanguageResolver, ResourceQuery};

/// Which fetch strategy the client settled on at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchModeKind {
    /// Debounced batches through the coalescer, persistent cache first.
    Batched,
    /// One GET per resource, no client-side caching.
    Direct,
}

/// Owns the request pool, coalescer daemon and resolver for one collection.
///
/// Independent clients share nothing, so tests and multiple collections can
/// run side by side. Dropping the client cancels its daemon.
///
/// # Example
///
/// ```ignore
/// let client = LocalizationClient::start(config, http, Some(storage)).await;
/// let bundle = client.get_localize_resources(&query, &["fr-FR", "fr", "en"]).await;
/// client.shutdown().await;
/// ```
pub struct LocalizationClient {
    config: ClientConfig,
    mode: FetchModeKind,
    pool: Arc<ResourcePool>,
    resolver: LanguageResolver,
    coalescer: Option<RequestCoalescer>,
    daemon: Mutex<Option<JoinHandle<()>>>,
    shutdown: CancellationToken,
}

impl LocalizationClient {
    /// Start a client.
    ///
    /// Batched mode is used when a batch endpoint is configured and
    /// `storage` opens the configured cache; otherwise the client runs in
    /// direct mode. Must be called from within a Tokio runtime.
    pub async fn start(
        config: ClientConfig,
        http: Arc<dyn HttpClient>,
        storage: Option<Arc<dyn CacheStorage>>,
    ) -> Self {
        let shutdown = CancellationToken::new();

        let cache = match (&config.batch_endpoint, &storage) {
            (Some(_), Some(storage)) => {
                ResourceCache::open(
                    Some(storage.as_ref()),
                    &config.cache_name,
                    config.collection_url.clone(),
                )
                .await
            }
            _ => ResourceCache::unavailable(config.collection_url.clone()),
        };

        let (mode, coalescer, daemon) = match &config.batch_endpoint {
            Some(endpoint) if cache.is_available() => {
                let fetcher = BatchFetcher::new(Arc::clone(&http), endpoint.clone(), cache.clone());
                let (coalescer, daemon) = RequestCoalescer::start(
                    config.coalescer_config(),
                    cache,
                    fetcher,
                    shutdown.child_token(),
                );
                (
                    FetchMode::Batched(coalescer.clone()),
                    Some(coalescer),
                    Some(daemon),
                )
            }
            _ => (
                FetchMode::Direct {
                    http,
                    collection_url: config.collection_url.clone(),
                },
                None,
                None,
            ),
        };

        let kind = match mode {
            FetchMode::Batched(_) => FetchModeKind::Batched,
            FetchMode::Direct { .. } => FetchModeKind::Direct,
        };

        let pool = Arc::new(ResourcePool::new(
            mode,
            config.pool_capacity,
            config.request_timeout,
        ));
        let resolver = LanguageResolver::new(Arc::clone(&pool), config.override_collection.clone());

        info!(
            mode = ?kind,
            collection = %config.collection_url,
            batch_endpoint = config.batch_endpoint.as_deref().unwrap_or("-"),
            "Localization client started"
        );

        Self {
            config,
            mode: kind,
            pool,
            resolver,
            coalescer,
            daemon: Mutex::new(daemon),
            shutdown,
        }
    }

    /// Resolve `candidates` into a merged resource bundle.
    ///
    /// Returns `None` when no candidate has a shipped default bundle.
    pub async fn get_localize_resources<S: AsRef<str>>(
        &self,
        query: &ResourceQuery,
        candidates: &[S],
    ) -> Option<ResolvedResourceBundle> {
        self.resolver.resolve(query, candidates).await
    }

    /// The pooled future for one resource path.
    pub fn pool(&self, resource_path: &str) -> SharedResource {
        self.pool.pool(resource_path)
    }

    /// Drop every pooled resource; the next request fetches again.
    pub fn clear(&self) {
        debug!("Clearing resource pool");
        self.pool.clear();
    }

    /// The client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The fetch strategy in use.
    pub fn mode(&self) -> FetchModeKind {
        self.mode
    }

    /// Coalescer state, in batched mode.
    pub fn coalescer_state(&self) -> Option<CoalescerState> {
        self.coalescer.as_ref().map(RequestCoalescer::state)
    }

    /// A token cancelled when the client shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Whether shutdown has begun.
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Cancel the coalescer and watchers, clear the pool and wait for the
    /// daemon to exit. Pending requests fail with `FetchError::Cancelled`.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.pool.clear();

        let daemon = self.daemon.lock().take();
        if let Some(daemon) = daemon {
            let _ = daemon.await;
        }
        info!("Localization client shut down");
    }
}

impl Drop for LocalizationClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{BrokenStorage, MemoryCacheStorage};
    use crate::fetch::{FetchError, MockHttpClient};
    use crate::resolve::StaticBundleLoader;

    fn memory_storage() -> Option<Arc<dyn CacheStorage>> {
        Some(Arc::new(MemoryCacheStorage::new(1024 * 1024, None)))
    }

    fn query() -> ResourceQuery {
        let loader = StaticBundleLoader::new().with_bundle("en", [("hello", "Hello")]);
        ResourceQuery::new(Arc::new(loader)).with_supported_languages(["en"])
    }

    #[tokio::test]
    async fn test_batched_mode_selected() {
        let config =
            ClientConfig::new("https://cdn/overrides").with_batch_endpoint("https://cdn/batch");
        let client =
            LocalizationClient::start(config, Arc::new(MockHttpClient::new()), memory_storage())
                .await;

        assert_eq!(client.mode(), FetchModeKind::Batched);
        assert_eq!(client.coalescer_state(), Some(CoalescerState::Idle));
        client.shutdown().await;
    }

    #[tokio::test]
    async fn test_direct_mode_without_endpoint() {
        let config = ClientConfig::new("https://cdn/overrides");
        let client =
            LocalizationClient::start(config, Arc::new(MockHttpClient::new()), memory_storage())
                .await;

        assert_eq!(client.mode(), FetchModeKind::Direct);
        assert_eq!(client.coalescer_state(), None);
    }

    #[tokio::test]
    async fn test_direct_mode_when_cache_unavailable() {
        let config =
            ClientConfig::new("https://cdn/overrides").with_batch_endpoint("https://cdn/batch");

        let client =
            LocalizationClient::start(config.clone(), Arc::new(MockHttpClient::new()), None).await;
        assert_eq!(client.mode(), FetchModeKind::Direct);

        let client = LocalizationClient::start(
            config,
            Arc::new(MockHttpClient::new()),
            Some(Arc::new(BrokenStorage)),
        )
        .await;
        assert_eq!(client.mode(), FetchModeKind::Direct);
    }

    #[tokio::test]
    async fn test_direct_mode_fetches_each_resource() {
        let mock = Arc::new(
            MockHttpClient::new()
                .with_resource("app/en-us.json", r#"{"hello":"Howdy"}"#)
                .with_resource("app/en-gb.json", r#"{"hello":"Hello there"}"#),
        );
        let config = ClientConfig::new("https://cdn/overrides").with_override_collection("app");
        let client = LocalizationClient::start(config, mock.clone(), None).await;

        let bundle = client
            .get_localize_resources(&query(), &["en-US", "en-GB", "en"])
            .await
            .unwrap();

        assert_eq!(bundle.language, "en");
        assert_eq!(bundle.resources["hello"], "Howdy");
        assert_eq!(mock.get_count(), 2);
        assert_eq!(mock.post_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_and_clears() {
        let mock = Arc::new(MockHttpClient::new().with_resource("a.json", "{}"));
        let config = ClientConfig::new("https://cdn/overrides")
            .with_batch_endpoint("https://cdn/batch")
            .with_debounce(std::time::Duration::from_secs(60));
        let client = LocalizationClient::start(config, mock.clone(), memory_storage()).await;

        let pending = client.pool("a.json");
        let waiter = tokio::spawn(pending);
        tokio::task::yield_now().await;

        client.shutdown().await;

        assert_eq!(waiter.await.unwrap(), Err(FetchError::Cancelled));
        assert!(client.is_shut_down());
        assert!(mock.requests().is_empty());
    }
}
