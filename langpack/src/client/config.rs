//! Localization client configuration.

use std::time::Duration;

use crate::config::{ConfigError, ConfigFile, DEFAULT_CACHE_NAME};
use crate::fetch::{
    CoalescerConfig, DEFAULT_DEBOUNCE, DEFAULT_MAX_BATCH_SIZE, DEFAULT_POOL_CAPACITY,
    DEFAULT_REQUEST_CHANNEL_CAPACITY, DEFAULT_REQUEST_TIMEOUT,
};

/// Configuration for a [`LocalizationClient`](super::LocalizationClient).
///
/// Batched fetching needs both a `batch_endpoint` and cache storage; without
/// either the client fetches each override directly from `collection_url`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL override resource paths are relative to.
    pub collection_url: String,

    /// Bulk endpoint accepting many resource paths per request.
    pub batch_endpoint: Option<String>,

    /// Override collection used when a query names none.
    pub override_collection: Option<String>,

    /// Debounce window for batching.
    pub debounce: Duration,

    /// Batch size that triggers an immediate flush.
    pub max_batch_size: usize,

    /// Bound on each pooled request.
    pub request_timeout: Duration,

    /// Maximum number of pooled resources.
    pub pool_capacity: u64,

    /// Name of the persistent cache to open.
    pub cache_name: String,

    /// Coalescer request channel capacity.
    pub channel_capacity: usize,
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the
    /// collection URL.
    pub fn new(collection_url: impl Into<String>) -> Self {
        Self {
            collection_url: collection_url.into(),
            batch_endpoint: None,
            override_collection: None,
            debounce: DEFAULT_DEBOUNCE,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            channel_capacity: DEFAULT_REQUEST_CHANNEL_CAPACITY,
        }
    }

    /// Build from the `[network]` and `[cache]` sections of a config file.
    ///
    /// # Errors
    ///
    /// `ConfigError::Missing` when `network.collection_url` is unset.
    pub fn from_config_file(file: &ConfigFile) -> Result<Self, ConfigError> {
        let net = &file.network;
        let collection_url = net.collection_url.clone().ok_or_else(|| ConfigError::Missing {
            key: "network.collection_url".to_string(),
        })?;

        let mut config = Self::new(collection_url)
            .with_debounce(Duration::from_millis(net.debounce_ms))
            .with_max_batch_size(net.max_batch_size)
            .with_request_timeout(Duration::from_secs(net.request_timeout_secs))
            .with_pool_capacity(file.cache.pool_capacity)
            .with_cache_name(file.cache.name.clone());
        config.batch_endpoint = net.batch_endpoint.clone();
        config.override_collection = net.override_collection.clone();
        Ok(config)
    }

    /// Set the batch endpoint.
    pub fn with_batch_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.batch_endpoint = Some(endpoint.into());
        self
    }

    /// Set the default override collection.
    pub fn with_override_collection(mut self, collection: impl Into<String>) -> Self {
        self.override_collection = Some(collection.into());
        self
    }

    /// Set the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the batch size that triggers an immediate flush.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the pool capacity.
    pub fn with_pool_capacity(mut self, capacity: u64) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Set the persistent cache name.
    pub fn with_cache_name(mut self, name: impl Into<String>) -> Self {
        self.cache_name = name.into();
        self
    }

    /// Set the coalescer channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// The coalescer settings.
    pub fn coalescer_config(&self) -> CoalescerConfig {
        CoalescerConfig {
            debounce: self.debounce,
            max_batch_size: self.max_batch_size,
            channel_capacity: self.channel_capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("https://cdn/overrides");
        assert_eq!(config.debounce, Duration::from_millis(16));
        assert_eq!(config.max_batch_size, 64);
        assert!(config.batch_endpoint.is_none());
        assert_eq!(config.cache_name, "langpack-overrides");
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("https://cdn/overrides")
            .with_batch_endpoint("https://cdn/batch")
            .with_override_collection("app")
            .with_max_batch_size(0);

        assert_eq!(config.batch_endpoint.as_deref(), Some("https://cdn/batch"));
        assert_eq!(config.override_collection.as_deref(), Some("app"));
        assert_eq!(config.max_batch_size, 1);
        assert_eq!(config.coalescer_config().max_batch_size, 1);
    }

    #[test]
    fn test_from_config_file() {
        let mut file = ConfigFile::default();
        assert!(matches!(
            ClientConfig::from_config_file(&file),
            Err(ConfigError::Missing { .. })
        ));

        file.network.collection_url = Some("https://cdn/overrides".to_string());
        file.network.batch_endpoint = Some("https://cdn/batch".to_string());
        file.network.debounce_ms = 30;
        file.cache.pool_capacity = 8;

        let config = ClientConfig::from_config_file(&file).unwrap();
        assert_eq!(config.collection_url, "https://cdn/overrides");
        assert_eq!(config.batch_endpoint.as_deref(), Some("https://cdn/batch"));
        assert_eq!(config.debounce, Duration::from_millis(30));
        assert_eq!(config.pool_capacity, 8);
    }
}
