//! Language resolution and override merging.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::bundle::{ResolvedResourceBundle, ResourceMap};
use crate::fetch::ResourcePool;
use crate::resolve::candidates::{is_region_qualified, normalize_candidates};
use crate::resolve::ResourceQuery;

/// Resource path of an override bundle inside a collection.
pub fn override_path(collection: &str, language: &str) -> String {
    format!("{}/{}.json", collection.trim_matches('/'), language)
}

/// Overlay override bundles onto `defaults`.
///
/// `overrides` is in candidate order (most specific first). They are applied
/// from least to most specific so the most specific value wins.
pub fn merge_resources(mut defaults: ResourceMap, overrides: &[Arc<ResourceMap>]) -> ResourceMap {
    for layer in overrides.iter().rev() {
        defaults.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    defaults
}

/// Resolves candidate languages into a merged resource bundle.
pub struct LanguageResolver {
    pool: Arc<ResourcePool>,
    default_collection: Option<String>,
}

impl LanguageResolver {
    /// Create a resolver fetching overrides through `pool`.
    ///
    /// `default_collection` is used when a query names no override
    /// collection; with neither, no overrides are requested.
    pub fn new(pool: Arc<ResourcePool>, default_collection: Option<String>) -> Self {
        Self {
            pool,
            default_collection,
        }
    }

    /// Resolve `candidates` for `query`.
    ///
    /// Returns `None` when no candidate has a shipped default bundle.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn resolve<S: AsRef<str>>(
        &self,
        query: &ResourceQuery,
        candidates: &[S],
    ) -> Option<ResolvedResourceBundle> {
        let candidates = normalize_candidates(candidates);
        let collection = query
            .override_collection()
            .or(self.default_collection.as_deref());

        let (defaults, overrides) = tokio::join!(
            load_defaults(query, &candidates),
            self.fetch_overrides(collection, &candidates)
        );

        let (language, defaults) = defaults?;
        debug!(
            language = %language,
            keys = defaults.len(),
            overrides = overrides.len(),
            "Language resolved"
        );

        Some(ResolvedResourceBundle {
            language,
            resources: merge_resources(defaults, &overrides),
        })
    }

    /// Fetch every region-qualified override, in candidate order.
    ///
    /// Failures are dropped; a missing override is not an error.
    async fn fetch_overrides(
        &self,
        collection: Option<&str>,
        candidates: &[String],
    ) -> Vec<Arc<ResourceMap>> {
        let Some(collection) = collection else {
            return Vec::new();
        };

        let requests = candidates
            .iter()
            .filter(|language| is_region_qualified(language))
            .map(|language| self.pool.pool(&override_path(collection, language)));

        join_all(requests)
            .await
            .into_iter()
            .filter_map(|result| match result {
                Ok(map) => Some(map),
                Err(e) => {
                    debug!(error = %e, "Override unavailable");
                    None
                }
            })
            .collect()
    }
}

/// Load the first non-empty shipped bundle among the accepted candidates.
async fn load_defaults(
    query: &ResourceQuery,
    candidates: &[String],
) -> Option<(String, ResourceMap)> {
    for language in candidates {
        if !query.accepts(language) {
            continue;
        }
        match query.loader().load(language).await {
            Ok(Some(bundle)) if !bundle.is_empty() => {
                return Some((language.clone(), query.format(bundle)));
            }
            Ok(_) => debug!(language = %language, "No shipped bundle"),
            Err(e) => warn!(language = %language, error = %e, "Failed to load shipped bundle"),
        }
    }
    debug!("No candidate language has a shipped bundle");
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BoxFuture;
    use crate::fetch::{FetchMode, MockHttpClient, DEFAULT_POOL_CAPACITY, DEFAULT_REQUEST_TIMEOUT};
    use crate::resolve::{BundleLoader, LoadError, StaticBundleLoader};

    fn resolver(mock: Arc<MockHttpClient>) -> LanguageResolver {
        let pool = ResourcePool::new(
            FetchMode::Direct {
                http: mock,
                collection_url: "https://cdn/overrides".to_string(),
            },
            DEFAULT_POOL_CAPACITY,
            DEFAULT_REQUEST_TIMEOUT,
        );
        LanguageResolver::new(Arc::new(pool), Some("app".to_string()))
    }

    fn greek_query() -> ResourceQuery {
        let loader = StaticBundleLoader::new()
            .with_bundle("el", [("txtOne", "Ένα"), ("txtTwo", "Δύο")])
            .with_bundle("en", [("txtOne", "One"), ("txtTwo", "Two")]);
        ResourceQuery::new(Arc::new(loader)).with_supported_languages(["el", "en"])
    }

    #[test]
    fn test_merge_most_specific_wins() {
        let defaults: ResourceMap = [
            ("a".to_string(), "default".to_string()),
            ("b".to_string(), "default".to_string()),
            ("c".to_string(), "default".to_string()),
        ]
        .into();
        let most_specific = Arc::new([("a".to_string(), "el-gr".to_string())].into());
        let less_specific = Arc::new(
            [
                ("a".to_string(), "en-gb".to_string()),
                ("b".to_string(), "en-gb".to_string()),
            ]
            .into(),
        );

        let merged = merge_resources(defaults, &[most_specific, less_specific]);
        assert_eq!(merged["a"], "el-gr");
        assert_eq!(merged["b"], "en-gb");
        assert_eq!(merged["c"], "default");
    }

    #[test]
    fn test_override_path() {
        assert_eq!(override_path("app", "el-gr"), "app/el-gr.json");
        assert_eq!(override_path("/app/", "en-us"), "app/en-us.json");
    }

    #[tokio::test]
    async fn test_fallback_order_with_override() {
        let mock = Arc::new(
            MockHttpClient::new().with_resource("app/el-gr.json", r#"{"txtTwo":"Δύο!"}"#),
        );
        let resolver = resolver(mock.clone());

        let bundle = resolver
            .resolve(&greek_query(), &["el-GR", "el", "en-GB", "en-US", "en"])
            .await
            .unwrap();

        assert_eq!(bundle.language, "el");
        assert_eq!(bundle.resources["txtOne"], "Ένα");
        assert_eq!(bundle.resources["txtTwo"], "Δύο!");
    }

    #[tokio::test]
    async fn test_short_tags_never_fetched_as_overrides() {
        let mock = Arc::new(MockHttpClient::new());
        let resolver = resolver(mock.clone());

        resolver
            .resolve(&greek_query(), &["el-GR", "el", "en-GB", "en-US", "en"])
            .await
            .unwrap();

        let mut requested = mock.requested_resources();
        requested.sort();
        assert_eq!(
            requested,
            vec![
                "https://cdn/overrides/app/el-gr.json",
                "https://cdn/overrides/app/en-gb.json",
                "https://cdn/overrides/app/en-us.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_unresolved_when_nothing_ships() {
        let mock = Arc::new(MockHttpClient::new());
        let resolver = resolver(mock);
        let query = ResourceQuery::new(Arc::new(StaticBundleLoader::new()));

        assert!(resolver.resolve(&query, &["de-DE", "de"]).await.is_none());
    }

    #[tokio::test]
    async fn test_empty_bundle_skipped() {
        let loader = StaticBundleLoader::new()
            .with_bundle("fr", std::iter::empty::<(String, String)>())
            .with_bundle("en", [("k", "v")]);
        let query = ResourceQuery::new(Arc::new(loader));
        let resolver = resolver(Arc::new(MockHttpClient::new()));

        let bundle = resolver.resolve(&query, &["fr", "en"]).await.unwrap();
        assert_eq!(bundle.language, "en");
    }

    struct FailingLoader;

    impl BundleLoader for FailingLoader {
        fn load(&self, language: &str) -> BoxFuture<'_, Result<Option<ResourceMap>, LoadError>> {
            let result = if language == "fr" {
                Err(LoadError::Parse {
                    language: language.to_string(),
                    reason: "broken".to_string(),
                })
            } else {
                Ok(Some([("k".to_string(), language.to_string())].into()))
            };
            Box::pin(async move { result })
        }
    }

    #[tokio::test]
    async fn test_loader_error_falls_through() {
        let query = ResourceQuery::new(Arc::new(FailingLoader));
        let resolver = resolver(Arc::new(MockHttpClient::new()));

        let bundle = resolver.resolve(&query, &["fr", "en"]).await.unwrap();
        assert_eq!(bundle.language, "en");
    }

    #[tokio::test]
    async fn test_format_hook_applies_to_defaults() {
        let query = greek_query().with_format(|mut map| {
            map.insert("extra".to_string(), "added".to_string());
            map
        });
        let resolver = resolver(Arc::new(MockHttpClient::new()));

        let bundle = resolver.resolve(&query, &["en"]).await.unwrap();
        assert_eq!(bundle.resources["extra"], "added");
    }

    #[tokio::test]
    async fn test_query_collection_overrides_default() {
        let mock = Arc::new(MockHttpClient::new());
        let resolver = resolver(mock.clone());
        let query = greek_query().with_override_collection("other");

        resolver.resolve(&query, &["en-US", "en"]).await.unwrap();
        assert_eq!(
            mock.requested_resources(),
            vec!["https://cdn/overrides/other/en-us.json"]
        );
    }

    #[tokio::test]
    async fn test_no_collection_means_no_overrides() {
        let mock = Arc::new(MockHttpClient::new());
        let pool = ResourcePool::new(
            FetchMode::Direct {
                http: mock.clone(),
                collection_url: "https://cdn/overrides".to_string(),
            },
            DEFAULT_POOL_CAPACITY,
            DEFAULT_REQUEST_TIMEOUT,
        );
        let resolver = LanguageResolver::new(Arc::new(pool), None);

        resolver.resolve(&greek_query(), &["en-US", "en"]).await.unwrap();
        assert!(mock.requests().is_empty());
    }
}
