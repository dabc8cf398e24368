//! Resolution query.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::bundle::ResourceMap;
use crate::resolve::candidates::normalize_tag;
use crate::resolve::BundleLoader;

/// Predicate selecting which candidates ship a default bundle.
pub type LanguageFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Transformation applied to a loaded default bundle.
pub type BundleFormatter = Arc<dyn Fn(ResourceMap) -> ResourceMap + Send + Sync>;

/// What a component asks the resolver for.
///
/// Without a filter every candidate is offered to the loader.
#[derive(Clone)]
pub struct ResourceQuery {
    loader: Arc<dyn BundleLoader>,
    filter: Option<LanguageFilter>,
    format: Option<BundleFormatter>,
    override_collection: Option<String>,
}

impl ResourceQuery {
    /// Create a query loading defaults through `loader`.
    pub fn new(loader: Arc<dyn BundleLoader>) -> Self {
        Self {
            loader,
            filter: None,
            format: None,
            override_collection: None,
        }
    }

    /// Only offer candidates in the given set of shipped languages.
    pub fn with_supported_languages<I, S>(self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let supported: HashSet<String> = languages
            .into_iter()
            .map(|l| normalize_tag(l.as_ref()))
            .collect();
        self.with_filter(move |language| supported.contains(language))
    }

    /// Only offer candidates accepted by `filter`.
    pub fn with_filter(mut self, filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Transform each loaded default bundle before use.
    pub fn with_format(
        mut self,
        format: impl Fn(ResourceMap) -> ResourceMap + Send + Sync + 'static,
    ) -> Self {
        self.format = Some(Arc::new(format));
        self
    }

    /// Fetch overrides from this collection instead of the client default.
    pub fn with_override_collection(mut self, collection: impl Into<String>) -> Self {
        self.override_collection = Some(collection.into());
        self
    }

    /// The default-bundle loader.
    pub fn loader(&self) -> &dyn BundleLoader {
        self.loader.as_ref()
    }

    /// Whether `language` passes the shipped-pack filter.
    pub fn accepts(&self, language: &str) -> bool {
        self.filter.as_ref().map_or(true, |f| f(language))
    }

    /// Apply the format hook, if any.
    pub fn format(&self, bundle: ResourceMap) -> ResourceMap {
        match &self.format {
            Some(format) => format(bundle),
            None => bundle,
        }
    }

    /// The override collection set on this query.
    pub fn override_collection(&self) -> Option<&str> {
        self.override_collection.as_deref()
    }
}

impl fmt::Debug for ResourceQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceQuery")
            .field("filter", &self.filter.is_some())
            .field("format", &self.format.is_some())
            .field("override_collection", &self.override_collection)
            .finish()
    }
}
