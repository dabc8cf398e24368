//! Shipped bundle loaders.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::bundle::{parse_resource_map, ResourceMap};
use crate::cache::BoxFuture;
use crate::resolve::candidates::normalize_tag;

/// Errors from loading a shipped bundle.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The bundle could not be read.
    #[error("failed to read bundle {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bundle is not a JSON object of strings.
    #[error("invalid bundle for {language}: {reason}")]
    Parse { language: String, reason: String },
}

/// Loads the shipped default bundle for a language.
///
/// `Ok(None)` means no bundle ships for the language; the resolver moves on
/// to the next candidate. Errors are logged and treated the same way.
pub trait BundleLoader: Send + Sync {
    /// Load the bundle for a normalized language tag.
    fn load(&self, language: &str) -> BoxFuture<'_, Result<Option<ResourceMap>, LoadError>>;
}

/// In-memory bundles, keyed by normalized language tag.
#[derive(Debug, Clone, Default)]
pub struct StaticBundleLoader {
    bundles: HashMap<String, ResourceMap>,
}

impl StaticBundleLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bundle for `language`.
    pub fn with_bundle<K, V>(
        mut self,
        language: &str,
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.bundles.insert(
            normalize_tag(language),
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Languages with a bundle, sorted.
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.bundles.keys().cloned().collect();
        languages.sort();
        languages
    }
}

impl BundleLoader for StaticBundleLoader {
    fn load(&self, language: &str) -> BoxFuture<'_, Result<Option<ResourceMap>, LoadError>> {
        let found = self.bundles.get(language).cloned();
        Box::pin(async move { Ok(found) })
    }
}

/// Bundles stored as `{dir}/{lang}.json`.
#[derive(Debug, Clone)]
pub struct DirectoryBundleLoader {
    dir: PathBuf,
}

impl DirectoryBundleLoader {
    /// Create a loader reading from `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The bundle directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the bundle file for a language.
    pub fn bundle_path(&self, language: &str) -> PathBuf {
        self.dir.join(format!("{}.json", language))
    }

    /// Languages with a bundle file in the directory, sorted.
    pub async fn available_languages(&self) -> Result<Vec<String>, LoadError> {
        let io_err = |source| LoadError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut languages = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                languages.push(normalize_tag(stem));
            }
        }
        languages.sort();
        Ok(languages)
    }
}

impl BundleLoader for DirectoryBundleLoader {
    fn load(&self, language: &str) -> BoxFuture<'_, Result<Option<ResourceMap>, LoadError>> {
        let language = language.to_string();
        Box::pin(async move {
            let path = self.bundle_path(&language);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(source) => return Err(LoadError::Io { path, source }),
            };
            parse_resource_map(&bytes)
                .map(Some)
                .map_err(|e| LoadError::Parse {
                    language,
                    reason: e.to_string(),
                })
        })
    }
}
