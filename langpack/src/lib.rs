//! Langpack - localization resource resolution for UI components
//!
//! This library resolves which language a component should render in and
//! produces the merged resource map for it: shipped default bundles with
//! locale-specific override bundles layered on top. Override bundles are
//! fetched over the network through a request pool, a debounced batch
//! coalescer and a persistent resource cache.
//!
//! # Architecture
//!
//! ```text
//! Localizer ──► LocalizationClient ──► LanguageResolver
//!                                          │
//!                       ┌──────────────────┴──────────────────┐
//!                       ▼                                     ▼
//!                BundleLoader                           ResourcePool
//!              (shipped defaults)                (one future per resource)
//!                                                             │
//!                                       ┌─────────────────────┴───────┐
//!                                       ▼                             ▼
//!                               RequestCoalescer                 direct GET
//!                          (debounce, ResourceCache)        (no batch endpoint)
//!                                       │
//!                                       ▼
//!                                 BatchFetcher
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use langpack::{ClientConfig, LocalizationClient, ResourceQuery, StaticBundleLoader};
//! use langpack::cache::MemoryCacheStorage;
//! use langpack::fetch::ReqwestClient;
//!
//! let config = ClientConfig::new("https://cdn.example.com/overrides")
//!     .with_batch_endpoint("https://cdn.example.com/batch")
//!     .with_override_collection("app");
//! let client = LocalizationClient::start(
//!     config,
//!     Arc::new(ReqwestClient::new()?),
//!     Some(Arc::new(MemoryCacheStorage::new(16 * 1024 * 1024, None))),
//! )
//! .await;
//!
//! let query = ResourceQuery::new(Arc::new(StaticBundleLoader::new()))
//!     .with_supported_languages(["en", "fr"]);
//! let candidates = langpack::resolve::candidate_languages("fr-FR", Some("en-GB"));
//! let bundle = client.get_localize_resources(&query, &candidates).await;
//! ```

pub mod bundle;
pub mod cache;
pub mod client;
pub mod config;
pub mod fetch;
pub mod format;
pub mod localizer;
pub mod logging;
pub mod resolve;

pub use bundle::{ResolvedResourceBundle, ResourceMap};
pub use client::{ClientConfig, FetchModeKind, LocalizationClient};
pub use format::{format_message, Params, Value};
pub use localizer::{DocumentLocaleSettings, LocalizationProvider, Localizer};
pub use resolve::{BundleLoader, DirectoryBundleLoader, ResourceQuery, StaticBundleLoader};
