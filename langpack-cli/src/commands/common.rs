//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use langpack::cache::{CacheStorage, DiskCacheStorage, MemoryCacheStorage};
use langpack::config::{ConfigFile, StorageBackend};
use langpack::fetch::ReqwestClient;
use langpack::format::Value;
use langpack::resolve::{DirectoryBundleLoader, ResourceQuery};
use langpack::{ClientConfig, DocumentLocaleSettings, LocalizationClient};
use tracing::{debug, info};

use crate::error::CliError;

/// Locale and bundle arguments shared by `resolve` and `format`.
#[derive(Debug, Clone, Args)]
pub struct LocaleArgs {
    /// Primary language tag (e.g. fr-FR). Defaults to locale.language
    #[arg(short, long)]
    pub lang: Option<String>,

    /// Fallback language tag. Defaults to locale.fallback_language
    #[arg(short, long)]
    pub fallback: Option<String>,

    /// Directory of shipped `{lang}.json` bundles. Defaults to locale.packs_dir
    #[arg(short, long)]
    pub packs: Option<PathBuf>,

    /// Override collection. Defaults to network.override_collection
    #[arg(long)]
    pub collection: Option<String>,

    /// Skip overrides and use shipped bundles only
    #[arg(long)]
    pub offline: bool,
}

/// Load the config file at `path`.
pub fn load_config(path: &Path) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(path)?)
}

/// Resolve the primary and fallback language: CLI first, then config.
pub fn resolve_locale(
    args: &LocaleArgs,
    config: &ConfigFile,
) -> Result<(String, Option<String>), CliError> {
    let language = args
        .lang
        .clone()
        .or_else(|| config.locale.language.clone())
        .ok_or_else(|| {
            CliError::Config(
                "No language specified. Use --lang or set locale.language in config.ini."
                    .to_string(),
            )
        })?;
    let fallback = args
        .fallback
        .clone()
        .or_else(|| config.locale.fallback_language.clone());
    Ok((language, fallback))
}

/// Resolve the bundle directory: CLI first, then config.
pub fn resolve_packs_dir(args: &LocaleArgs, config: &ConfigFile) -> Result<PathBuf, CliError> {
    args.packs
        .clone()
        .or_else(|| config.locale.packs_dir.clone())
        .ok_or_else(|| {
            CliError::Config(
                "No bundle directory specified. Use --packs or set locale.packs_dir in config.ini."
                    .to_string(),
            )
        })
}

/// Build the persistent cache storage selected by `cache.backend`.
pub fn build_storage(config: &ConfigFile) -> Option<Arc<dyn CacheStorage>> {
    match config.cache.backend {
        StorageBackend::Disk => Some(Arc::new(DiskCacheStorage::new(&config.cache.directory))),
        StorageBackend::Memory => Some(Arc::new(MemoryCacheStorage::new(
            config.cache.memory_size as u64,
            None,
        ))),
        StorageBackend::None => None,
    }
}

/// Build the client configuration.
///
/// Offline runs, or runs with no collection URL configured, never request
/// overrides.
pub fn client_config(args: &LocaleArgs, config: &ConfigFile) -> Result<ClientConfig, CliError> {
    if args.offline || config.network.collection_url.is_none() {
        return Ok(ClientConfig::new(String::new()));
    }
    let mut client_config = ClientConfig::from_config_file(config)?;
    if let Some(collection) = &args.collection {
        client_config = client_config.with_override_collection(collection.clone());
    }
    Ok(client_config)
}

/// Start a client for a command run.
pub async fn start_client(
    args: &LocaleArgs,
    config: &ConfigFile,
) -> Result<Arc<LocalizationClient>, CliError> {
    let client_config = client_config(args, config)?;
    let http = ReqwestClient::with_timeout(Duration::from_secs(
        config.network.http_timeout_secs,
    ))?;
    let storage = build_storage(config);

    let client = LocalizationClient::start(client_config, Arc::new(http), storage).await;
    info!(mode = ?client.mode(), "Client ready");
    Ok(Arc::new(client))
}

/// Build the query for a bundle directory, restricted to the languages it
/// ships.
pub async fn build_query(packs_dir: &Path) -> Result<ResourceQuery, CliError> {
    let loader = DirectoryBundleLoader::new(packs_dir);
    let languages = loader.available_languages().await?;
    debug!(dir = %packs_dir.display(), languages = ?languages, "Found shipped bundles");
    Ok(ResourceQuery::new(Arc::new(loader)).with_supported_languages(languages))
}

/// Document locale settings for a command run.
pub fn locale_settings(language: String, fallback: Option<String>) -> DocumentLocaleSettings {
    let settings = DocumentLocaleSettings::new(language);
    match fallback {
        Some(fallback) => settings.with_fallback_language(fallback),
        None => settings,
    }
}

/// Parse a `name=value` message parameter. Values that parse as numbers
/// are passed as numbers.
pub fn parse_param(s: &str) -> Result<(String, Value), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", s));
    }
    let value = match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Value::Num(n),
        _ => Value::Str(value.to_string()),
    };
    Ok((name.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> LocaleArgs {
        LocaleArgs {
            lang: None,
            fallback: None,
            packs: None,
            collection: None,
            offline: false,
        }
    }

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("count=3").unwrap(),
            ("count".to_string(), Value::Num(3.0))
        );
        assert_eq!(
            parse_param("name=Ada=Lovelace").unwrap(),
            ("name".to_string(), Value::Str("Ada=Lovelace".to_string()))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=3").is_err());
    }

    #[test]
    fn test_resolve_locale_prefers_cli() {
        let mut config = ConfigFile::default();
        config.locale.language = Some("de-DE".to_string());
        config.locale.fallback_language = Some("fr".to_string());

        let (lang, fallback) = resolve_locale(&args(), &config).unwrap();
        assert_eq!(lang, "de-DE");
        assert_eq!(fallback.as_deref(), Some("fr"));

        let mut cli = args();
        cli.lang = Some("el-GR".to_string());
        let (lang, _) = resolve_locale(&cli, &config).unwrap();
        assert_eq!(lang, "el-GR");

        assert!(matches!(
            resolve_locale(&args(), &ConfigFile::default()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_client_config_offline() {
        let mut config = ConfigFile::default();
        config.network.collection_url = Some("https://cdn/overrides".to_string());
        config.network.override_collection = Some("app".to_string());

        let online = client_config(&args(), &config).unwrap();
        assert_eq!(online.override_collection.as_deref(), Some("app"));

        let mut cli = args();
        cli.offline = true;
        let offline = client_config(&cli, &config).unwrap();
        assert!(offline.override_collection.is_none());
        assert!(offline.batch_endpoint.is_none());
    }

    #[test]
    fn test_build_storage() {
        let mut config = ConfigFile::default();
        config.cache.backend = StorageBackend::Memory;
        assert_eq!(build_storage(&config).map(|s| s.kind()), Some("memory"));

        config.cache.backend = StorageBackend::None;
        assert!(build_storage(&config).is_none());
    }
}
