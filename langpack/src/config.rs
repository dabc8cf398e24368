//! INI configuration file.
//!
//! The file lives at `{config_dir}/langpack/config.ini`:
//!
//! ```ini
//! [network]
//! collection_url = https://cdn.example.com/overrides
//! batch_endpoint = https://cdn.example.com/batch
//! override_collection = app
//! debounce_ms = 16
//! max_batch_size = 64
//! request_timeout_secs = 10
//! http_timeout_secs = 30
//!
//! [cache]
//! backend = disk
//! directory = ~/.cache/langpack
//! memory_size = 16MB
//! pool_capacity = 512
//! name = langpack-overrides
//!
//! [locale]
//! language = el-GR
//! fallback_language = en-GB
//! packs_dir = /usr/share/myapp/lang
//! ```
//!
//! A missing file yields defaults. Unknown keys are ignored on load.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

use crate::fetch::{
    DEFAULT_DEBOUNCE, DEFAULT_HTTP_TIMEOUT, DEFAULT_MAX_BATCH_SIZE, DEFAULT_POOL_CAPACITY,
    DEFAULT_REQUEST_TIMEOUT,
};

/// Default persistent cache name.
pub const DEFAULT_CACHE_NAME: &str = "langpack-overrides";

/// Default in-memory cache size (16 MB).
pub const DEFAULT_MEMORY_CACHE_SIZE: usize = 16 * 1024 * 1024;

/// Errors from reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("{key} is not configured")]
    Missing { key: String },
}

/// Persistent cache backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// One file per entry under the cache directory.
    Disk,
    /// In-process only; lost on exit.
    Memory,
    /// No persistent cache; the client runs in direct mode.
    None,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Disk => "disk",
            StorageBackend::Memory => "memory",
            StorageBackend::None => "none",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disk" => Ok(StorageBackend::Disk),
            "memory" => Ok(StorageBackend::Memory),
            "none" | "off" => Ok(StorageBackend::None),
            other => Err(format!("expected disk, memory or none, got '{}'", other)),
        }
    }
}

/// `[network]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    pub collection_url: Option<String>,
    pub batch_endpoint: Option<String>,
    pub override_collection: Option<String>,
    pub debounce_ms: u64,
    pub max_batch_size: usize,
    pub request_timeout_secs: u64,
    pub http_timeout_secs: u64,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            collection_url: None,
            batch_endpoint: None,
            override_collection: None,
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT.as_secs(),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub backend: StorageBackend,
    pub directory: PathBuf,
    pub memory_size: usize,
    pub pool_capacity: u64,
    pub name: String,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Disk,
            directory: default_cache_dir(),
            memory_size: DEFAULT_MEMORY_CACHE_SIZE,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            name: DEFAULT_CACHE_NAME.to_string(),
        }
    }
}

/// `[locale]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleSettings {
    pub language: Option<String>,
    pub fallback_language: Option<String>,
    pub packs_dir: Option<PathBuf>,
}

/// The parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub network: NetworkSettings,
    pub cache: CacheSettings,
    pub locale: LocaleSettings,
}

impl ConfigFile {
    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();
        for key in ConfigKey::all() {
            if let Some(value) = ini.get_from(Some(key.section()), key.name()) {
                key.set(&mut config, value)?;
            }
        }
        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories. Unset optional values are
    /// omitted.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            if let Some(value) = key.get(self) {
                ini.with_section(Some(key.section())).set(key.name(), value);
            }
        }
        ini.write_to_file(path).map_err(io_err)
    }
}

/// A settable configuration key, addressed as `section.name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    NetworkCollectionUrl,
    NetworkBatchEndpoint,
    NetworkOverrideCollection,
    NetworkDebounceMs,
    NetworkMaxBatchSize,
    NetworkRequestTimeoutSecs,
    NetworkHttpTimeoutSecs,
    CacheBackend,
    CacheDirectory,
    CacheMemorySize,
    CachePoolCapacity,
    CacheName,
    LocaleLanguage,
    LocaleFallbackLanguage,
    LocalePacksDir,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            NetworkCollectionUrl,
            NetworkBatchEndpoint,
            NetworkOverrideCollection,
            NetworkDebounceMs,
            NetworkMaxBatchSize,
            NetworkRequestTimeoutSecs,
            NetworkHttpTimeoutSecs,
            CacheBackend,
            CacheDirectory,
            CacheMemorySize,
            CachePoolCapacity,
            CacheName,
            LocaleLanguage,
            LocaleFallbackLanguage,
            LocalePacksDir,
        ]
    }

    /// INI section.
    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            NetworkCollectionUrl
            | NetworkBatchEndpoint
            | NetworkOverrideCollection
            | NetworkDebounceMs
            | NetworkMaxBatchSize
            | NetworkRequestTimeoutSecs
            | NetworkHttpTimeoutSecs => "network",
            CacheBackend | CacheDirectory | CacheMemorySize | CachePoolCapacity | CacheName => {
                "cache"
            }
            LocaleLanguage | LocaleFallbackLanguage | LocalePacksDir => "locale",
        }
    }

    /// Key name within its section.
    pub fn name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            NetworkCollectionUrl => "collection_url",
            NetworkBatchEndpoint => "batch_endpoint",
            NetworkOverrideCollection => "override_collection",
            NetworkDebounceMs => "debounce_ms",
            NetworkMaxBatchSize => "max_batch_size",
            NetworkRequestTimeoutSecs => "request_timeout_secs",
            NetworkHttpTimeoutSecs => "http_timeout_secs",
            CacheBackend => "backend",
            CacheDirectory => "directory",
            CacheMemorySize => "memory_size",
            CachePoolCapacity => "pool_capacity",
            CacheName => "name",
            LocaleLanguage => "language",
            LocaleFallbackLanguage => "fallback_language",
            LocalePacksDir => "packs_dir",
        }
    }

    /// Current value, or `None` for an unset optional key.
    pub fn get(&self, config: &ConfigFile) -> Option<String> {
        use ConfigKey::*;
        let net = &config.network;
        let cache = &config.cache;
        let locale = &config.locale;
        match self {
            NetworkCollectionUrl => net.collection_url.clone(),
            NetworkBatchEndpoint => net.batch_endpoint.clone(),
            NetworkOverrideCollection => net.override_collection.clone(),
            NetworkDebounceMs => Some(net.debounce_ms.to_string()),
            NetworkMaxBatchSize => Some(net.max_batch_size.to_string()),
            NetworkRequestTimeoutSecs => Some(net.request_timeout_secs.to_string()),
            NetworkHttpTimeoutSecs => Some(net.http_timeout_secs.to_string()),
            CacheBackend => Some(cache.backend.to_string()),
            CacheDirectory => Some(cache.directory.display().to_string()),
            CacheMemorySize => Some(format_size(cache.memory_size)),
            CachePoolCapacity => Some(cache.pool_capacity.to_string()),
            CacheName => Some(cache.name.clone()),
            LocaleLanguage => locale.language.clone(),
            LocaleFallbackLanguage => locale.fallback_language.clone(),
            LocalePacksDir => locale.packs_dir.as_ref().map(|p| p.display().to_string()),
        }
    }

    /// Validate and store `value`. An empty value clears optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let value = value.trim();
        let optional = || (!value.is_empty()).then(|| value.to_string());

        match self {
            NetworkCollectionUrl => config.network.collection_url = self.url(value)?,
            NetworkBatchEndpoint => config.network.batch_endpoint = self.url(value)?,
            NetworkOverrideCollection => config.network.override_collection = optional(),
            NetworkDebounceMs => config.network.debounce_ms = self.number(value)?,
            NetworkMaxBatchSize => config.network.max_batch_size = self.positive(value)?,
            NetworkRequestTimeoutSecs => {
                config.network.request_timeout_secs = self.positive(value)? as u64
            }
            NetworkHttpTimeoutSecs => {
                config.network.http_timeout_secs = self.positive(value)? as u64
            }
            CacheBackend => {
                config.cache.backend = value.parse().map_err(|reason| self.invalid(value, reason))?
            }
            CacheDirectory => config.cache.directory = expand_tilde(value),
            CacheMemorySize => {
                config.cache.memory_size = parse_size(value)
                    .ok_or_else(|| self.invalid(value, "expected a size like 16MB"))?
            }
            CachePoolCapacity => config.cache.pool_capacity = self.positive(value)? as u64,
            CacheName => {
                if value.is_empty() {
                    return Err(self.invalid(value, "cache name cannot be empty"));
                }
                config.cache.name = value.to_string();
            }
            LocaleLanguage => config.locale.language = optional(),
            LocaleFallbackLanguage => config.locale.fallback_language = optional(),
            LocalePacksDir => config.locale.packs_dir = optional().map(|p| expand_tilde(&p)),
        }
        Ok(())
    }

    fn invalid(&self, value: &str, reason: impl Into<String>) -> ConfigError {
        ConfigError::InvalidValue {
            key: self.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    fn url(&self, value: &str) -> Result<Option<String>, ConfigError> {
        if value.is_empty() {
            return Ok(None);
        }
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            return Err(self.invalid(value, "expected an http(s) URL"));
        }
        Ok(Some(value.trim_end_matches('/').to_string()))
    }

    fn number(&self, value: &str) -> Result<u64, ConfigError> {
        value
            .parse()
            .map_err(|_| self.invalid(value, "expected a non-negative integer"))
    }

    fn positive(&self, value: &str) -> Result<usize, ConfigError> {
        match value.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(self.invalid(value, "expected a positive integer")),
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.to_string() == s.trim())
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

/// The langpack configuration directory.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("langpack")
}

/// The default configuration file path.
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.ini")
}

/// The default persistent cache directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("langpack")
}

fn expand_tilde(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}

/// Parse a byte size: plain bytes or a `KB`/`MB`/`GB` suffix.
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim().to_ascii_uppercase();
    let (digits, multiplier) = if let Some(n) = value.strip_suffix("GB") {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = value.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = value.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = value.strip_suffix('B') {
        (n, 1)
    } else {
        (value.as_str(), 1)
    };
    digits.trim().parse::<usize>().ok()?.checked_mul(multiplier)
}

/// Format a byte size using the largest exact unit.
pub fn format_size(bytes: usize) -> String {
    const UNITS: [(usize, &str); 3] = [
        (1024 * 1024 * 1024, "GB"),
        (1024 * 1024, "MB"),
        (1024, "KB"),
    ];
    for (unit, suffix) in UNITS {
        if bytes >= unit && bytes % unit == 0 {
            return format!("{}{}", bytes / unit, suffix);
        }
    }
    bytes.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.network.debounce_ms, 16);
        assert_eq!(config.network.max_batch_size, 64);
    }

    #[test]
    fn test_load_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(
            &path,
            "[network]\n\
             collection_url = https://cdn.example.com/overrides/\n\
             batch_endpoint = https://cdn.example.com/batch\n\
             debounce_ms = 25\n\
             \n\
             [cache]\n\
             backend = memory\n\
             memory_size = 4MB\n\
             \n\
             [locale]\n\
             language = el-GR\n\
             unknown_key = ignored\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(
            config.network.collection_url.as_deref(),
            Some("https://cdn.example.com/overrides")
        );
        assert_eq!(config.network.debounce_ms, 25);
        assert_eq!(config.cache.backend, StorageBackend::Memory);
        assert_eq!(config.cache.memory_size, 4 * 1024 * 1024);
        assert_eq!(config.locale.language.as_deref(), Some("el-GR"));
        assert_eq!(config.locale.fallback_language, None);
    }

    #[test]
    fn test_invalid_value_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[network]\nmax_batch_size = 0\n").unwrap();

        match ConfigFile::load_from(&path) {
            Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, "network.max_batch_size"),
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        ConfigKey::NetworkOverrideCollection
            .set(&mut config, "app")
            .unwrap();
        ConfigKey::CacheMemorySize.set(&mut config, "2GB").unwrap();
        config.save_to(&path).unwrap();

        let reloaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(
            ConfigKey::CacheMemorySize.get(&reloaded).as_deref(),
            Some("2GB")
        );
    }

    #[test]
    fn test_key_parse_and_display() {
        let key: ConfigKey = "cache.backend".parse().unwrap();
        assert_eq!(key, ConfigKey::CacheBackend);
        assert_eq!(key.to_string(), "cache.backend");
        assert!(matches!(
            "cache.colour".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_url_validation_and_clearing() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::NetworkBatchEndpoint
            .set(&mut config, "ftp://nope")
            .is_err());

        ConfigKey::NetworkBatchEndpoint
            .set(&mut config, "https://cdn/batch")
            .unwrap();
        assert!(config.network.batch_endpoint.is_some());

        ConfigKey::NetworkBatchEndpoint.set(&mut config, "").unwrap();
        assert!(config.network.batch_endpoint.is_none());
    }

    #[test]
    fn test_sizes() {
        assert_eq!(parse_size("512"), Some(512));
        assert_eq!(parse_size("16mb"), Some(16 * 1024 * 1024));
        assert_eq!(parse_size("1 KB"), Some(1024));
        assert_eq!(parse_size("lots"), None);
        assert_eq!(format_size(16 * 1024 * 1024), "16MB");
        assert_eq!(format_size(1500), "1500");
    }
}
