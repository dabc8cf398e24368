//! CLI error type.

use std::fmt;
use std::io;

use langpack::config::ConfigError;
use langpack::fetch::FetchError;
use langpack::logging::LoggingError;
use langpack::resolve::LoadError;

/// Errors surfaced to the user by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded, saved or interpreted.
    Config(String),
    /// Logging could not be set up.
    Logging(LoggingError),
    /// Bundles could not be listed or read.
    Load(LoadError),
    /// No language could be resolved.
    Unresolved(Vec<String>),
    /// A message could not be produced.
    Format(String),
    /// HTTP client setup failed.
    Http(FetchError),
    /// Clearing the disk cache failed.
    CacheClear(String),
    /// Reading disk cache statistics failed.
    CacheStats(String),
    /// Runtime or output failure.
    Io(io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Load(e) => write!(f, "Failed to load bundles: {}", e),
            CliError::Unresolved(candidates) => write!(
                f,
                "No bundle found for any of: {}",
                candidates.join(", ")
            ),
            CliError::Format(msg) => write!(f, "Format error: {}", msg),
            CliError::Http(e) => write!(f, "HTTP client error: {}", e),
            CliError::CacheClear(msg) => write!(f, "Failed to clear cache: {}", msg),
            CliError::CacheStats(msg) => write!(f, "Failed to read cache statistics: {}", msg),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Logging(e) => Some(e),
            CliError::Load(e) => Some(e),
            CliError::Http(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<LoadError> for CliError {
    fn from(e: LoadError) -> Self {
        CliError::Load(e)
    }
}

impl From<FetchError> for CliError {
    fn from(e: FetchError) -> Self {
        CliError::Http(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = CliError::Unresolved(vec!["de-de".into(), "de".into()]);
        assert_eq!(err.to_string(), "No bundle found for any of: de-de, de");

        let err: CliError = ConfigError::UnknownKey("network.nope".into()).into();
        assert!(err.to_string().contains("network.nope"));
    }
}
