//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, and `config path`.

use std::path::Path;

use clap::Subcommand;
use langpack::config::{ConfigFile, ConfigKey};

use super::common::load_config;
use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., network.collection_url)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., cache.backend)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key, config_path),
        ConfigCommands::Set { key, value } => run_set(&key, &value, config_path),
        ConfigCommands::List => run_list(config_path),
        ConfigCommands::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'langpack config list' to see available keys.",
            key
        ))
    })
}

fn run_get(key: &str, config_path: &Path) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = load_config(config_path)?;

    match config_key.get(&config) {
        Some(value) => println!("{}", value),
        None => println!("(not set)"),
    }
    Ok(())
}

fn run_set(key: &str, value: &str, config_path: &Path) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let mut config = load_config(config_path)?;
    set_value(&mut config, config_key, value, config_path)?;

    println!("Set {} = {}", config_key, value);
    Ok(())
}

/// Validate, apply and persist one value.
fn set_value(
    config: &mut ConfigFile,
    key: ConfigKey,
    value: &str,
    config_path: &Path,
) -> Result<(), CliError> {
    key.set(config, value)?;
    config.save_to(config_path)?;
    Ok(())
}

fn run_list(config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";
    for key in ConfigKey::all() {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        match key.get(&config) {
            Some(value) => println!("  {} = {}", key.name(), value),
            None => println!("  {} = (not set)", key.name()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_value_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        let mut config = load_config(&path).unwrap();

        let key = parse_key("cache.backend").unwrap();
        set_value(&mut config, key, "memory", &path).unwrap();

        let reloaded = load_config(&path).unwrap();
        assert_eq!(key.get(&reloaded).as_deref(), Some("memory"));
    }

    #[test]
    fn test_set_value_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        let mut config = ConfigFile::default();

        let key = parse_key("network.max_batch_size").unwrap();
        assert!(set_value(&mut config, key, "zero", &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(parse_key("network.nope"), Err(CliError::Config(_))));
    }
}
