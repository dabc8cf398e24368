//! Cache management CLI commands.

use std::path::Path;

use clap::Subcommand;
use langpack::cache::{clear_disk_cache, disk_cache_stats};
use langpack::config::{format_size, StorageBackend};

use super::common::load_config;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Clear the disk cache, removing all cached override responses
    Clear,
    /// Show disk cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction, config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let cache_dir = &config.cache.directory;

    if config.cache.backend != StorageBackend::Disk {
        println!(
            "Note: cache.backend is '{}'; showing the disk cache anyway",
            config.cache.backend
        );
    }

    match action {
        CacheAction::Clear => {
            println!("Clearing disk cache at: {}", cache_dir.display());

            match clear_disk_cache(cache_dir) {
                Ok(result) => {
                    println!(
                        "Deleted {} files, freed {}",
                        result.files_deleted,
                        format_size(result.bytes_freed as usize)
                    );
                    Ok(())
                }
                Err(e) => Err(CliError::CacheClear(e.to_string())),
            }
        }
        CacheAction::Stats => {
            println!("Disk cache: {}", cache_dir.display());

            match disk_cache_stats(cache_dir) {
                Ok((files, bytes)) => {
                    println!("  Files: {}", files);
                    println!("  Size:  {}", format_size(bytes as usize));
                    Ok(())
                }
                Err(e) => Err(CliError::CacheStats(e.to_string())),
            }
        }
    }
}
