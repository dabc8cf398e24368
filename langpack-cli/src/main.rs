//! Langpack CLI - Command-line interface
//!
//! Resolves locales against a directory of shipped bundles and the
//! configured override collection, formats messages, and manages the
//! on-disk override cache and config file.

mod commands;
mod error;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use langpack::config::config_file_path;
use langpack::logging::{init_logging, LogConfig};
use tracing::debug;

use commands::cache::CacheAction;
use commands::config::ConfigCommands;
use commands::format::FormatArgs;
use commands::resolve::ResolveArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "langpack")]
#[command(version, about = "Resolve and format localization bundles", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Resolve a locale into a merged resource bundle
    Resolve(ResolveArgs),

    /// Format a message from the resolved bundle or an inline template
    Format(FormatArgs),

    /// Manage the override cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn,langpack=info",
        1 => "langpack=debug",
        _ => "langpack=trace",
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut log_config = LogConfig::default().with_level(log_level(cli.verbose));
    if let Some(path) = &cli.log_file {
        log_config = log_config.with_log_file(path);
    }
    let _guard = init_logging(&log_config)?;

    let config_path = cli.config.unwrap_or_else(config_file_path);
    debug!(config = %config_path.display(), "Starting");

    match cli.command {
        Commands::Resolve(args) => commands::resolve::run(args, &config_path).await,
        Commands::Format(args) => commands::format::run(args, &config_path).await,
        Commands::Cache { action } => commands::cache::run(action, &config_path),
        Commands::Config { command } => commands::config::run(command, &config_path),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_format_args() {
        let cli = Cli::try_parse_from([
            "langpack", "format", "files", "--lang", "fr-FR", "--param", "n=2", "--offline",
        ])
        .unwrap();

        match cli.command {
            Commands::Format(args) => {
                assert_eq!(args.key.as_deref(), Some("files"));
                assert_eq!(args.locale.lang.as_deref(), Some("fr-FR"));
                assert_eq!(args.params.len(), 1);
                assert!(args.locale.offline);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_format_requires_key_or_template() {
        assert!(Cli::try_parse_from(["langpack", "format", "--lang", "en"]).is_err());
        assert!(Cli::try_parse_from(["langpack", "format", "-t", "{n}", "--lang", "en"]).is_ok());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0), "warn,langpack=info");
        assert_eq!(log_level(3), "langpack=trace");
    }
}
