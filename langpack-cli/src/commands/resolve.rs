//! Resolve command - resolve a locale into a merged resource bundle.

use std::path::Path;

use clap::Args;
use langpack::resolve::candidate_languages;

use super::common::{
    build_query, load_config, resolve_locale, resolve_packs_dir, start_client, LocaleArgs,
};
use crate::error::CliError;

/// Arguments for the resolve command.
#[derive(Debug, Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub locale: LocaleArgs,

    /// Print the merged bundle as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the resolve command.
pub async fn run(args: ResolveArgs, config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let (language, fallback) = resolve_locale(&args.locale, &config)?;
    let packs_dir = resolve_packs_dir(&args.locale, &config)?;

    let candidates = candidate_languages(&language, fallback.as_deref());
    let query = build_query(&packs_dir).await?;
    let client = start_client(&args.locale, &config).await?;

    let bundle = client.get_localize_resources(&query, &candidates).await;
    client.shutdown().await;

    let bundle = bundle.ok_or(CliError::Unresolved(candidates.clone()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&bundle.resources)
            .map_err(|e| CliError::Format(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    println!("Candidates: {}", candidates.join(", "));
    println!("Resolved:   {}", bundle.language);
    println!("Messages:   {}", bundle.resources.len());
    println!();
    for (key, template) in &bundle.resources {
        println!("  {} = {}", key, template);
    }
    Ok(())
}
