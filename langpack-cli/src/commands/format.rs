//! Format command - render one message with parameters.

use std::path::Path;
use std::sync::Arc;

use clap::Args;
use langpack::format::{format_message, Params, Value};
use langpack::{LocalizationProvider, Localizer};

use super::common::{
    build_query, load_config, locale_settings, parse_param, resolve_locale, resolve_packs_dir,
    start_client, LocaleArgs,
};
use crate::error::CliError;

/// Arguments for the format command.
#[derive(Debug, Args)]
pub struct FormatArgs {
    /// Message key to look up in the resolved bundle
    #[arg(required_unless_present = "template", conflicts_with = "template")]
    pub key: Option<String>,

    /// Format this template directly instead of looking up a key
    #[arg(short, long)]
    pub template: Option<String>,

    /// Message parameter as name=value (repeatable)
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, Value)>,

    /// Check the output against the HTML tag allow-list
    #[arg(long)]
    pub html: bool,

    #[command(flatten)]
    pub locale: LocaleArgs,
}

/// Run the format command.
pub async fn run(args: FormatArgs, config_path: &Path) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let (language, fallback) = resolve_locale(&args.locale, &config)?;
    let params: Params = args.params.into_iter().collect();

    if let Some(template) = &args.template {
        let text = format_message(template, &language, &params)
            .map_err(|e| CliError::Format(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    let key = args
        .key
        .ok_or_else(|| CliError::Format("a message key or --template is required".to_string()))?;
    let packs_dir = resolve_packs_dir(&args.locale, &config)?;
    let query = build_query(&packs_dir).await?;
    let client = start_client(&args.locale, &config).await?;
    let settings = Arc::new(locale_settings(language, fallback));
    let localizer = Localizer::new(Arc::clone(&client), Arc::clone(&settings), query);

    let resolved = localizer.resolve().await;
    client.shutdown().await;
    if resolved.is_none() {
        return Err(CliError::Unresolved(settings.candidates()));
    }

    let bundle_has_key = localizer
        .bundle()
        .map(|b| b.get(&key).is_some())
        .unwrap_or(false);
    if !bundle_has_key {
        return Err(CliError::Format(format!("no message named '{}'", key)));
    }

    let text = if args.html {
        localizer
            .localize_html(&key, &params)
            .map_err(|e| CliError::Format(e.to_string()))?
    } else {
        localizer.localize(&key, &params)
    };
    println!("{}", text);
    Ok(())
}
