//! Translate preview binary - proposes translations for the keys a locale is
//! missing and prints them without writing anything
//!
//! Usage:
//!   cargo run --bin translate-preview -- es
//!   cargo run --bin translate-preview -- es Greeting Nav   # only these namespaces
//!
//! Required environment variables:
//! - OPENAI_API_KEY
//!
//! Optional:
//! - CONTENT_DIR, DATA_DIR, BASELINE_LOCALE
//! - OPENAI_MODEL (defaults to gpt-4o-mini)
//! - TRANSLATION_BATCH_SIZE (defaults to 25)

use anyhow::{bail, Context, Result};
use catalog_admin::config::Config;
use catalog_admin::translation::TranslationMetrics;
use catalog_admin::workspace::Workspace;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("catalog_admin=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(locale) = args.next() else {
        bail!("Usage: translate-preview <locale> [namespace...]");
    };
    let namespaces: Vec<String> = args.collect();

    let config = Config::from_env()?;
    if config.openai_api_key.is_none() {
        bail!("OPENAI_API_KEY not set");
    }
    let workspace = Workspace::from_config(&config)?;

    info!("Proposing missing {} translations", locale);
    let run = workspace
        .translate_missing(
            &locale,
            (!namespaces.is_empty()).then_some(namespaces.as_slice()),
        )
        .await
        .with_context(|| format!("Failed to translate missing keys for {}", locale))?;

    println!("{}", serde_json::to_string_pretty(&run)?);

    info!(
        "{} proposals, {} unresolved, {} failed batches, {} tokens (~${:.4})",
        run.proposals.len(),
        run.unresolved.len(),
        run.failures.len(),
        run.usage.total_tokens,
        run.usage.estimated_cost_usd
    );
    let metrics = TranslationMetrics::global().report();
    info!(
        "Model calls: {} ({} failed, {} timed out)",
        metrics.api_calls, metrics.api_failures, metrics.timeouts
    );
    Ok(())
}
