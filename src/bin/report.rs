//! Report binary - prints coverage and quality summaries as JSON
//!
//! Usage:
//!   cargo run --bin report                 # Summaries only
//!   cargo run --bin report -- --full       # Full coverage and quality reports
//!
//! Optional environment variables:
//! - CONTENT_DIR (defaults to messages)
//! - DATA_DIR (defaults to data)
//! - BASELINE_LOCALE (defaults to en)
//! - CONSUMERS_FILE / SOURCE_DIR (namespace consumers)

use anyhow::{Context, Result};
use catalog_admin::config::Config;
use catalog_admin::quality::QualityFilter;
use catalog_admin::workspace::Workspace;
use serde_json::json;
use tracing::info;

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("catalog_admin=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let full = std::env::args().any(|a| a == "--full");
    let config = Config::from_env()?;
    let workspace = Workspace::from_config(&config)?;

    info!("Building coverage and quality reports");
    let coverage = workspace
        .coverage_report()
        .context("Failed to build coverage report")?;
    let quality = workspace
        .quality_scan(&QualityFilter::default())
        .context("Failed to run quality scan")?;

    let output = if full {
        json!({ "coverage": coverage, "quality": quality })
    } else {
        json!({
            "baseline": coverage.baseline,
            "coverage": coverage.summary,
            "locales": coverage.locales.iter().map(|l| json!({
                "locale": l.locale,
                "completion": l.completion,
                "missing": l.missing_count,
            })).collect::<Vec<_>>(),
            "quality": quality.summary,
        })
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
