use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub content_dir: PathBuf,
    pub data_dir: PathBuf,
    pub baseline_locale: String,

    // Consumers (namespace -> UI surface mapping)
    pub consumers_file: Option<PathBuf>,
    pub source_dir: Option<PathBuf>,

    // OpenAI
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_api_url: String,
    pub translation_batch_size: usize,
    pub translation_timeout_secs: u64,
    pub translation_max_tokens: u32,
    pub input_cost_per_mtok: f64,
    pub output_cost_per_mtok: f64,
    pub app_name: String,

    // Server
    pub admin_api_key: Option<String>,
    pub port: u16,
    pub snapshot_schedule: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = match std::env::var("PORT") {
            Ok(value) => value
                .parse()
                .with_context(|| format!("PORT must be a port number, got '{}'", value))?,
            Err(_) => 8080,
        };

        Ok(Self {
            // Storage
            content_dir: std::env::var("CONTENT_DIR")
                .unwrap_or_else(|_| "messages".to_string())
                .into(),
            data_dir: std::env::var("DATA_DIR")
                .unwrap_or_else(|_| "data".to_string())
                .into(),
            baseline_locale: std::env::var("BASELINE_LOCALE").unwrap_or_else(|_| "en".to_string()),

            // Consumers
            consumers_file: non_empty_var("CONSUMERS_FILE").map(PathBuf::from),
            source_dir: non_empty_var("SOURCE_DIR").map(PathBuf::from),

            // OpenAI
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_api_url: std::env::var("OPENAI_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string()),
            translation_batch_size: parsed_var("TRANSLATION_BATCH_SIZE", 25usize).clamp(1, 50),
            translation_timeout_secs: parsed_var("TRANSLATION_TIMEOUT_SECS", 60u64).max(1),
            translation_max_tokens: parsed_var("TRANSLATION_MAX_TOKENS", 4000),
            input_cost_per_mtok: parsed_var("OPENAI_INPUT_COST_PER_MTOK", 0.15),
            output_cost_per_mtok: parsed_var("OPENAI_OUTPUT_COST_PER_MTOK", 0.60),
            app_name: std::env::var("APP_NAME").unwrap_or_else(|_| "the application".to_string()),

            // Server
            admin_api_key: non_empty_var("ADMIN_API_KEY"),
            port,
            snapshot_schedule: std::env::var("SNAPSHOT_SCHEDULE")
                .map(|s| parse_schedule_times(&s))
                .unwrap_or_default(),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse comma-separated schedule times (e.g., "03:00,15:00")
fn parse_schedule_times(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
