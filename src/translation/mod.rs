//! Batch translation pipeline.
//!
//! Baseline strings are chunked into batches and sent to the external model
//! one batch at a time per target locale (locales run concurrently). The
//! numbered-list answer is parsed leniently; whatever could not be recovered
//! is reported back as unresolved. Nothing here writes a catalog: proposals
//! go back to the caller, who commits them with
//! [`Workspace::commit_translations`].

pub mod client;
pub mod metrics;
pub mod parser;
pub mod style;

pub use client::{ModelClient, TokenUsage};
pub use metrics::{MetricsReport, TranslationMetrics};
pub use parser::{parse_numbered_list, ParseError, ParsedList};

use crate::catalog::{Catalog, LocaleCode};
use crate::config::Config;
use crate::error::{CatalogError, CatalogResult};
use crate::ledger::ChangeSource;
use crate::mutation::{BulkItem, BulkOutcome};
use crate::quality::{check_pair, Severity};
use crate::workspace::Workspace;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// One baseline string to translate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub namespace: String,
    pub key: String,
    pub text: String,
}

/// A model-generated value awaiting review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedTranslation {
    pub namespace: String,
    pub key: String,
    pub locale: String,
    pub source: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchFailure {
    /// Zero-based batch number within the run
    pub batch: usize,
    pub keys: usize,
    pub message: String,
}

/// Aggregate token usage with an estimated cost.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct UsageReport {
    pub calls: usize,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub estimated_cost_usd: f64,
}

impl UsageReport {
    fn add(&mut self, usage: TokenUsage, pricing: Pricing) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens = self.prompt_tokens + self.completion_tokens;
        self.estimated_cost_usd = pricing.cost(self.prompt_tokens, self.completion_tokens);
    }

    pub fn merge(&mut self, other: &UsageReport) {
        self.calls += other.calls;
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens = self.prompt_tokens + self.completion_tokens;
        self.estimated_cost_usd += other.estimated_cost_usd;
    }
}

/// Result of translating a set of entries into one locale.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationRun {
    pub locale: String,
    pub proposals: Vec<ProposedTranslation>,
    /// Entries with no usable answer; re-run to retry them.
    pub unresolved: Vec<SourceEntry>,
    pub failures: Vec<BatchFailure>,
    pub usage: UsageReport,
}

/// Answer for a single key.
#[derive(Debug, Clone, Serialize)]
pub struct KeyTranslation {
    pub proposal: ProposedTranslation,
    pub usage: UsageReport,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pricing {
    input_per_mtok: f64,
    output_per_mtok: f64,
}

impl Pricing {
    fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        (prompt_tokens as f64 * self.input_per_mtok
            + completion_tokens as f64 * self.output_per_mtok)
            / 1_000_000.0
    }
}

pub const DEFAULT_BATCH_SIZE: usize = 25;
pub const MAX_BATCH_SIZE: usize = 50;

pub struct Translator {
    client: ModelClient,
    batch_size: usize,
    app_name: String,
    pricing: Pricing,
}

impl Translator {
    pub fn new(client: ModelClient) -> Self {
        Self {
            client,
            batch_size: DEFAULT_BATCH_SIZE,
            app_name: "the application".to_string(),
            pricing: Pricing {
                input_per_mtok: 0.15,
                output_per_mtok: 0.60,
            },
        }
    }

    /// Build a translator from the environment config, if an API key is set.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_key = config.openai_api_key.as_ref()?;
        let client = ModelClient::new(
            config.openai_api_url.clone(),
            api_key.clone(),
            config.openai_model.clone(),
            config.translation_max_tokens,
            Duration::from_secs(config.translation_timeout_secs),
        );
        Some(
            Self::new(client)
                .with_batch_size(config.translation_batch_size)
                .with_app_name(config.app_name.clone())
                .with_pricing(config.input_cost_per_mtok, config.output_cost_per_mtok),
        )
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_pricing(mut self, input_per_mtok: f64, output_per_mtok: f64) -> Self {
        self.pricing = Pricing {
            input_per_mtok,
            output_per_mtok,
        };
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Translate `entries` into `target`, one batch after another.
    ///
    /// A failed or timed-out batch contributes zero proposals; its entries
    /// are listed as unresolved and the run carries on with the next batch.
    pub async fn translate_entries(
        &self,
        source_locale: &str,
        target: &str,
        entries: &[SourceEntry],
    ) -> TranslationRun {
        let mut run = TranslationRun {
            locale: target.to_string(),
            proposals: Vec::new(),
            unresolved: Vec::new(),
            failures: Vec::new(),
            usage: UsageReport::default(),
        };
        if entries.is_empty() {
            return run;
        }

        let system = build_system_prompt(&self.app_name, source_locale, target);
        let metrics = TranslationMetrics::global();
        let batches = entries.chunks(self.batch_size).count();
        info!(
            "Translating {} strings into {} ({} batches of up to {})",
            entries.len(),
            target,
            batches,
            self.batch_size
        );

        for (index, batch) in entries.chunks(self.batch_size).enumerate() {
            let user = build_user_prompt(target, batch);
            metrics.record_api_call(batch.len());
            run.usage.calls += 1;

            let completion = match self.client.complete(&system, &user).await {
                Ok(completion) => completion,
                Err(e) => {
                    warn!("Batch {}/{} for {} failed: {}", index + 1, batches, target, e);
                    run.failures.push(BatchFailure {
                        batch: index,
                        keys: batch.len(),
                        message: e.to_string(),
                    });
                    run.unresolved.extend(batch.iter().cloned());
                    continue;
                }
            };
            run.usage.add(completion.usage, self.pricing);

            match parse_numbered_list(&completion.content, batch.len()) {
                Ok(parsed) => {
                    metrics.record_parse(parsed.items.len(), parsed.dropped_lines);
                    if !parsed.missing.is_empty() || parsed.dropped_lines > 0 {
                        warn!(
                            "Batch {}/{} for {}: {} of {} lines recovered, {} dropped",
                            index + 1,
                            batches,
                            target,
                            parsed.items.len(),
                            batch.len(),
                            parsed.dropped_lines
                        );
                    }
                    for (position, value) in parsed.items {
                        let entry = &batch[position];
                        let findings = check_pair(&entry.text, &value);
                        if findings.iter().any(|f| f.check.severity() == Severity::Error) {
                            warn!(
                                "Proposed {} value for {}.{} has problems: {:?}",
                                target, entry.namespace, entry.key, findings
                            );
                        }
                        run.proposals.push(ProposedTranslation {
                            namespace: entry.namespace.clone(),
                            key: entry.key.clone(),
                            locale: target.to_string(),
                            source: entry.text.clone(),
                            value,
                        });
                    }
                    run.unresolved
                        .extend(parsed.missing.iter().map(|&i| batch[i].clone()));
                }
                Err(e) => {
                    metrics.record_parse(0, lines_in(&completion.content));
                    warn!("Batch {}/{} for {}: {}", index + 1, batches, target, e);
                    run.failures.push(BatchFailure {
                        batch: index,
                        keys: batch.len(),
                        message: e.to_string(),
                    });
                    run.unresolved.extend(batch.iter().cloned());
                }
            }
        }

        info!(
            "Translation into {} done: {} proposed, {} unresolved, {} tokens (~${:.4})",
            target,
            run.proposals.len(),
            run.unresolved.len(),
            run.usage.total_tokens,
            run.usage.estimated_cost_usd
        );
        run
    }

    /// Run [`Translator::translate_entries`] for several locales concurrently.
    pub async fn translate_many(
        &self,
        source_locale: &str,
        targets: &[String],
        entries: &[SourceEntry],
    ) -> Vec<TranslationRun> {
        join_all(
            targets
                .iter()
                .map(|target| self.translate_entries(source_locale, target, entries)),
        )
        .await
    }
}

fn lines_in(text: &str) -> usize {
    text.lines().filter(|l| !l.trim().is_empty()).count()
}

fn display_name(code: &str) -> String {
    match style::language_name(code) {
        Some(name) => format!("{} ({})", name, code),
        None => code.to_string(),
    }
}

/// Build the system prompt for one target locale
fn build_system_prompt(app_name: &str, source_locale: &str, target: &str) -> String {
    format!(
        r#"You are a professional software localizer translating the user interface of {app} from {source} to {target}.

## Rules

### Keep exactly as written:
- Placeholders in curly braces (e.g., {{name}}, {{count}})
- ICU message syntax: keep the argument name and the keywords (plural, select, selectordinal, one, few, many, other, =0) and translate only the text inside each case
- HTML and rich-text tags (e.g., <b>, </b>, <link>) and their order
- Brand and product names
- The two-character sequence \n, which marks a line break

### Style:
{style}
Keep translations about as long as the source; they must fit the same UI space.

### Output format:
Answer with exactly one line per input string, numbered like the input: "<n>. <translation>".
Do not add explanations, quotes or blank lines."#,
        app = app_name,
        source = display_name(source_locale),
        target = display_name(target),
        style = style::style_instruction(target),
    )
}

/// Build the user prompt: one numbered, single-line string per entry
fn build_user_prompt(target: &str, batch: &[SourceEntry]) -> String {
    let mut prompt = format!(
        "Translate these {} strings to {}:\n\n",
        batch.len(),
        display_name(target)
    );
    for (i, entry) in batch.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, parser::escape_line(&entry.text)));
    }
    prompt
}

/// Non-empty baseline leaves, optionally limited to some namespaces.
pub(crate) fn source_entries(baseline: &Catalog, namespaces: Option<&[String]>) -> Vec<SourceEntry> {
    baseline
        .entries()
        .into_iter()
        .filter(|e| !e.value.is_empty())
        .filter(|e| namespaces.map_or(true, |list| list.contains(&e.namespace)))
        .map(|e| SourceEntry {
            namespace: e.namespace,
            key: e.key,
            text: e.value,
        })
        .collect()
}

impl Workspace {
    pub(crate) fn translator(&self) -> CatalogResult<&Translator> {
        self.translator.as_ref().ok_or_else(|| {
            CatalogError::InvalidArgument("translation is not configured".to_string())
        })
    }

    /// Reject the baseline and unknown locales as translation targets.
    fn check_target(&self, target: &str, baseline: &str) -> CatalogResult<()> {
        LocaleCode::parse(target)?;
        if target == baseline {
            return Err(CatalogError::InvalidArgument(format!(
                "'{}' is the baseline locale and is not a translation target",
                target
            )));
        }
        if !self.store.exists(target) {
            return Err(CatalogError::NotFound(format!("locale '{}'", target)));
        }
        Ok(())
    }

    /// Propose a translation of one baseline key.
    pub async fn translate_key(
        &self,
        namespace: &str,
        key: &str,
        target: &str,
    ) -> CatalogResult<KeyTranslation> {
        let translator = self.translator()?;
        let baseline = self.baseline()?;
        self.check_target(target, &baseline)?;

        let catalog = self.store.load(&baseline)?;
        let text = catalog.get(namespace, key).ok_or_else(|| {
            CatalogError::NotFound(format!("key '{}.{}' in {}", namespace, key, baseline))
        })?;
        if text.is_empty() {
            return Err(CatalogError::InvalidArgument(format!(
                "baseline value of '{}.{}' is empty",
                namespace, key
            )));
        }

        let entry = SourceEntry {
            namespace: namespace.to_string(),
            key: key.to_string(),
            text: text.to_string(),
        };
        let mut run = translator
            .translate_entries(&baseline, target, std::slice::from_ref(&entry))
            .await;

        match run.proposals.pop() {
            Some(proposal) => Ok(KeyTranslation {
                proposal,
                usage: run.usage,
            }),
            None => Err(CatalogError::ExternalService(
                run.failures
                    .pop()
                    .map(|f| f.message)
                    .unwrap_or_else(|| "model returned no usable translation".to_string()),
            )),
        }
    }

    /// Propose translations for every baseline key that is absent or empty
    /// in `target`.
    pub async fn translate_missing(
        &self,
        target: &str,
        namespaces: Option<&[String]>,
    ) -> CatalogResult<TranslationRun> {
        let translator = self.translator()?;
        let baseline = self.baseline()?;
        self.check_target(target, &baseline)?;

        let source = self.store.load(&baseline)?;
        let current = self.store.load(target)?;
        let missing: Vec<SourceEntry> = source_entries(&source, namespaces)
            .into_iter()
            .filter(|e| current.get(&e.namespace, &e.key).map_or(true, str::is_empty))
            .collect();

        info!("{} keys missing in {}", missing.len(), target);
        Ok(translator.translate_entries(&baseline, target, &missing).await)
    }

    /// Propose translations for every baseline key of one namespace, for
    /// each target, regardless of what the targets already hold.
    pub async fn translate_namespace(
        &self,
        namespace: &str,
        targets: &[String],
    ) -> CatalogResult<Vec<TranslationRun>> {
        let translator = self.translator()?;
        let baseline = self.baseline()?;
        if targets.is_empty() {
            return Err(CatalogError::InvalidArgument(
                "at least one target locale is required".to_string(),
            ));
        }
        for target in targets {
            self.check_target(target, &baseline)?;
        }

        let source = self.store.load(&baseline)?;
        if !source.has_namespace(namespace) {
            return Err(CatalogError::NotFound(format!(
                "namespace '{}' in {}",
                namespace, baseline
            )));
        }
        let wanted = [namespace.to_string()];
        let entries = source_entries(&source, Some(&wanted[..]));
        Ok(translator.translate_many(&baseline, targets, &entries).await)
    }

    /// Write reviewed proposals into `locale` through the bulk update path.
    pub fn commit_translations(
        &self,
        locale: &str,
        proposals: &[ProposedTranslation],
        author: &str,
    ) -> CatalogResult<BulkOutcome> {
        if let Some(other) = proposals.iter().find(|p| p.locale != locale) {
            return Err(CatalogError::InvalidArgument(format!(
                "proposal for '{}.{}' targets '{}', not '{}'",
                other.namespace, other.key, other.locale, locale
            )));
        }
        let items: Vec<BulkItem> = proposals
            .iter()
            .map(|p| BulkItem {
                namespace: p.namespace.clone(),
                key: p.key.clone(),
                value: p.value.clone(),
            })
            .collect();
        self.bulk_update_from(locale, &items, author, ChangeSource::Ai)
    }
}
