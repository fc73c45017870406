//! Adding, archiving, restoring and configuring locales.
//!
//! Locale files are never deleted: removal moves the catalog into the
//! archive directory as `{code}_{timestamp}.json`, and restore moves it back.

use crate::catalog::{Catalog, LocaleCode};
use crate::error::{CatalogError, CatalogResult};
use crate::ledger::{ChangeAction, ChangeSource, ChangeValue, ChangelogEntry, WILDCARD};
use crate::settings::LocaleConfig;
use crate::snapshot::{parse_filename, timestamp_label};
use crate::translation::style::language_name;
use crate::translation::{source_entries, UsageReport};
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};

/// How a new locale's catalog is filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeedStrategy {
    /// Every baseline key, with an empty value
    #[default]
    CloneEmpty,
    /// Every baseline key, translated by the model where it answers
    AiSeed,
    /// No keys yet; filled later by an import
    ImportLater,
}

impl SeedStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeedStrategy::CloneEmpty => "clone-empty",
            SeedStrategy::AiSeed => "ai-seed",
            SeedStrategy::ImportLater => "import-later",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLocale {
    pub code: String,
    pub label: Option<String>,
    #[serde(default)]
    pub strategy: SeedStrategy,
    /// New locales stay hidden from end users unless this is set
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddedLocale {
    pub locale: LocaleConfig,
    pub keys: usize,
    /// Keys filled by the model (ai-seed only)
    pub seeded: usize,
    pub unresolved: usize,
    pub usage: Option<UsageReport>,
    pub entry: ChangelogEntry,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchivedLocale {
    pub file: String,
    pub locale: String,
    pub archived_at: DateTime<Utc>,
    pub size: u64,
}

fn default_label(code: &str) -> String {
    language_name(code).unwrap_or(code).to_string()
}

impl Workspace {
    pub fn list_locales(&self) -> CatalogResult<Vec<LocaleConfig>> {
        Ok(self.settings.load()?.locales)
    }

    /// Create a catalog for a new locale and register it in the settings.
    pub async fn add_locale(&self, request: &NewLocale, author: &str) -> CatalogResult<AddedLocale> {
        let code = LocaleCode::parse(request.code.trim())?;
        let code = code.as_str();
        if self.store.exists(code) || self.settings.load()?.get_by_code(code).is_some() {
            return Err(CatalogError::Conflict(format!("locale '{}' already exists", code)));
        }
        let label = request
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_label(code));

        let baseline = self.baseline()?;
        let base = self.store.load(&baseline)?;
        let mut seeded = 0;
        let mut unresolved = 0;
        let mut usage = None;

        let catalog = match request.strategy {
            SeedStrategy::ImportLater => Catalog::new(),
            SeedStrategy::CloneEmpty => base.empty_mirror(),
            SeedStrategy::AiSeed => {
                let translator = self.translator()?;
                let mut catalog = base.empty_mirror();
                let entries = source_entries(&base, None);
                let run = translator.translate_entries(&baseline, code, &entries).await;
                for proposal in &run.proposals {
                    catalog.set(&proposal.namespace, &proposal.key, proposal.value.clone());
                }
                seeded = run.proposals.len();
                unresolved = run.unresolved.len();
                usage = Some(run.usage);
                if !run.failures.is_empty() {
                    warn!(
                        "Seeding {}: {} batches failed, {} keys left empty",
                        code,
                        run.failures.len(),
                        unresolved
                    );
                }
                catalog
            }
        };

        self.store.create(code, &catalog)?;
        let config = LocaleConfig {
            enabled: request.enabled,
            ..LocaleConfig::new(code, label.clone())
        };
        if let Err(e) = self.settings.update(|s| s.add(config.clone())) {
            if let Ok(path) = self.store.path_for(code) {
                if let Err(remove) = fs::remove_file(&path) {
                    warn!("Could not remove {} after failed registration: {}", path.display(), remove);
                }
            }
            return Err(e);
        }

        let keys = catalog.leaf_count();
        let entry = self.ledger.append(
            ChangelogEntry::new(
                ChangeAction::LocaleAdd,
                ChangeSource::Lifecycle,
                code,
                WILDCARD,
                WILDCARD,
                author,
            )
            .with_values(
                None,
                Some(ChangeValue::Text(format!(
                    "{} ({}): {} keys, {} seeded",
                    label,
                    request.strategy.as_str(),
                    keys,
                    seeded
                ))),
            ),
        )?;

        info!(
            "Added locale {} ({}) with {} keys via {}",
            code,
            label,
            keys,
            request.strategy.as_str()
        );
        Ok(AddedLocale {
            locale: config,
            keys,
            seeded,
            unresolved,
            usage,
            entry,
        })
    }

    /// Archive a locale. `confirmation` must repeat its code or its label.
    pub fn remove_locale(
        &self,
        code: &str,
        confirmation: Option<&str>,
        author: &str,
    ) -> CatalogResult<ArchivedLocale> {
        let settings = self.settings.load()?;
        let config = settings
            .get_by_code(code)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("locale '{}'", code)))?;
        if config.is_default {
            return Err(CatalogError::Unsupported(format!(
                "'{}' is the default locale; choose another default first",
                code
            )));
        }
        match confirmation.map(str::trim) {
            Some(echo) if echo == config.code || echo == config.label => {}
            _ => {
                return Err(CatalogError::InvalidArgument(format!(
                    "removing '{}' requires confirming its code or its name '{}'",
                    code, config.label
                )))
            }
        }

        let archived_at = Utc::now();
        let file = format!("{}_{}.json", code, timestamp_label(archived_at));
        let path = self.store.archive(code, &self.archive_dir, &file)?;
        self.settings.update(|s| s.remove(code))?;

        self.ledger.append(
            ChangelogEntry::new(
                ChangeAction::LocaleRemove,
                ChangeSource::Lifecycle,
                code,
                WILDCARD,
                WILDCARD,
                author,
            )
            .with_values(
                Some(ChangeValue::Text(config.label.clone())),
                Some(ChangeValue::Text(format!("archived as {}", file))),
            ),
        )?;

        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Ok(ArchivedLocale {
            file,
            locale: code.to_string(),
            archived_at,
            size,
        })
    }

    /// Archived locale files, newest first.
    pub fn list_archived(&self) -> CatalogResult<Vec<ArchivedLocale>> {
        let entries = match fs::read_dir(&self.archive_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CatalogError::io(&self.archive_dir, e)),
        };

        let mut archived = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CatalogError::io(&self.archive_dir, e))?;
            let file = entry.file_name().to_string_lossy().to_string();
            let Ok((locale, archived_at)) = parse_filename(&file) else {
                continue;
            };
            if !file.ends_with(".json") {
                continue;
            }
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            archived.push(ArchivedLocale {
                file,
                locale,
                archived_at,
                size,
            });
        }
        archived.sort_by(|a, b| b.archived_at.cmp(&a.archived_at));
        Ok(archived)
    }

    /// Move an archived catalog back into the content directory. The
    /// restored locale starts disabled.
    pub fn restore_locale(&self, file: &str, author: &str) -> CatalogResult<LocaleConfig> {
        let (code, _) = parse_filename(file)?;
        let path = self.archive_dir.join(file);
        if !path.is_file() {
            return Err(CatalogError::NotFound(format!("archived locale '{}'", file)));
        }
        if self.settings.load()?.get_by_code(&code).is_some() {
            return Err(CatalogError::Conflict(format!("locale '{}' already exists", code)));
        }

        self.store.restore(&code, &path)?;
        let config = LocaleConfig {
            enabled: false,
            ..LocaleConfig::new(code.clone(), default_label(&code))
        };
        self.settings.update(|s| s.add(config.clone()))?;

        self.ledger.append(
            ChangelogEntry::new(
                ChangeAction::LocaleRestore,
                ChangeSource::Lifecycle,
                code.clone(),
                WILDCARD,
                WILDCARD,
                author,
            )
            .with_values(
                Some(ChangeValue::Text(format!("archived as {}", file))),
                Some(ChangeValue::Text(config.label.clone())),
            ),
        )?;
        info!("Restored locale {} from {}", code, file);
        Ok(config)
    }

    /// Make `code` the default (baseline) locale. It is enabled as well.
    pub fn set_default_locale(&self, code: &str, author: &str) -> CatalogResult<LocaleConfig> {
        LocaleCode::parse(code)?;
        if !self.store.exists(code) {
            return Err(CatalogError::NotFound(format!("locale '{}'", code)));
        }
        let previous = self.settings.update(|s| {
            let previous = s.default_locale().map(|l| l.code.clone()).ok();
            s.set_default(code)?;
            Ok(previous)
        })?;

        self.log_setting(code, author, previous, format!("default locale {}", code))?;
        info!("Default locale is now {}", code);
        self.locale_config(code)
    }

    pub fn set_locale_enabled(&self, code: &str, enabled: bool, author: &str) -> CatalogResult<LocaleConfig> {
        LocaleCode::parse(code)?;
        let was = self.settings.update(|s| {
            let was = s.get_by_code(code).map(|l| l.enabled);
            s.set_enabled(code, enabled)?;
            Ok(was)
        })?;

        let describe = |on: bool| if on { "enabled" } else { "disabled" }.to_string();
        self.log_setting(code, author, was.map(describe), describe(enabled))?;
        self.locale_config(code)
    }

    fn log_setting(
        &self,
        code: &str,
        author: &str,
        old: Option<String>,
        new: String,
    ) -> CatalogResult<ChangelogEntry> {
        self.ledger.append(
            ChangelogEntry::new(
                ChangeAction::Settings,
                ChangeSource::Lifecycle,
                code,
                WILDCARD,
                WILDCARD,
                author,
            )
            .with_values(old.map(ChangeValue::Text), Some(ChangeValue::Text(new))),
        )
    }

    fn locale_config(&self, code: &str) -> CatalogResult<LocaleConfig> {
        self.settings
            .load()?
            .get_by_code(code)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(format!("locale '{}'", code)))
    }
}
