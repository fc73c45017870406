//! Append-only changelog of every catalog mutation, with single-entry undo.
//!
//! Entries are kept newest-first in one JSON file and capped at
//! [`DEFAULT_CAPACITY`]; the oldest entries fall off the end.

use crate::catalog::write_atomic;
use crate::error::{CatalogError, CatalogResult};
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_CAPACITY: usize = 500;

/// Marker used in place of a locale, namespace or key for entries that
/// cover many of them at once (bulk updates, imports, rollbacks).
pub const WILDCARD: &str = "*";

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Add,
    Update,
    Delete,
    BulkUpdate,
    Import,
    Rollback,
    LocaleAdd,
    LocaleRemove,
    LocaleRestore,
    Settings,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Add => "add",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
            ChangeAction::BulkUpdate => "bulk_update",
            ChangeAction::Import => "import",
            ChangeAction::Rollback => "rollback",
            ChangeAction::LocaleAdd => "locale_add",
            ChangeAction::LocaleRemove => "locale_remove",
            ChangeAction::LocaleRestore => "locale_restore",
            ChangeAction::Settings => "settings",
        }
    }
}

/// Where a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeSource {
    Manual,
    Bulk,
    Import,
    Rollback,
    Undo,
    Ai,
    Lifecycle,
}

impl ChangeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeSource::Manual => "manual",
            ChangeSource::Bulk => "bulk",
            ChangeSource::Import => "import",
            ChangeSource::Rollback => "rollback",
            ChangeSource::Undo => "undo",
            ChangeSource::Ai => "ai",
            ChangeSource::Lifecycle => "lifecycle",
        }
    }
}

/// Value recorded on either side of a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeValue {
    /// One value, or a human-readable summary for wildcard entries.
    Text(String),
    /// One value per locale, for changes spanning locales.
    PerLocale(BTreeMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: ChangeAction,
    pub locale: String,
    pub namespace: String,
    pub key: String,
    pub old_value: Option<ChangeValue>,
    pub new_value: Option<ChangeValue>,
    pub author: String,
    pub source: ChangeSource,
}

impl ChangelogEntry {
    pub fn new(
        action: ChangeAction,
        source: ChangeSource,
        locale: impl Into<String>,
        namespace: impl Into<String>,
        key: impl Into<String>,
        author: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action,
            locale: locale.into(),
            namespace: namespace.into(),
            key: key.into(),
            old_value: None,
            new_value: None,
            author: author.into(),
            source,
        }
    }

    pub fn with_values(mut self, old: Option<ChangeValue>, new: Option<ChangeValue>) -> Self {
        self.old_value = old;
        self.new_value = new;
        self
    }

    /// Whether the entry affected `locale`, directly, through a comma
    /// separated locale list, or through a per-locale value map.
    pub fn touches_locale(&self, locale: &str) -> bool {
        if self.locale == locale || self.locale.split(',').any(|l| l.trim() == locale) {
            return true;
        }
        [&self.old_value, &self.new_value].into_iter().any(|v| {
            matches!(v, Some(ChangeValue::PerLocale(map)) if map.contains_key(locale))
        })
    }
}

/// Filters for [`Ledger::query`]. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangelogFilter {
    pub locale: Option<String>,
    pub namespace: Option<String>,
    pub action: Option<ChangeAction>,
    pub source: Option<ChangeSource>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl ChangelogFilter {
    fn matches(&self, entry: &ChangelogEntry) -> bool {
        if let Some(locale) = &self.locale {
            if !entry.touches_locale(locale) {
                return false;
            }
        }
        if let Some(namespace) = &self.namespace {
            if &entry.namespace != namespace {
                return false;
            }
        }
        if self.action.is_some_and(|a| a != entry.action) {
            return false;
        }
        if self.source.is_some_and(|s| s != entry.source) {
            return false;
        }
        true
    }
}

/// Aggregate counts over the whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangelogStats {
    pub total: usize,
    pub by_action: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub by_locale: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangelogPage {
    pub entries: Vec<ChangelogEntry>,
    /// Number of entries matching the filter (across all pages).
    pub matching: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    pub stats: ChangelogStats,
}

pub struct Ledger {
    path: PathBuf,
    capacity: usize,
    lock: Mutex<()>,
}

impl Ledger {
    pub fn open(path: impl Into<PathBuf>) -> CatalogResult<Self> {
        Self::with_capacity(path, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> CatalogResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }
        Ok(Self {
            path,
            capacity: capacity.max(1),
            lock: Mutex::new(()),
        })
    }

    /// Prepend an entry and truncate to capacity.
    pub fn append(&self, entry: ChangelogEntry) -> CatalogResult<ChangelogEntry> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());

        let mut entries = self.read_entries()?;
        entries.insert(0, entry.clone());
        if entries.len() > self.capacity {
            let dropped = entries.len() - self.capacity;
            entries.truncate(self.capacity);
            debug!("Changelog trimmed {} oldest entries", dropped);
        }
        self.write_entries(&entries)?;

        info!(
            "Changelog: {} {}/{}/{} by {} ({})",
            entry.action.as_str(),
            entry.locale,
            entry.namespace,
            entry.key,
            entry.author,
            entry.source.as_str()
        );
        Ok(entry)
    }

    /// All entries, newest first.
    pub fn entries(&self) -> CatalogResult<Vec<ChangelogEntry>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.read_entries()
    }

    pub fn len(&self) -> CatalogResult<usize> {
        Ok(self.entries()?.len())
    }

    pub fn is_empty(&self) -> CatalogResult<bool> {
        Ok(self.len()? == 0)
    }

    pub fn get(&self, id: &str) -> CatalogResult<ChangelogEntry> {
        self.entries()?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| CatalogError::NotFound(format!("changelog entry '{}'", id)))
    }

    pub fn query(&self, filter: &ChangelogFilter) -> CatalogResult<ChangelogPage> {
        let entries = self.entries()?;
        let stats = compute_stats(&entries);

        let matching: Vec<ChangelogEntry> =
            entries.into_iter().filter(|e| filter.matches(e)).collect();

        let per_page = filter
            .per_page
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = filter.page.unwrap_or(1).max(1);
        let total_pages = matching.len().div_ceil(per_page);

        let count = matching.len();
        let entries = matching
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();

        Ok(ChangelogPage {
            entries,
            matching: count,
            page,
            per_page,
            total_pages,
            stats,
        })
    }

    fn read_entries(&self) -> CatalogResult<Vec<ChangelogEntry>> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(Vec::new()),
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| CatalogError::serialization(&self.path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(CatalogError::io(&self.path, e)),
        }
    }

    fn write_entries(&self, entries: &[ChangelogEntry]) -> CatalogResult<()> {
        let bytes = serde_json::to_vec_pretty(entries)
            .map_err(|e| CatalogError::serialization(&self.path, e))?;
        write_atomic(&self.path, &bytes)
    }
}

fn compute_stats(entries: &[ChangelogEntry]) -> ChangelogStats {
    let mut stats = ChangelogStats {
        total: entries.len(),
        ..Default::default()
    };
    for entry in entries {
        *stats
            .by_action
            .entry(entry.action.as_str().to_string())
            .or_default() += 1;
        *stats
            .by_source
            .entry(entry.source.as_str().to_string())
            .or_default() += 1;
        *stats.by_locale.entry(entry.locale.clone()).or_default() += 1;
    }
    stats
}

impl Workspace {
    /// Revert one changelog entry by re-applying its old state.
    ///
    /// The undo is itself recorded as a new `rollback` entry. Entries that
    /// cover many keys (`*`) or carry no old state for a key that existed
    /// before are `Unsupported`.
    pub fn undo_change(&self, entry_id: &str, author: &str) -> CatalogResult<ChangelogEntry> {
        let entry = self.ledger.get(entry_id)?;

        if entry.key == WILDCARD || entry.namespace == WILDCARD {
            return Err(CatalogError::Unsupported(format!(
                "changelog entry '{}' ({}) covers many keys and cannot be undone",
                entry.id,
                entry.action.as_str()
            )));
        }

        let ns = entry.namespace.as_str();
        let key = entry.key.as_str();

        let (old, new) = match (&entry.old_value, &entry.new_value) {
            (Some(ChangeValue::Text(previous)), _) => {
                if entry.locale == WILDCARD || entry.locale.contains(',') {
                    return Err(CatalogError::Unsupported(format!(
                        "changelog entry '{}' has no per-locale old values",
                        entry.id
                    )));
                }
                let replaced = self.store.update(&entry.locale, |catalog| {
                    Ok(catalog.set(ns, key, previous.clone()))
                })?;
                (
                    replaced.map(ChangeValue::Text),
                    Some(ChangeValue::Text(previous.clone())),
                )
            }
            (Some(ChangeValue::PerLocale(previous)), _) => {
                let locales = self.existing_locales(previous.keys())?;
                let replaced = self.store.update_many(&locales, |catalogs| {
                    let mut replaced = BTreeMap::new();
                    for (locale, catalog) in catalogs.iter_mut() {
                        if let Some(value) = previous.get(locale) {
                            if let Some(old) = catalog.set(ns, key, value.clone()) {
                                replaced.insert(locale.clone(), old);
                            }
                        }
                    }
                    Ok(replaced)
                })?;
                let restored: BTreeMap<String, String> = previous
                    .iter()
                    .filter(|(l, _)| locales.contains(l))
                    .map(|(l, v)| (l.clone(), v.clone()))
                    .collect();
                (
                    Some(ChangeValue::PerLocale(replaced)).filter(|v| !is_empty_map(v)),
                    Some(ChangeValue::PerLocale(restored)),
                )
            }
            (None, Some(created)) => {
                let candidates: Vec<String> = match created {
                    ChangeValue::PerLocale(map) => map.keys().cloned().collect(),
                    ChangeValue::Text(_) if entry.locale == WILDCARD => self.store.locales()?,
                    ChangeValue::Text(_) => vec![entry.locale.clone()],
                };
                let locales = self.existing_locales(candidates.iter())?;
                let removed = self.store.update_many(&locales, |catalogs| {
                    let mut removed = BTreeMap::new();
                    for (locale, catalog) in catalogs.iter_mut() {
                        if let Some(old) = catalog.remove(ns, key) {
                            removed.insert(locale.clone(), old);
                        }
                    }
                    Ok(removed)
                })?;
                if removed.is_empty() {
                    return Err(CatalogError::NotFound(format!(
                        "key '{}.{}' no longer exists in any locale",
                        ns, key
                    )));
                }
                (Some(ChangeValue::PerLocale(removed)), None)
            }
            (None, None) => {
                return Err(CatalogError::Unsupported(format!(
                    "changelog entry '{}' has no recoverable old value",
                    entry.id
                )));
            }
        };

        let undo = ChangelogEntry::new(
            ChangeAction::Rollback,
            ChangeSource::Undo,
            entry.locale.clone(),
            ns,
            key,
            author,
        )
        .with_values(old, new);
        info!("Undoing changelog entry {} ({})", entry.id, entry.action.as_str());
        self.ledger.append(undo)
    }

    fn existing_locales<'a>(
        &self,
        candidates: impl Iterator<Item = &'a String>,
    ) -> CatalogResult<Vec<String>> {
        let locales: Vec<String> = candidates.filter(|l| self.store.exists(l)).cloned().collect();
        if locales.is_empty() {
            return Err(CatalogError::NotFound(
                "none of the affected locales exist anymore".to_string(),
            ));
        }
        Ok(locales)
    }
}

fn is_empty_map(value: &ChangeValue) -> bool {
    matches!(value, ChangeValue::PerLocale(map) if map.is_empty())
}
