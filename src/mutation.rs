//! Key-level edits: add, update, delete and bulk update.
//!
//! Every successful call writes through the catalog store and appends
//! exactly one changelog entry. The baseline locale is only ever written by
//! `add_key`; translations of it go through `update_key`/`bulk_update`.

use crate::catalog::tree::is_valid_path;
use crate::catalog::{Catalog, LocaleCode};
use crate::error::{CatalogError, CatalogResult};
use crate::ledger::{ChangeAction, ChangeSource, ChangeValue, ChangelogEntry, WILDCARD};
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

pub const MAX_BULK_UPDATES: usize = 200;

/// Keys listed by name in a bulk summary before it is truncated.
const SUMMARY_KEYS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItem {
    pub namespace: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkItemError {
    /// Position of the item in the request
    pub index: usize,
    pub namespace: String,
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub locale: String,
    pub applied: usize,
    pub unchanged: usize,
    pub errors: Vec<BulkItemError>,
    /// Absent when nothing was written
    pub entry: Option<ChangelogEntry>,
}

pub(crate) fn validate_namespace(namespace: &str) -> CatalogResult<()> {
    if namespace.trim().is_empty() || namespace.contains('.') || namespace == WILDCARD {
        return Err(CatalogError::InvalidArgument(format!(
            "invalid namespace '{}'",
            namespace
        )));
    }
    Ok(())
}

pub(crate) fn validate_key(key: &str) -> CatalogResult<()> {
    if !is_valid_path(key) || key == WILDCARD {
        return Err(CatalogError::InvalidArgument(format!("invalid key '{}'", key)));
    }
    Ok(())
}

/// A dot-path prefix of `key` that is already a leaf would be turned into a
/// group by writing `key`.
pub(crate) fn blocking_leaf(catalog: &Catalog, namespace: &str, key: &str) -> Option<String> {
    let segments: Vec<&str> = key.split('.').collect();
    (1..segments.len())
        .map(|n| segments[..n].join("."))
        .find(|prefix| catalog.get(namespace, prefix).is_some())
}

pub(crate) fn is_group(catalog: &Catalog, namespace: &str, key: &str) -> bool {
    catalog.contains(namespace, key) && catalog.get(namespace, key).is_none()
}

/// Short human-readable description of many keys, for wildcard entries.
fn summarize(count: usize, keys: &[String]) -> String {
    let listed: Vec<&str> = keys.iter().take(SUMMARY_KEYS).map(String::as_str).collect();
    let mut text = format!("{} values: {}", count, listed.join(", "));
    if keys.len() > SUMMARY_KEYS {
        text.push_str(&format!(" (+{} more)", keys.len() - SUMMARY_KEYS));
    }
    text
}

impl Workspace {
    pub(crate) fn reject_baseline(&self, locale: &str) -> CatalogResult<String> {
        LocaleCode::parse(locale)?;
        let baseline = self.baseline()?;
        if locale == baseline {
            return Err(CatalogError::InvalidArgument(format!(
                "'{}' is the baseline locale; edit it by adding or deleting keys",
                locale
            )));
        }
        Ok(baseline)
    }

    /// Add a key to every locale. The baseline value is required; locales
    /// without a provided value get an empty string.
    pub fn add_key(
        &self,
        namespace: &str,
        key: &str,
        values: &BTreeMap<String, String>,
        author: &str,
    ) -> CatalogResult<ChangelogEntry> {
        validate_namespace(namespace)?;
        validate_key(key)?;

        let baseline = self.baseline()?;
        if !values.contains_key(&baseline) {
            return Err(CatalogError::InvalidArgument(format!(
                "a value for the baseline locale '{}' is required",
                baseline
            )));
        }
        let locales = self.store.locales()?;
        if let Some(unknown) = values.keys().find(|l| !locales.contains(l)) {
            return Err(CatalogError::InvalidArgument(format!(
                "unknown locale '{}'",
                unknown
            )));
        }

        let written = self.store.update_many(&locales, |catalogs| {
            let base = catalogs
                .get(&baseline)
                .ok_or_else(|| CatalogError::NotFound(format!("baseline locale '{}'", baseline)))?;
            if base.contains(namespace, key) {
                return Err(CatalogError::Conflict(format!(
                    "key '{}.{}' already exists",
                    namespace, key
                )));
            }
            if let Some(leaf) = blocking_leaf(base, namespace, key) {
                return Err(CatalogError::Conflict(format!(
                    "'{}.{}' is a value, so '{}' cannot be nested under it",
                    namespace, leaf, key
                )));
            }

            let mut written = BTreeMap::new();
            for (locale, catalog) in catalogs.iter_mut() {
                let value = match values.get(locale) {
                    Some(value) => value.clone(),
                    // Keep an orphaned value already sitting at this path.
                    None => catalog.get(namespace, key).unwrap_or_default().to_string(),
                };
                catalog.set(namespace, key, value.clone());
                written.insert(locale.clone(), value);
            }
            Ok(written)
        })?;

        info!("Added key {}.{} to {} locales", namespace, key, written.len());
        self.ledger.append(
            ChangelogEntry::new(
                ChangeAction::Add,
                ChangeSource::Manual,
                WILDCARD,
                namespace,
                key,
                author,
            )
            .with_values(None, Some(ChangeValue::PerLocale(written))),
        )
    }

    /// Set one non-baseline value. The namespace must already exist there.
    pub fn update_key(
        &self,
        locale: &str,
        namespace: &str,
        key: &str,
        value: &str,
        author: &str,
    ) -> CatalogResult<ChangelogEntry> {
        validate_namespace(namespace)?;
        validate_key(key)?;
        self.reject_baseline(locale)?;

        let old = self.store.update(locale, |catalog| {
            if !catalog.has_namespace(namespace) {
                return Err(CatalogError::NotFound(format!(
                    "namespace '{}' in {}",
                    namespace, locale
                )));
            }
            if is_group(catalog, namespace, key) {
                return Err(CatalogError::InvalidArgument(format!(
                    "'{}.{}' is a group of keys, not a value",
                    namespace, key
                )));
            }
            if let Some(prefix) = blocking_leaf(catalog, namespace, key) {
                return Err(CatalogError::InvalidArgument(format!(
                    "'{}.{}' would nest under the existing value '{}.{}'",
                    namespace, key, namespace, prefix
                )));
            }
            Ok(catalog.set(namespace, key, value))
        })?;

        self.ledger.append(
            ChangelogEntry::new(
                ChangeAction::Update,
                ChangeSource::Manual,
                locale,
                namespace,
                key,
                author,
            )
            .with_values(
                old.map(ChangeValue::Text),
                Some(ChangeValue::Text(value.to_string())),
            ),
        )
    }

    /// Remove a key from every locale that has it.
    pub fn delete_key(&self, namespace: &str, key: &str, author: &str) -> CatalogResult<ChangelogEntry> {
        validate_namespace(namespace)?;
        validate_key(key)?;

        let locales = self.store.locales()?;
        let removed = self.store.update_many(&locales, |catalogs| {
            let mut removed = BTreeMap::new();
            for (locale, catalog) in catalogs.iter_mut() {
                if let Some(old) = catalog.remove(namespace, key) {
                    removed.insert(locale.clone(), old);
                }
            }
            if removed.is_empty() {
                return Err(CatalogError::NotFound(format!(
                    "key '{}.{}' in any locale",
                    namespace, key
                )));
            }
            Ok(removed)
        })?;

        info!("Deleted key {}.{} from {} locales", namespace, key, removed.len());
        self.ledger.append(
            ChangelogEntry::new(
                ChangeAction::Delete,
                ChangeSource::Manual,
                WILDCARD,
                namespace,
                key,
                author,
            )
            .with_values(Some(ChangeValue::PerLocale(removed)), None),
        )
    }

    /// Apply up to [`MAX_BULK_UPDATES`] values to one non-baseline locale.
    ///
    /// Items that cannot be applied are reported per item; the rest are
    /// written together and summarized in one changelog entry.
    pub fn bulk_update(&self, locale: &str, items: &[BulkItem], author: &str) -> CatalogResult<BulkOutcome> {
        self.bulk_update_from(locale, items, author, ChangeSource::Bulk)
    }

    pub(crate) fn bulk_update_from(
        &self,
        locale: &str,
        items: &[BulkItem],
        author: &str,
        source: ChangeSource,
    ) -> CatalogResult<BulkOutcome> {
        self.reject_baseline(locale)?;
        if items.is_empty() {
            return Err(CatalogError::InvalidArgument("no updates given".to_string()));
        }
        if items.len() > MAX_BULK_UPDATES {
            return Err(CatalogError::InvalidArgument(format!(
                "{} updates given, at most {} are allowed per call",
                items.len(),
                MAX_BULK_UPDATES
            )));
        }

        let (changed, unchanged, errors) = self.store.update(locale, |catalog| {
            let mut changed = Vec::new();
            let mut unchanged = 0;
            let mut errors = Vec::new();

            for (index, item) in items.iter().enumerate() {
                let problem = if validate_key(&item.key).is_err() {
                    Some("invalid key".to_string())
                } else if !catalog.has_namespace(&item.namespace) {
                    Some(format!("namespace '{}' not found", item.namespace))
                } else if is_group(catalog, &item.namespace, &item.key) {
                    Some("path is a group of keys, not a value".to_string())
                } else if let Some(prefix) = blocking_leaf(catalog, &item.namespace, &item.key) {
                    Some(format!("path is nested under the existing value '{}'", prefix))
                } else {
                    None
                };
                if let Some(message) = problem {
                    errors.push(BulkItemError {
                        index,
                        namespace: item.namespace.clone(),
                        key: item.key.clone(),
                        message,
                    });
                    continue;
                }

                match catalog.set(&item.namespace, &item.key, item.value.clone()) {
                    Some(old) if old == item.value => unchanged += 1,
                    _ => changed.push(format!("{}.{}", item.namespace, item.key)),
                }
            }
            Ok((changed, unchanged, errors))
        })?;

        if !errors.is_empty() {
            warn!("Bulk update of {}: {} items rejected", locale, errors.len());
        }

        let entry = if changed.is_empty() {
            None
        } else {
            let namespace = match items.first() {
                Some(first) if items.iter().all(|i| i.namespace == first.namespace) => {
                    first.namespace.clone()
                }
                _ => WILDCARD.to_string(),
            };
            let entry = ChangelogEntry::new(
                ChangeAction::BulkUpdate,
                source,
                locale,
                namespace,
                WILDCARD,
                author,
            )
            .with_values(None, Some(ChangeValue::Text(summarize(changed.len(), &changed))));
            Some(self.ledger.append(entry)?)
        };

        info!(
            "Bulk update of {}: {} applied, {} unchanged, {} rejected",
            locale,
            changed.len(),
            unchanged,
            errors.len()
        );
        Ok(BulkOutcome {
            locale: locale.to_string(),
            applied: changed.len(),
            unchanged,
            errors,
            entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (Workspace, TempDir) {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("messages");
        fs::create_dir_all(&content).unwrap();
        fs::write(
            content.join("en.json"),
            r#"{"Greeting": {"hello": "Hello, {name}!"}, "Nav": {"home": "Home"}}"#,
        )
        .unwrap();
        fs::write(content.join("es.json"), r#"{"Greeting": {"hello": "Hola, {name}!"}}"#).unwrap();
        fs::write(content.join("fr.json"), r#"{"Greeting": {}}"#).unwrap();
        let ws = Workspace::open(&content, dir.path().join("data"), "en").unwrap();
        (ws, dir)
    }

    fn values(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(l, v)| (l.to_string(), v.to_string()))
            .collect()
    }

    fn item(namespace: &str, key: &str, value: &str) -> BulkItem {
        BulkItem {
            namespace: namespace.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    // ==================== Add ====================

    #[test]
    fn test_add_key_fills_every_locale() {
        let (ws, _dir) = setup();
        let entry = ws
            .add_key("Greeting", "bye", &values(&[("en", "Bye"), ("es", "Adiós")]), "ana")
            .unwrap();

        assert_eq!(ws.store.load("en").unwrap().get("Greeting", "bye"), Some("Bye"));
        assert_eq!(ws.store.load("es").unwrap().get("Greeting", "bye"), Some("Adiós"));
        assert_eq!(ws.store.load("fr").unwrap().get("Greeting", "bye"), Some(""));

        assert_eq!(entry.action, ChangeAction::Add);
        assert_eq!(entry.locale, WILDCARD);
        assert!(matches!(entry.new_value, Some(ChangeValue::PerLocale(ref m)) if m.len() == 3));
        assert_eq!(ws.ledger.len().unwrap(), 1);
    }

    #[test]
    fn test_add_key_creates_namespace_everywhere() {
        let (ws, _dir) = setup();
        ws.add_key("Footer", "copy", &values(&[("en", "© Acme")]), "ana").unwrap();
        assert!(ws.store.load("es").unwrap().has_namespace("Footer"));
        assert!(ws.store.load("fr").unwrap().has_namespace("Footer"));
    }

    #[test]
    fn test_add_existing_key_conflicts() {
        let (ws, _dir) = setup();
        ws.add_key("Greeting", "bye", &values(&[("en", "Bye")]), "ana").unwrap();
        let again = ws.add_key("Greeting", "bye", &values(&[("en", "Bye")]), "ana");
        assert!(matches!(again, Err(CatalogError::Conflict(_))));
        assert_eq!(ws.ledger.len().unwrap(), 1);
    }

    #[test]
    fn test_add_under_existing_leaf_conflicts() {
        let (ws, _dir) = setup();
        let result = ws.add_key("Nav", "home.icon", &values(&[("en", "house")]), "ana");
        assert!(matches!(result, Err(CatalogError::Conflict(_))));
    }

    #[test]
    fn test_add_requires_baseline_value_and_known_locales() {
        let (ws, _dir) = setup();
        assert!(matches!(
            ws.add_key("Greeting", "bye", &values(&[("es", "Adiós")]), "ana"),
            Err(CatalogError::InvalidArgument(_))
        ));
        assert!(matches!(
            ws.add_key("Greeting", "bye", &values(&[("en", "Bye"), ("xx", "?")]), "ana"),
            Err(CatalogError::InvalidArgument(_))
        ));
        assert!(matches!(
            ws.add_key("Greeting", "a..b", &values(&[("en", "Bye")]), "ana"),
            Err(CatalogError::InvalidArgument(_))
        ));
    }

    // ==================== Update ====================

    #[test]
    fn test_update_records_old_and_new() {
        let (ws, _dir) = setup();
        let entry = ws
            .update_key("es", "Greeting", "hello", "¡Hola, {name}!", "ana")
            .unwrap();
        assert_eq!(entry.old_value, Some(ChangeValue::Text("Hola, {name}!".to_string())));
        assert_eq!(entry.new_value, Some(ChangeValue::Text("¡Hola, {name}!".to_string())));
        assert_eq!(
            ws.store.load("es").unwrap().get("Greeting", "hello"),
            Some("¡Hola, {name}!")
        );
    }

    #[test]
    fn test_update_baseline_is_invalid() {
        let (ws, _dir) = setup();
        assert!(matches!(
            ws.update_key("en", "Greeting", "hello", "Hi", "ana"),
            Err(CatalogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_update_unknown_namespace_or_locale() {
        let (ws, _dir) = setup();
        assert!(matches!(
            ws.update_key("fr", "Nav", "home", "Accueil", "ana"),
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            ws.update_key("de", "Greeting", "hello", "Hallo", "ana"),
            Err(CatalogError::NotFound(_))
        ));
        assert!(ws.ledger.is_empty().unwrap());
    }

    #[test]
    fn test_update_rejects_path_like_locale() {
        let (ws, _dir) = setup();
        let snapshot = ws.create_snapshot(Some("es")).unwrap().remove(0);
        let stem = snapshot.filename.trim_end_matches(".json");

        for locale in ["../x".to_string(), format!("../data/versions/{}", stem)] {
            assert!(matches!(
                ws.update_key(&locale, "Greeting", "hello", "changed", "ana"),
                Err(CatalogError::InvalidArgument(_))
            ));
            assert!(matches!(
                ws.bulk_update(&locale, &[item("Greeting", "hello", "changed")], "ana"),
                Err(CatalogError::InvalidArgument(_))
            ));
        }

        let (_, stored) = ws.snapshots.read(&snapshot.filename).unwrap();
        assert_eq!(stored.get("Greeting", "hello"), Some("Hola, {name}!"));
        assert!(ws.ledger.is_empty().unwrap());
    }

    #[test]
    fn test_update_under_existing_value_is_rejected() {
        let (ws, _dir) = setup();
        assert!(matches!(
            ws.update_key("es", "Greeting", "hello.icon", "casa", "ana"),
            Err(CatalogError::InvalidArgument(_))
        ));
        assert_eq!(
            ws.store.load("es").unwrap().get("Greeting", "hello"),
            Some("Hola, {name}!")
        );
        assert!(ws.ledger.is_empty().unwrap());
    }

    // ==================== Delete ====================

    #[test]
    fn test_delete_removes_from_every_locale() {
        let (ws, _dir) = setup();
        let entry = ws.delete_key("Greeting", "hello", "ana").unwrap();

        assert!(ws.store.load("en").unwrap().get("Greeting", "hello").is_none());
        assert!(ws.store.load("es").unwrap().get("Greeting", "hello").is_none());
        let Some(ChangeValue::PerLocale(old)) = entry.old_value else {
            panic!("expected per-locale old values");
        };
        assert_eq!(old.len(), 2);
        assert_eq!(old["es"], "Hola, {name}!");
    }

    #[test]
    fn test_delete_missing_key_is_not_found() {
        let (ws, _dir) = setup();
        assert!(matches!(
            ws.delete_key("Greeting", "nope", "ana"),
            Err(CatalogError::NotFound(_))
        ));
    }

    // ==================== Bulk ====================

    #[test]
    fn test_bulk_update_partial_success() {
        let (ws, _dir) = setup();
        let outcome = ws
            .bulk_update(
                "es",
                &[
                    item("Greeting", "hello", "Hola, {name}!"),
                    item("Greeting", "bye", "Adiós"),
                    item("Nav", "home", "Inicio"),
                ],
                "ana",
            )
            .unwrap();

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.unchanged, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].index, 2);
        let entry = outcome.entry.unwrap();
        assert_eq!(entry.action, ChangeAction::BulkUpdate);
        assert_eq!(entry.namespace, WILDCARD);
        assert_eq!(entry.key, WILDCARD);
        assert_eq!(ws.store.load("es").unwrap().get("Greeting", "bye"), Some("Adiós"));
    }

    #[test]
    fn test_bulk_item_under_existing_value_is_reported() {
        let (ws, _dir) = setup();
        let outcome = ws
            .bulk_update(
                "es",
                &[item("Greeting", "hello.icon", "casa"), item("Greeting", "bye", "Adiós")],
                "ana",
            )
            .unwrap();

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].index, 0);
        assert_eq!(
            ws.store.load("es").unwrap().get("Greeting", "hello"),
            Some("Hola, {name}!")
        );
    }

    #[test]
    fn test_bulk_update_with_nothing_applied_logs_nothing() {
        let (ws, _dir) = setup();
        let outcome = ws
            .bulk_update("es", &[item("Nav", "home", "Inicio")], "ana")
            .unwrap();
        assert_eq!(outcome.applied, 0);
        assert!(outcome.entry.is_none());
        assert!(ws.ledger.is_empty().unwrap());
    }

    #[test]
    fn test_bulk_update_limits() {
        let (ws, _dir) = setup();
        let too_many: Vec<BulkItem> = (0..=MAX_BULK_UPDATES)
            .map(|i| item("Greeting", &format!("k{}", i), "x"))
            .collect();
        assert!(matches!(
            ws.bulk_update("es", &too_many, "ana"),
            Err(CatalogError::InvalidArgument(_))
        ));
        assert!(matches!(
            ws.bulk_update("en", &[item("Greeting", "hello", "Hi")], "ana"),
            Err(CatalogError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_summary_truncates_key_list() {
        let keys: Vec<String> = (0..12).map(|i| format!("A.k{}", i)).collect();
        let text = summarize(12, &keys);
        assert!(text.starts_with("12 values: A.k0, A.k1"));
        assert!(text.ends_with("(+2 more)"));
    }
}
