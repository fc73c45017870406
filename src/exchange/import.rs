use super::{csv, resolve_locale, KEY_HEADER, NAMESPACE_HEADER};
use crate::catalog::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::ledger::{ChangeAction, ChangeSource, ChangeValue, ChangelogEntry, WILDCARD};
use crate::mutation::{blocking_leaf, is_group, validate_key, validate_namespace};
use crate::snapshot::SnapshotInfo;
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportFormat {
    Json,
    Csv,
}

impl ImportFormat {
    pub fn parse(value: &str) -> CatalogResult<Self> {
        match value.to_ascii_lowercase().as_str() {
            "json" => Ok(ImportFormat::Json),
            "csv" => Ok(ImportFormat::Csv),
            other => Err(CatalogError::InvalidArgument(format!(
                "unknown import format '{}' (expected json or csv)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Added,
    Updated,
    Unchanged,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRow {
    pub namespace: String,
    pub key: String,
    pub locale: String,
    pub value: String,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub added: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
}

impl ImportSummary {
    fn of(rows: &[ImportRow]) -> Self {
        let mut summary = ImportSummary::default();
        for row in rows {
            match row.status {
                RowStatus::Added => summary.added += 1,
                RowStatus::Updated => summary.updated += 1,
                RowStatus::Unchanged => summary.unchanged += 1,
                RowStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub preview: bool,
    pub summary: ImportSummary,
    pub rows: Vec<ImportRow>,
    /// Snapshots taken before the write
    pub snapshots: Vec<SnapshotInfo>,
    pub entry: Option<ChangelogEntry>,
}

/// A value read from the input, before it is compared with the catalogs.
#[derive(Debug, Clone)]
struct Candidate {
    namespace: String,
    key: String,
    locale: String,
    value: String,
}

/// Namespace -> key -> locale -> value, as produced by the JSON export.
fn parse_json(content: &str) -> CatalogResult<Vec<Candidate>> {
    let document: BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>> =
        serde_json::from_str(content).map_err(|e| {
            CatalogError::InvalidArgument(format!(
                "import JSON must map namespace -> key -> locale -> string: {}",
                e
            ))
        })?;

    let mut candidates = Vec::new();
    for (namespace, keys) in document {
        for (key, values) in keys {
            for (locale, value) in values {
                candidates.push(Candidate {
                    namespace: namespace.clone(),
                    key: key.clone(),
                    locale,
                    value,
                });
            }
        }
    }
    Ok(candidates)
}

/// `Namespace,Key,<LOCALE>...` with one row per key.
fn parse_csv(content: &str, known: &[String]) -> CatalogResult<Vec<Candidate>> {
    let rows = csv::parse(content)?;
    let Some((header, body)) = rows.split_first() else {
        return Err(CatalogError::InvalidArgument("import CSV is empty".to_string()));
    };
    if header.len() < 3
        || !header[0].trim().eq_ignore_ascii_case(NAMESPACE_HEADER)
        || !header[1].trim().eq_ignore_ascii_case(KEY_HEADER)
    {
        return Err(CatalogError::InvalidArgument(format!(
            "import CSV header must start with {},{} followed by locale columns",
            NAMESPACE_HEADER, KEY_HEADER
        )));
    }
    let columns: Vec<String> = header[2..]
        .iter()
        .map(|h| match resolve_locale(h, known) {
            Some(code) => code.to_string(),
            None => h.trim().to_string(),
        })
        .collect();

    let mut candidates = Vec::new();
    for (index, row) in body.iter().enumerate() {
        let namespace = row.first().map(|s| s.trim()).unwrap_or_default();
        let key = row.get(1).map(|s| s.trim()).unwrap_or_default();
        if namespace.is_empty() || key.is_empty() {
            return Err(CatalogError::InvalidArgument(format!(
                "import CSV row {}: namespace and key are required",
                index + 2
            )));
        }
        for (locale, value) in columns.iter().zip(row.iter().skip(2)) {
            candidates.push(Candidate {
                namespace: namespace.to_string(),
                key: key.to_string(),
                locale: locale.clone(),
                value: value.clone(),
            });
        }
    }
    Ok(candidates)
}

fn classify(candidate: Candidate, catalogs: &BTreeMap<String, Catalog>) -> ImportRow {
    let skipped = |candidate: Candidate, reason: &str| ImportRow {
        namespace: candidate.namespace,
        key: candidate.key,
        locale: candidate.locale,
        value: candidate.value,
        status: RowStatus::Skipped,
        current: None,
        reason: Some(reason.to_string()),
    };

    let Some(catalog) = catalogs.get(&candidate.locale) else {
        return skipped(candidate, "unknown locale");
    };
    if validate_namespace(&candidate.namespace).is_err() || validate_key(&candidate.key).is_err() {
        return skipped(candidate, "invalid namespace or key");
    }
    if is_group(catalog, &candidate.namespace, &candidate.key) {
        return skipped(candidate, "path is a group of keys, not a value");
    }
    if blocking_leaf(catalog, &candidate.namespace, &candidate.key).is_some() {
        return skipped(candidate, "path is nested under an existing value");
    }

    let current = catalog
        .get(&candidate.namespace, &candidate.key)
        .map(str::to_string);
    let status = match &current {
        None => RowStatus::Added,
        Some(value) if *value == candidate.value => RowStatus::Unchanged,
        Some(_) => RowStatus::Updated,
    };
    ImportRow {
        namespace: candidate.namespace,
        key: candidate.key,
        locale: candidate.locale,
        value: candidate.value,
        status,
        current,
        reason: None,
    }
}

fn writes(row: &ImportRow) -> bool {
    matches!(row.status, RowStatus::Added | RowStatus::Updated)
}

impl Workspace {
    /// Classify every value in `content` against the current catalogs and,
    /// unless `preview` is set, apply the added and updated ones.
    ///
    /// Baseline values and empty cells in the input are ignored. A commit
    /// snapshots each affected locale first and logs one changelog entry.
    pub fn import_catalog(
        &self,
        format: ImportFormat,
        content: &str,
        preview: bool,
        author: &str,
    ) -> CatalogResult<ImportOutcome> {
        let baseline = self.baseline()?;
        let known = self.store.locales()?;
        let candidates: Vec<Candidate> = match format {
            ImportFormat::Json => parse_json(content)?,
            ImportFormat::Csv => parse_csv(content, &known)?,
        }
        .into_iter()
        .filter(|c| c.locale != baseline && !c.value.is_empty())
        .collect();

        let catalogs = self.store.load_all()?;
        let rows: Vec<ImportRow> = candidates
            .iter()
            .cloned()
            .map(|c| classify(c, &catalogs))
            .collect();

        let affected: Vec<String> = rows
            .iter()
            .filter(|r| writes(r))
            .map(|r| r.locale.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if preview || affected.is_empty() {
            return Ok(ImportOutcome {
                preview,
                summary: ImportSummary::of(&rows),
                rows,
                snapshots: Vec::new(),
                entry: None,
            });
        }

        let snapshots = self.snapshots.create(&self.store, &affected)?;

        // Classify again under the write locks; the catalogs may have moved
        // since the preview pass.
        let rows = self.store.update_many(&affected, |locked| {
            let mut rows = Vec::with_capacity(candidates.len());
            for candidate in candidates {
                let row = if locked.contains_key(&candidate.locale) {
                    classify(candidate, locked)
                } else {
                    classify(candidate, &catalogs)
                };
                if writes(&row) {
                    if let Some(catalog) = locked.get_mut(&row.locale) {
                        catalog.set(&row.namespace, &row.key, row.value.clone());
                    }
                }
                rows.push(row);
            }
            Ok(rows)
        })?;

        let summary = ImportSummary::of(&rows);
        let locale = match affected.as_slice() {
            [only] => only.clone(),
            _ => WILDCARD.to_string(),
        };
        let entry = self.ledger.append(
            ChangelogEntry::new(
                ChangeAction::Import,
                ChangeSource::Import,
                locale,
                WILDCARD,
                WILDCARD,
                author,
            )
            .with_values(
                None,
                Some(ChangeValue::Text(format!(
                    "{} added, {} updated across {} ({} unchanged, {} skipped)",
                    summary.added,
                    summary.updated,
                    affected.join(", "),
                    summary.unchanged,
                    summary.skipped
                ))),
            ),
        )?;

        info!(
            "Import committed: {} added, {} updated in {} locales",
            summary.added,
            summary.updated,
            affected.len()
        );
        Ok(ImportOutcome {
            preview,
            summary,
            rows,
            snapshots,
            entry: Some(entry),
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
            r#"{"Greeting": {"hello": "Hello, {name}!", "bye": "Bye"}}"#,
        )
        .unwrap();
        fs::write(content.join("es.json"), r#"{"Greeting": {"hello": "Hola, {name}!"}}"#).unwrap();
        let ws = Workspace::open(&content, dir.path().join("data"), "en").unwrap();
        (ws, dir)
    }

    const CSV: &str = "Namespace,Key,EN,ES,DE\r\n\
                       Greeting,hello,Hello!,\"Hola, {name}!\",Hallo\r\n\
                       Greeting,bye,Bye,Adiós,\r\n";

    #[test]
    fn test_preview_classifies_without_writing() {
        let (ws, _dir) = setup();
        let outcome = ws.import_catalog(ImportFormat::Csv, CSV, true, "ana").unwrap();

        assert_eq!(
            outcome.summary,
            ImportSummary {
                added: 1,
                updated: 0,
                unchanged: 1,
                skipped: 1
            }
        );
        let skipped = outcome
            .rows
            .iter()
            .find(|r| r.status == RowStatus::Skipped)
            .unwrap();
        assert_eq!(skipped.locale, "DE");
        assert!(outcome.entry.is_none());
        assert!(ws.ledger.is_empty().unwrap());
        assert!(ws.store.load("es").unwrap().get("Greeting", "bye").is_none());
    }

    #[test]
    fn test_baseline_values_are_ignored() {
        let (ws, _dir) = setup();
        let outcome = ws.import_catalog(ImportFormat::Csv, CSV, false, "ana").unwrap();
        assert!(outcome.rows.iter().all(|r| r.locale != "en"));
        assert_eq!(
            ws.store.load("en").unwrap().get("Greeting", "hello"),
            Some("Hello, {name}!")
        );
    }

    #[test]
    fn test_commit_snapshots_then_logs_once() {
        let (ws, _dir) = setup();
        let outcome = ws.import_catalog(ImportFormat::Csv, CSV, false, "ana").unwrap();

        assert_eq!(outcome.snapshots.len(), 1);
        assert_eq!(outcome.snapshots[0].locale, "es");
        assert_eq!(ws.store.load("es").unwrap().get("Greeting", "bye"), Some("Adiós"));

        let entries = ws.ledger.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action, ChangeAction::Import);
        assert_eq!(entries[0].locale, "es");
        assert_eq!(entries[0].key, WILDCARD);

        let (_, snapshot) = ws.snapshots.read(&outcome.snapshots[0].filename).unwrap();
        assert!(snapshot.get("Greeting", "bye").is_none());
    }

    #[test]
    fn test_json_import_updates() {
        let (ws, _dir) = setup();
        let json = r#"{"Greeting": {"hello": {"en": "Hello", "es": "¡Hola, {name}!"}}}"#;
        let outcome = ws.import_catalog(ImportFormat::Json, json, false, "ana").unwrap();

        assert_eq!(outcome.summary.updated, 1);
        assert_eq!(outcome.rows[0].current.as_deref(), Some("Hola, {name}!"));
        assert_eq!(
            ws.store.load("es").unwrap().get("Greeting", "hello"),
            Some("¡Hola, {name}!")
        );
    }

    #[test]
    fn test_nothing_to_apply_writes_nothing() {
        let (ws, _dir) = setup();
        let csv = "Namespace,Key,ES\nGreeting,hello,\"Hola, {name}!\"\n";
        let outcome = ws.import_catalog(ImportFormat::Csv, csv, false, "ana").unwrap();
        assert_eq!(outcome.summary.unchanged, 1);
        assert!(outcome.entry.is_none());
        assert!(ws.list_snapshots(None).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_input_is_invalid() {
        let (ws, _dir) = setup();
        for (format, content) in [
            (ImportFormat::Csv, "Locale,Key,ES\n"),
            (ImportFormat::Csv, "Namespace,Key,ES\n,hello,Hola\n"),
            (ImportFormat::Json, r#"{"Greeting": {"hello": {"es": 3}}}"#),
        ] {
            assert!(matches!(
                ws.import_catalog(format, content, true, "ana"),
                Err(CatalogError::InvalidArgument(_))
            ));
        }
    }
}
