//! Restoring a locale from a snapshot.
//!
//! Applying a rollback first snapshots the current state, so every rollback
//! can itself be rolled back.

use crate::catalog::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::ledger::{ChangeAction, ChangeSource, ChangeValue, ChangelogEntry, WILDCARD};
use crate::snapshot::{parse_filename, SnapshotInfo};
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Examples listed per diff category.
pub const MAX_EXAMPLES: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffExample {
    pub namespace: String,
    pub key: String,
    pub snapshot: Option<String>,
    pub current: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffCategory {
    pub count: usize,
    pub examples: Vec<DiffExample>,
}

impl DiffCategory {
    fn push(&mut self, example: DiffExample) {
        self.count += 1;
        if self.examples.len() < MAX_EXAMPLES {
            self.examples.push(example);
        }
    }
}

/// What applying a snapshot would do to the current catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackPreview {
    pub filename: String,
    pub locale: String,
    pub snapshot_created_at: DateTime<Utc>,
    /// In the snapshot but not current: restored
    pub added: DiffCategory,
    /// Current but not in the snapshot: discarded
    pub removed: DiffCategory,
    pub changed: DiffCategory,
}

impl RollbackPreview {
    pub fn is_noop(&self) -> bool {
        self.added.count == 0 && self.removed.count == 0 && self.changed.count == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RollbackOutcome {
    pub diff: RollbackPreview,
    /// Snapshot of the state that was replaced
    pub safety_snapshot: SnapshotInfo,
    pub entry: ChangelogEntry,
}

fn leaf_map(catalog: &Catalog) -> BTreeMap<(String, String), String> {
    catalog
        .entries()
        .into_iter()
        .map(|e| ((e.namespace, e.key), e.value))
        .collect()
}

/// Leaf-level diff from `current` to `snapshot`: (added, removed, changed).
pub fn diff_catalogs(snapshot: &Catalog, current: &Catalog) -> (DiffCategory, DiffCategory, DiffCategory) {
    let wanted = leaf_map(snapshot);
    let present = leaf_map(current);
    let mut added = DiffCategory::default();
    let mut removed = DiffCategory::default();
    let mut changed = DiffCategory::default();

    for ((namespace, key), value) in &wanted {
        let example = |current: Option<&String>| DiffExample {
            namespace: namespace.clone(),
            key: key.clone(),
            snapshot: Some(value.clone()),
            current: current.cloned(),
        };
        match present.get(&(namespace.clone(), key.clone())) {
            None => added.push(example(None)),
            Some(now) if now != value => changed.push(example(Some(now))),
            Some(_) => {}
        }
    }
    for ((namespace, key), value) in &present {
        if !wanted.contains_key(&(namespace.clone(), key.clone())) {
            removed.push(DiffExample {
                namespace: namespace.clone(),
                key: key.clone(),
                snapshot: None,
                current: Some(value.clone()),
            });
        }
    }
    (added, removed, changed)
}

impl Workspace {
    pub fn preview_rollback(&self, filename: &str) -> CatalogResult<RollbackPreview> {
        let (locale, snapshot) = self.snapshots.read(filename)?;
        let current = self.rollback_target(&locale)?;
        build_preview(filename, &locale, &snapshot, &current)
    }

    /// Replace a locale's catalog with the content of one of its snapshots.
    pub fn apply_rollback(&self, filename: &str, author: &str) -> CatalogResult<RollbackOutcome> {
        let (locale, snapshot) = self.snapshots.read(filename)?;
        self.rollback_target(&locale)?;

        let mut safety = self.snapshots.create(&self.store, &[locale.clone()])?;
        let safety_snapshot = safety.pop().ok_or_else(|| {
            CatalogError::NotFound(format!("safety snapshot of '{}'", locale))
        })?;

        let (diff, replaced_keys) = self.store.update(&locale, |catalog| {
            let diff = build_preview(filename, &locale, &snapshot, catalog)?;
            let replaced_keys = catalog.leaf_count();
            *catalog = snapshot.clone();
            Ok((diff, replaced_keys))
        })?;

        let entry = self.ledger.append(
            ChangelogEntry::new(
                ChangeAction::Rollback,
                ChangeSource::Rollback,
                locale.clone(),
                WILDCARD,
                WILDCARD,
                author,
            )
            .with_values(
                Some(ChangeValue::Text(format!(
                    "{} keys, saved as {}",
                    replaced_keys, safety_snapshot.filename
                ))),
                Some(ChangeValue::Text(format!(
                    "{} keys from {} ({} restored, {} discarded, {} changed)",
                    snapshot.leaf_count(),
                    filename,
                    diff.added.count,
                    diff.removed.count,
                    diff.changed.count
                ))),
            ),
        )?;

        info!(
            "Rolled back {} to {}: {} restored, {} discarded, {} changed",
            locale, filename, diff.added.count, diff.removed.count, diff.changed.count
        );
        Ok(RollbackOutcome {
            diff,
            safety_snapshot,
            entry,
        })
    }

    fn rollback_target(&self, locale: &str) -> CatalogResult<Catalog> {
        match self.store.load(locale) {
            Err(CatalogError::NotFound(_)) => Err(CatalogError::NotFound(format!(
                "locale '{}' (restore it from the archive before rolling back)",
                locale
            ))),
            other => other,
        }
    }
}

fn build_preview(
    filename: &str,
    locale: &str,
    snapshot: &Catalog,
    current: &Catalog,
) -> CatalogResult<RollbackPreview> {
    let (_, created_at) = parse_filename(filename)?;
    let (added, removed, changed) = diff_catalogs(snapshot, current);
    Ok(RollbackPreview {
        filename: filename.to_string(),
        locale: locale.to_string(),
        snapshot_created_at: created_at,
        added,
        removed,
        changed,
    })
}
