//! Immutable point-in-time copies of locale catalogs.
//!
//! Snapshots live in one directory as `{locale}_{timestamp}.json`. They are
//! written to a hidden temp file and renamed into place, and creation plus
//! retention pruning happen under one lock, so a listing never observes a
//! half-written or half-pruned archive.

use crate::catalog::{parse_catalog, write_atomic, Catalog, CatalogStore};
use crate::error::{CatalogError, CatalogResult};
use crate::workspace::Workspace;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{debug, info};

pub const DEFAULT_RETENTION: usize = 20;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3fZ";
const SNAPSHOT_EXTENSION: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
    pub filename: String,
    pub locale: String,
    pub created_at: DateTime<Utc>,
    pub size: u64,
}

/// Format a timestamp the way snapshot and archive file names carry it.
pub fn timestamp_label(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Split `{locale}_{timestamp}[.json]` into its parts.
pub fn parse_filename(filename: &str) -> CatalogResult<(String, DateTime<Utc>)> {
    let invalid = || {
        CatalogError::InvalidArgument(format!(
            "'{}' is not a snapshot name (expected {{locale}}_{{timestamp}})",
            filename
        ))
    };

    if filename.contains('/') || filename.contains('\\') || filename.starts_with('.') {
        return Err(invalid());
    }
    let stem = filename.strip_suffix(SNAPSHOT_EXTENSION).unwrap_or(filename);
    let (locale, stamp) = stem.split_once('_').ok_or_else(invalid)?;
    if locale.is_empty() {
        return Err(invalid());
    }
    let naive = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).map_err(|_| invalid())?;
    Ok((locale.to_string(), naive.and_utc()))
}

fn normalize(filename: &str) -> String {
    if filename.ends_with(SNAPSHOT_EXTENSION) {
        filename.to_string()
    } else {
        format!("{}{}", filename, SNAPSHOT_EXTENSION)
    }
}

pub struct SnapshotStore {
    dir: PathBuf,
    retention: usize,
    lock: Mutex<()>,
}

impl SnapshotStore {
    pub fn open(dir: impl Into<PathBuf>) -> CatalogResult<Self> {
        Self::with_retention(dir, DEFAULT_RETENTION)
    }

    pub fn with_retention(dir: impl Into<PathBuf>, retention: usize) -> CatalogResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CatalogError::io(&dir, e))?;
        Ok(Self {
            dir,
            retention: retention.max(1),
            lock: Mutex::new(()),
        })
    }

    /// Copy the current file of each given locale into the archive, then prune
    /// every affected locale down to the retention limit.
    pub fn create(&self, store: &CatalogStore, locales: &[String]) -> CatalogResult<Vec<SnapshotInfo>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());

        let mut created = Vec::with_capacity(locales.len());
        for locale in locales {
            let bytes = store.read_raw(locale)?;
            // Keep names strictly increasing per locale even within one millisecond.
            let floor = self
                .scan(Some(locale))?
                .first()
                .map(|latest| latest.created_at + Duration::milliseconds(1));
            let at = floor.map_or_else(Utc::now, |f| f.max(Utc::now()));
            let (filename, created_at) = self.free_name(locale, at);
            write_atomic(&self.dir.join(&filename), &bytes)?;
            debug!("Snapshot {} written ({} bytes)", filename, bytes.len());
            created.push(SnapshotInfo {
                filename,
                locale: locale.clone(),
                created_at,
                size: bytes.len() as u64,
            });
        }

        for locale in locales {
            self.prune(locale)?;
        }
        Ok(created)
    }

    /// Snapshot metadata, newest first.
    pub fn list(&self, locale: Option<&str>) -> CatalogResult<Vec<SnapshotInfo>> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.scan(locale)
    }

    /// Parse one snapshot's catalog.
    pub fn read(&self, filename: &str) -> CatalogResult<(String, Catalog)> {
        let (locale, _) = parse_filename(filename)?;
        let path = self.dir.join(normalize(filename));
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                CatalogError::NotFound(format!("snapshot '{}'", filename))
            }
            _ => CatalogError::io(&path, e),
        })?;
        Ok((locale, parse_catalog(&path, &content)?))
    }

    pub fn delete(&self, filename: &str) -> CatalogResult<()> {
        parse_filename(filename)?;
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let path = self.dir.join(normalize(filename));
        fs::remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                CatalogError::NotFound(format!("snapshot '{}'", filename))
            }
            _ => CatalogError::io(&path, e),
        })
    }

    fn scan(&self, locale: Option<&str>) -> CatalogResult<Vec<SnapshotInfo>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| CatalogError::io(&self.dir, e))?;

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CatalogError::io(&self.dir, e))?;
            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !filename.ends_with(SNAPSHOT_EXTENSION) {
                continue;
            }
            let Ok((snap_locale, created_at)) = parse_filename(&filename) else {
                continue;
            };
            if locale.is_some_and(|l| l != snap_locale) {
                continue;
            }
            let size = entry
                .metadata()
                .map_err(|e| CatalogError::io(entry.path(), e))?
                .len();
            snapshots.push(SnapshotInfo {
                filename,
                locale: snap_locale,
                created_at,
                size,
            });
        }

        snapshots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(snapshots)
    }

    fn prune(&self, locale: &str) -> CatalogResult<()> {
        let snapshots = self.scan(Some(locale))?;
        for stale in snapshots.iter().skip(self.retention) {
            let path = self.dir.join(&stale.filename);
            fs::remove_file(&path).map_err(|e| CatalogError::io(&path, e))?;
            info!("Pruned snapshot {}", stale.filename);
        }
        Ok(())
    }

    /// First unused file name at or after `at`, in millisecond steps.
    fn free_name(&self, locale: &str, at: DateTime<Utc>) -> (String, DateTime<Utc>) {
        let mut stamp = at;
        loop {
            let label = timestamp_label(stamp);
            let filename = format!("{}_{}{}", locale, label, SNAPSHOT_EXTENSION);
            if !self.dir.join(&filename).exists() {
                // Round-trip through the label so the reported time matches the name.
                let created_at = parse_filename(&filename)
                    .map(|(_, t)| t)
                    .unwrap_or(stamp);
                return (filename, created_at);
            }
            stamp += Duration::milliseconds(1);
        }
    }
}

impl Workspace {
    /// Snapshot one locale, or every locale when `locale` is `None`.
    pub fn create_snapshot(&self, locale: Option<&str>) -> CatalogResult<Vec<SnapshotInfo>> {
        let locales = match locale {
            Some(code) => {
                if !self.store.exists(code) {
                    return Err(CatalogError::NotFound(format!("locale '{}'", code)));
                }
                vec![code.to_string()]
            }
            None => self.store.locales()?,
        };
        let created = self.snapshots.create(&self.store, &locales)?;
        info!("Created {} snapshot(s)", created.len());
        Ok(created)
    }

    pub fn list_snapshots(&self, locale: Option<&str>) -> CatalogResult<Vec<SnapshotInfo>> {
        self.snapshots.list(locale)
    }
}
