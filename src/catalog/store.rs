//! File-backed catalog store: one `<locale>.json` per locale.
//!
//! Every read-modify-write holds a per-locale mutex for its whole duration.
//! Files are written to a temporary sibling and renamed into place.

use super::locale::LocaleCode;
use super::model::Catalog;
use crate::error::{CatalogError, CatalogResult};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

const CATALOG_EXTENSION: &str = "json";

pub struct CatalogStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CatalogStore {
    /// Open (and create if needed) a content directory.
    pub fn open(dir: impl Into<PathBuf>) -> CatalogResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CatalogError::io(&dir, e))?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File of one locale. Only well-formed locale codes map to a path, so
    /// no caller can reach outside the content directory.
    pub fn path_for(&self, locale: &str) -> CatalogResult<PathBuf> {
        let code = LocaleCode::parse(locale)?;
        Ok(self.dir.join(format!("{}.{}", code, CATALOG_EXTENSION)))
    }

    pub fn exists(&self, locale: &str) -> bool {
        self.path_for(locale).map_or(false, |p| p.is_file())
    }

    /// Locale codes discovered from the files present, sorted.
    pub fn locales(&self) -> CatalogResult<Vec<String>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| CatalogError::io(&self.dir, e))?;

        let mut locales = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CatalogError::io(&self.dir, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(CATALOG_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if LocaleCode::parse(stem).is_ok() {
                    locales.push(stem.to_string());
                } else if !stem.starts_with('.') {
                    debug!("Ignoring {}: not a locale code", path.display());
                }
            }
        }
        locales.sort();
        Ok(locales)
    }

    /// Full parse of one locale file.
    pub fn load(&self, locale: &str) -> CatalogResult<Catalog> {
        let path = self.path_for(locale)?;
        if !path.is_file() {
            return Err(CatalogError::NotFound(format!("locale '{}'", locale)));
        }
        read_catalog(&path)
    }

    /// Load every discovered locale.
    pub fn load_all(&self) -> CatalogResult<BTreeMap<String, Catalog>> {
        let mut all = BTreeMap::new();
        for locale in self.locales()? {
            let catalog = self.load(&locale)?;
            all.insert(locale, catalog);
        }
        Ok(all)
    }

    /// Raw bytes of one locale file, as stored.
    pub fn read_raw(&self, locale: &str) -> CatalogResult<Vec<u8>> {
        let path = self.path_for(locale)?;
        fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CatalogError::NotFound(format!("locale '{}'", locale)),
            _ => CatalogError::io(&path, e),
        })
    }

    /// Create a brand new locale file. Fails with `Conflict` if it exists.
    pub fn create(&self, locale: &str, catalog: &Catalog) -> CatalogResult<()> {
        let path = self.path_for(locale)?;
        let lock = self.lock_for(locale);
        let _guard = acquire(&lock);

        if path.is_file() {
            return Err(CatalogError::Conflict(format!(
                "locale '{}' already exists",
                locale
            )));
        }
        write_atomic(&path, &serialize(locale, catalog)?)?;
        info!("Created catalog for locale {}", locale);
        Ok(())
    }

    /// Replace a locale file wholesale (last writer wins).
    pub fn write(&self, locale: &str, catalog: &Catalog) -> CatalogResult<()> {
        let path = self.path_for(locale)?;
        let lock = self.lock_for(locale);
        let _guard = acquire(&lock);
        write_atomic(&path, &serialize(locale, catalog)?)
    }

    /// Read-modify-write one locale under its lock. The catalog is only
    /// written back if `f` succeeds and actually changed it.
    pub fn update<R>(
        &self,
        locale: &str,
        f: impl FnOnce(&mut Catalog) -> CatalogResult<R>,
    ) -> CatalogResult<R> {
        let path = self.path_for(locale)?;
        let lock = self.lock_for(locale);
        let _guard = acquire(&lock);

        let original = self.load(locale)?;
        let mut catalog = original.clone();
        let result = f(&mut catalog)?;

        if catalog != original {
            write_atomic(&path, &serialize(locale, &catalog)?)?;
            debug!("Wrote catalog for locale {}", locale);
        }
        Ok(result)
    }

    /// Read-modify-write several locales at once.
    ///
    /// Locks are taken in sorted order. Every changed catalog is staged to a
    /// temporary file before any of them is renamed into place, so a
    /// serialization or disk error leaves all locales untouched.
    pub fn update_many<R>(
        &self,
        locales: &[String],
        f: impl FnOnce(&mut BTreeMap<String, Catalog>) -> CatalogResult<R>,
    ) -> CatalogResult<R> {
        let mut sorted: Vec<String> = locales.to_vec();
        sorted.sort();
        sorted.dedup();
        for locale in &sorted {
            self.path_for(locale)?;
        }

        let locks: Vec<Arc<Mutex<()>>> = sorted.iter().map(|l| self.lock_for(l)).collect();
        let _guards: Vec<MutexGuard<'_, ()>> = locks.iter().map(|l| acquire(l)).collect();

        let mut originals = BTreeMap::new();
        for locale in &sorted {
            originals.insert(locale.clone(), self.load(locale)?);
        }

        let mut catalogs = originals.clone();
        let result = f(&mut catalogs)?;

        let mut changed = Vec::new();
        for (locale, catalog) in &catalogs {
            if !sorted.contains(locale) {
                return Err(CatalogError::InvalidArgument(format!(
                    "locale '{}' was not locked for this write",
                    locale
                )));
            }
            if originals.get(locale) != Some(catalog) {
                changed.push((self.path_for(locale)?, serialize(locale, catalog)?));
            }
        }
        write_all_atomic(&changed)?;
        if !changed.is_empty() {
            debug!("Wrote {} catalogs in one batch", changed.len());
        }
        Ok(result)
    }

    /// Move a locale file to `archive_dir` as `<archive_name>`, so it is no
    /// longer enumerable but can be restored later.
    pub fn archive(&self, locale: &str, archive_dir: &Path, archive_name: &str) -> CatalogResult<PathBuf> {
        let source = self.path_for(locale)?;
        let lock = self.lock_for(locale);
        let _guard = acquire(&lock);

        if !source.is_file() {
            return Err(CatalogError::NotFound(format!("locale '{}'", locale)));
        }
        fs::create_dir_all(archive_dir).map_err(|e| CatalogError::io(archive_dir, e))?;
        let target = archive_dir.join(archive_name);
        fs::rename(&source, &target).map_err(|e| CatalogError::io(&source, e))?;
        info!("Archived locale {} to {}", locale, target.display());
        Ok(target)
    }

    /// Move an archived file back into the content directory as `locale`.
    pub fn restore(&self, locale: &str, archived: &Path) -> CatalogResult<()> {
        let target = self.path_for(locale)?;
        let lock = self.lock_for(locale);
        let _guard = acquire(&lock);

        if target.is_file() {
            return Err(CatalogError::Conflict(format!(
                "locale '{}' already exists",
                locale
            )));
        }
        read_catalog(archived)?;
        fs::rename(archived, &target).map_err(|e| CatalogError::io(archived, e))?;
        info!("Restored locale {} from {}", locale, archived.display());
        Ok(())
    }

    fn lock_for(&self, locale: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(locks.entry(locale.to_string()).or_default())
    }
}

/// A poisoned lock only means another writer panicked mid-way; the file on
/// disk is still whole because of the rename-into-place write.
fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|p| {
        warn!("Catalog lock was poisoned, continuing");
        p.into_inner()
    })
}

pub(crate) fn read_catalog(path: &Path) -> CatalogResult<Catalog> {
    let content = fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
    parse_catalog(path, &content)
}

pub(crate) fn parse_catalog(path: &Path, content: &str) -> CatalogResult<Catalog> {
    let content = content.trim_start_matches('\u{feff}');
    if content.trim().is_empty() {
        return Ok(Catalog::new());
    }
    serde_json::from_str(content).map_err(|e| CatalogError::serialization(path, e))
}

/// Deterministic serialization: sorted keys, two-space indent, trailing newline.
pub(crate) fn serialize(locale: &str, catalog: &Catalog) -> CatalogResult<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(catalog)
        .map_err(|e| CatalogError::serialization(format!("{}.json", locale), e))?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("catalog");
    path.with_file_name(format!(".{}.tmp", name))
}

/// Write to a hidden temp file, then rename over the target.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> CatalogResult<()> {
    write_all_atomic(&[(path.to_path_buf(), bytes.to_vec())])
}

fn write_all_atomic(files: &[(PathBuf, Vec<u8>)]) -> CatalogResult<()> {
    let mut staged = Vec::with_capacity(files.len());
    for (path, bytes) in files {
        let tmp = temp_path(path);
        if let Err(e) = fs::write(&tmp, bytes) {
            for (staged_tmp, _) in &staged {
                let _ = fs::remove_file(staged_tmp);
            }
            let _ = fs::remove_file(&tmp);
            return Err(CatalogError::io(&tmp, e));
        }
        staged.push((tmp, path));
    }

    for (tmp, path) in staged {
        fs::rename(&tmp, path).map_err(|e| CatalogError::io(path, e))?;
    }
    Ok(())
}
