//! Locale settings: which locales exist, their labels, which are enabled,
//! and which one is the default (baseline).
//!
//! Settings are persisted in one JSON resource and reconciled with the
//! catalog files present on disk at start-up.

use crate::catalog::write_atomic;
use crate::error::{CatalogError, CatalogResult};
use crate::translation::style::language_name;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{info, warn};

/// Configuration for one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocaleConfig {
    /// BCP-47 code, also the catalog file stem (e.g. "en", "pt-BR")
    pub code: String,

    /// Human-readable name shown to editors (e.g. "Español")
    pub label: String,

    /// Whether the locale is served to end users
    pub enabled: bool,

    /// Whether this is the default (baseline) locale; exactly one is
    pub is_default: bool,
}

impl LocaleConfig {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            enabled: true,
            is_default: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleSettings {
    pub locales: Vec<LocaleConfig>,
}

impl LocaleSettings {
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|l| l.code == code)
    }

    fn get_mut(&mut self, code: &str) -> CatalogResult<&mut LocaleConfig> {
        self.locales
            .iter_mut()
            .find(|l| l.code == code)
            .ok_or_else(|| CatalogError::NotFound(format!("locale '{}'", code)))
    }

    /// The default locale. Its key set is canonical for every other locale.
    pub fn default_locale(&self) -> CatalogResult<&LocaleConfig> {
        self.locales
            .iter()
            .find(|l| l.is_default)
            .ok_or_else(|| CatalogError::NotFound("no default locale configured".to_string()))
    }

    pub fn list_enabled(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().filter(|l| l.enabled).collect()
    }

    /// Exactly one default, and the default is enabled.
    pub fn validate(&self) -> CatalogResult<()> {
        let defaults: Vec<&LocaleConfig> = self.locales.iter().filter(|l| l.is_default).collect();
        match defaults.as_slice() {
            [] if self.locales.is_empty() => Ok(()),
            [] => Err(CatalogError::InvalidArgument(
                "settings have no default locale".to_string(),
            )),
            [default] if !default.enabled => Err(CatalogError::InvalidArgument(format!(
                "default locale '{}' must be enabled",
                default.code
            ))),
            [_] => Ok(()),
            _ => Err(CatalogError::InvalidArgument(
                "settings have more than one default locale".to_string(),
            )),
        }
    }

    pub fn add(&mut self, config: LocaleConfig) -> CatalogResult<()> {
        if self.get_by_code(&config.code).is_some() {
            return Err(CatalogError::Conflict(format!(
                "locale '{}' already configured",
                config.code
            )));
        }
        self.locales.push(config);
        self.locales.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(())
    }

    pub fn remove(&mut self, code: &str) -> CatalogResult<LocaleConfig> {
        let index = self
            .locales
            .iter()
            .position(|l| l.code == code)
            .ok_or_else(|| CatalogError::NotFound(format!("locale '{}'", code)))?;
        if self.locales[index].is_default {
            return Err(CatalogError::Unsupported(format!(
                "'{}' is the default locale",
                code
            )));
        }
        Ok(self.locales.remove(index))
    }

    /// Move the default flag to `code`, enabling it.
    pub fn set_default(&mut self, code: &str) -> CatalogResult<()> {
        self.get_mut(code)?;
        for locale in &mut self.locales {
            locale.is_default = locale.code == code;
            if locale.is_default {
                locale.enabled = true;
            }
        }
        Ok(())
    }

    pub fn set_enabled(&mut self, code: &str, enabled: bool) -> CatalogResult<()> {
        let locale = self.get_mut(code)?;
        if locale.is_default && !enabled {
            return Err(CatalogError::Unsupported(format!(
                "cannot disable the default locale '{}'",
                code
            )));
        }
        locale.enabled = enabled;
        Ok(())
    }

    /// Bring settings in line with the locale files on disk. Returns true
    /// when anything changed.
    pub fn reconcile(&mut self, on_disk: &[String], fallback_default: &str) -> bool {
        let before = self.clone();

        self.locales
            .retain(|l| l.is_default || on_disk.iter().any(|code| code == &l.code));

        for code in on_disk {
            if self.get_by_code(code).is_none() {
                let label = language_name(code).unwrap_or(code.as_str()).to_string();
                self.locales.push(LocaleConfig::new(code.clone(), label));
            }
        }
        self.locales.sort_by(|a, b| a.code.cmp(&b.code));

        let default_count = self.locales.iter().filter(|l| l.is_default).count();
        if default_count != 1 {
            let chosen = if on_disk.iter().any(|c| c == fallback_default) {
                Some(fallback_default.to_string())
            } else {
                self.locales.first().map(|l| l.code.clone())
            };
            if let Some(code) = chosen {
                warn!("Settings had {} default locales, using '{}'", default_count, code);
                for locale in &mut self.locales {
                    locale.is_default = locale.code == code;
                }
            }
        }
        for locale in &mut self.locales {
            if locale.is_default {
                locale.enabled = true;
            }
        }

        *self != before
    }
}

pub struct SettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl SettingsStore {
    pub fn open(path: impl Into<PathBuf>) -> CatalogResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CatalogError::io(parent, e))?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn load(&self) -> CatalogResult<LocaleSettings> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.read()
    }

    /// Read-modify-write the settings; invariants are checked before saving.
    pub fn update<R>(
        &self,
        f: impl FnOnce(&mut LocaleSettings) -> CatalogResult<R>,
    ) -> CatalogResult<R> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut settings = self.read()?;
        let result = f(&mut settings)?;
        settings.validate()?;
        self.write(&settings)?;
        Ok(result)
    }

    /// Reconcile with the files on disk and persist if anything changed.
    pub fn reconcile(&self, on_disk: &[String], fallback_default: &str) -> CatalogResult<LocaleSettings> {
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut settings = self.read()?;
        if settings.reconcile(on_disk, fallback_default) {
            self.write(&settings)?;
            info!("Locale settings reconciled: {} locales", settings.locales.len());
        }
        Ok(settings)
    }

    fn read(&self) -> CatalogResult<LocaleSettings> {
        match fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| CatalogError::serialization(&self.path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LocaleSettings::default()),
            Err(e) => Err(CatalogError::io(&self.path, e)),
        }
    }

    fn write(&self, settings: &LocaleSettings) -> CatalogResult<()> {
        let bytes = serde_json::to_vec_pretty(settings)
            .map_err(|e| CatalogError::serialization(&self.path, e))?;
        write_atomic(&self.path, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings() -> LocaleSettings {
        let mut en = LocaleConfig::new("en", "English");
        en.is_default = true;
        LocaleSettings {
            locales: vec![en, LocaleConfig::new("es", "Español")],
        }
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_default_locale() {
        assert_eq!(settings().default_locale().unwrap().code, "en");
        assert!(LocaleSettings::default().default_locale().is_err());
    }

    #[test]
    fn test_validate_exactly_one_enabled_default() {
        assert!(settings().validate().is_ok());

        let mut two = settings();
        two.locales[1].is_default = true;
        assert!(two.validate().is_err());

        let mut disabled = settings();
        disabled.locales[0].enabled = false;
        assert!(disabled.validate().is_err());
    }

    #[test]
    fn test_set_default_moves_flag_and_enables() {
        let mut s = settings();
        s.locales[1].enabled = false;
        s.set_default("es").unwrap();

        assert_eq!(s.default_locale().unwrap().code, "es");
        assert!(s.get_by_code("es").unwrap().enabled);
        assert!(!s.get_by_code("en").unwrap().is_default);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_set_default_unknown_locale() {
        let mut s = settings();
        assert!(matches!(s.set_default("fr"), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_cannot_disable_default() {
        let mut s = settings();
        assert!(matches!(
            s.set_enabled("en", false),
            Err(CatalogError::Unsupported(_))
        ));
        s.set_enabled("es", false).unwrap();
        assert_eq!(s.list_enabled().len(), 1);
    }

    #[test]
    fn test_remove_default_is_unsupported() {
        let mut s = settings();
        assert!(matches!(s.remove("en"), Err(CatalogError::Unsupported(_))));
        assert_eq!(s.remove("es").unwrap().code, "es");
    }

    #[test]
    fn test_add_duplicate_conflicts() {
        let mut s = settings();
        assert!(matches!(
            s.add(LocaleConfig::new("es", "Spanish")),
            Err(CatalogError::Conflict(_))
        ));
    }

    #[test]
    fn test_reconcile_from_empty_settings() {
        let mut s = LocaleSettings::default();
        let changed = s.reconcile(&codes(&["en", "es", "xx"]), "en");

        assert!(changed);
        assert_eq!(s.default_locale().unwrap().code, "en");
        assert_eq!(s.get_by_code("es").unwrap().label, "Spanish");
        assert_eq!(s.get_by_code("xx").unwrap().label, "xx");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_reconcile_drops_vanished_locales_but_keeps_default() {
        let mut s = settings();
        let changed = s.reconcile(&codes(&["de"]), "en");
        assert!(changed);
        assert!(s.get_by_code("es").is_none());
        assert!(s.get_by_code("en").is_some());
        assert!(s.get_by_code("de").is_some());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let mut s = settings();
        assert!(!s.reconcile(&codes(&["en", "es"]), "en"));
    }

    #[test]
    fn test_store_round_trip_and_validation() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::open(dir.path().join("settings.json")).unwrap();
        assert!(store.load().unwrap().locales.is_empty());

        store.reconcile(&codes(&["en", "fr"]), "en").unwrap();
        store.update(|s| s.set_enabled("fr", false)).unwrap();
        assert!(!store.load().unwrap().get_by_code("fr").unwrap().enabled);

        let result = store.update(|s| {
            s.locales[0].enabled = false;
            Ok(())
        });
        assert!(result.is_err());
        assert!(store.load().unwrap().get_by_code("en").unwrap().enabled);
    }
}
