//! Read-only coverage reporting.
//!
//! Completion counts a baseline key as translated only when the locale holds
//! a non-empty value for it. Keys a locale has that the baseline lacks are
//! reported as orphaned and never count towards completion.

use crate::catalog::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::workspace::Workspace;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

static NAMESPACE_USAGE_REGEX: OnceLock<Regex> = OnceLock::new();

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];
const SKIPPED_DIRS: &[&str] = &["node_modules", "target", "dist", "build", ".next"];

/// Which consumers (UI routes, components) depend on which namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerIndex {
    by_namespace: BTreeMap<String, BTreeSet<String>>,
}

impl ConsumerIndex {
    pub fn add(&mut self, consumer: &str, namespace: &str) {
        self.by_namespace
            .entry(namespace.to_string())
            .or_default()
            .insert(consumer.to_string());
    }

    pub fn merge(&mut self, other: ConsumerIndex) {
        for (namespace, consumers) in other.by_namespace {
            self.by_namespace
                .entry(namespace)
                .or_default()
                .extend(consumers);
        }
    }

    /// Load a manifest of the form `{ "<consumer>": ["<namespace>", ...] }`.
    pub fn from_manifest(path: &Path) -> CatalogResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        let manifest: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&content).map_err(|e| CatalogError::serialization(path, e))?;

        let mut index = Self::default();
        for (consumer, namespaces) in &manifest {
            for namespace in namespaces {
                index.add(consumer, namespace);
            }
        }
        info!(
            "Loaded {} consumers from {}",
            manifest.len(),
            path.display()
        );
        Ok(index)
    }

    /// Find static namespace usages in a source tree. The consumer is the
    /// file path relative to `root`.
    pub fn scan_sources(root: &Path) -> CatalogResult<Self> {
        let mut index = Self::default();
        let mut files = 0;
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let entries = fs::read_dir(&dir).map_err(|e| CatalogError::io(&dir, e))?;
            for entry in entries {
                let entry = entry.map_err(|e| CatalogError::io(&dir, e))?;
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();
                if name.starts_with('.') {
                    continue;
                }
                if path.is_dir() {
                    if !SKIPPED_DIRS.contains(&name.as_str()) {
                        pending.push(path);
                    }
                    continue;
                }
                let is_source = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e));
                if !is_source {
                    continue;
                }

                let content = fs::read_to_string(&path).map_err(|e| CatalogError::io(&path, e))?;
                let consumer = path
                    .strip_prefix(root)
                    .unwrap_or(path.as_path())
                    .to_string_lossy()
                    .replace('\\', "/");
                for namespace in namespace_usages(&content) {
                    index.add(&consumer, &namespace);
                }
                files += 1;
            }
        }

        debug!("Scanned {} source files under {}", files, root.display());
        Ok(index)
    }

    pub fn consumers_of(&self, namespace: &str) -> Vec<String> {
        self.by_namespace
            .get(namespace)
            .map(|c| c.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Inverse view: consumer -> namespaces it uses.
    pub fn by_consumer(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (namespace, consumers) in &self.by_namespace {
            for consumer in consumers {
                out.entry(consumer.clone())
                    .or_default()
                    .push(namespace.clone());
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.by_namespace.is_empty()
    }
}

/// Namespaces referenced by `useTranslations("X")`, `getTranslations("X")`
/// or `getTranslations({ namespace: "X" })`. A dotted argument refers to its
/// first segment.
fn namespace_usages(source: &str) -> BTreeSet<String> {
    let regex = NAMESPACE_USAGE_REGEX.get_or_init(|| {
        Regex::new(
            r#"\b(?:useTranslations|getTranslations)\(\s*(?:\{\s*(?:locale(?:\s*:\s*[^,}]+)?\s*,\s*)?namespace\s*:\s*)?["'`]([A-Za-z0-9_.\-]+)["'`]"#,
        )
        .expect("static namespace usage pattern")
    });

    regex
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .filter_map(|m| m.as_str().split('.').next().map(str::to_string))
        .filter(|ns| !ns.is_empty())
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct LocaleCoverage {
    pub locale: String,
    pub label: String,
    pub enabled: bool,
    pub is_default: bool,
    /// Leaf keys present in this locale (including orphaned ones)
    pub total_keys: usize,
    /// Baseline keys with a non-empty value in this locale
    pub translated: usize,
    pub completion: f64,
    pub missing_count: usize,
    /// Namespace -> baseline keys absent or empty in this locale
    pub missing: BTreeMap<String, Vec<String>>,
    /// `namespace.key` paths present here but not in the baseline
    pub orphaned: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceCoverage {
    pub name: String,
    pub keys: usize,
    pub consumers: Vec<String>,
    pub unused: bool,
    /// Locale -> completion of this namespace
    pub completion: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PageCoverage {
    pub consumer: String,
    pub namespaces: Vec<String>,
    /// Namespaces the consumer uses that the baseline does not define
    pub undefined_namespaces: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageSummary {
    pub locales: usize,
    pub baseline_keys: usize,
    pub namespaces: usize,
    pub unused_namespaces: usize,
    pub average_completion: f64,
    pub complete_locales: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoverageReport {
    pub baseline: String,
    pub generated_at: DateTime<Utc>,
    pub locales: Vec<LocaleCoverage>,
    pub namespaces: Vec<NamespaceCoverage>,
    pub pages: Vec<PageCoverage>,
    pub summary: CoverageSummary,
}

/// Result of [`Workspace::lookup_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyLookup {
    /// Every baseline key of a namespace.
    Keys { namespace: String, keys: Vec<String> },
    /// One key's value in every locale; `None` where the locale lacks it.
    Values {
        namespace: String,
        key: String,
        values: BTreeMap<String, Option<String>>,
    },
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        100.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

fn is_translated(catalog: &Catalog, namespace: &str, key: &str) -> bool {
    catalog.get(namespace, key).is_some_and(|v| !v.is_empty())
}

impl Workspace {
    pub fn coverage_report(&self) -> CatalogResult<CoverageReport> {
        let settings = self.settings.load()?;
        let baseline_code = settings.default_locale()?.code.clone();
        let catalogs = self.store.load_all()?;
        let baseline = catalogs
            .get(&baseline_code)
            .ok_or_else(|| CatalogError::NotFound(format!("baseline locale '{}'", baseline_code)))?;

        let baseline_entries = baseline.entries();
        let baseline_paths: BTreeSet<(String, String)> = baseline_entries
            .iter()
            .map(|e| (e.namespace.clone(), e.key.clone()))
            .collect();

        let mut locales = Vec::with_capacity(catalogs.len());
        for (code, catalog) in &catalogs {
            let mut missing: BTreeMap<String, Vec<String>> = BTreeMap::new();
            let mut translated = 0;
            for entry in &baseline_entries {
                if is_translated(catalog, &entry.namespace, &entry.key) {
                    translated += 1;
                } else {
                    missing
                        .entry(entry.namespace.clone())
                        .or_default()
                        .push(entry.key.clone());
                }
            }
            let orphaned = catalog
                .entries()
                .into_iter()
                .filter(|e| !baseline_paths.contains(&(e.namespace.clone(), e.key.clone())))
                .map(|e| format!("{}.{}", e.namespace, e.key))
                .collect();

            let config = settings.get_by_code(code);
            locales.push(LocaleCoverage {
                locale: code.clone(),
                label: config.map_or_else(|| code.clone(), |c| c.label.clone()),
                enabled: config.is_some_and(|c| c.enabled),
                is_default: code == &baseline_code,
                total_keys: catalog.leaf_count(),
                translated,
                completion: percent(translated, baseline_entries.len()),
                missing_count: baseline_entries.len() - translated,
                missing,
                orphaned,
            });
        }

        let namespaces: Vec<NamespaceCoverage> = baseline
            .namespaces()
            .into_iter()
            .map(|name| {
                let keys = baseline.namespace_leaves(name);
                let completion = catalogs
                    .iter()
                    .map(|(code, catalog)| {
                        let done = keys
                            .iter()
                            .filter(|(key, _)| is_translated(catalog, name, key))
                            .count();
                        (code.clone(), percent(done, keys.len()))
                    })
                    .collect();
                let consumers = self.consumers.consumers_of(name);
                NamespaceCoverage {
                    name: name.to_string(),
                    keys: keys.len(),
                    unused: consumers.is_empty(),
                    consumers,
                    completion,
                }
            })
            .collect();

        let pages = self
            .consumers
            .by_consumer()
            .into_iter()
            .map(|(consumer, used)| {
                let undefined_namespaces = used
                    .iter()
                    .filter(|ns| !baseline.has_namespace(ns))
                    .cloned()
                    .collect();
                PageCoverage {
                    consumer,
                    namespaces: used,
                    undefined_namespaces,
                }
            })
            .collect();

        let average_completion = if locales.is_empty() {
            0.0
        } else {
            round2(locales.iter().map(|l| l.completion).sum::<f64>() / locales.len() as f64)
        };
        let summary = CoverageSummary {
            locales: locales.len(),
            baseline_keys: baseline_entries.len(),
            namespaces: namespaces.len(),
            unused_namespaces: namespaces.iter().filter(|n| n.unused).count(),
            average_completion,
            complete_locales: locales.iter().filter(|l| l.missing_count == 0).count(),
        };

        debug!(
            "Coverage computed for {} locales over {} baseline keys",
            summary.locales, summary.baseline_keys
        );
        Ok(CoverageReport {
            baseline: baseline_code,
            generated_at: Utc::now(),
            locales,
            namespaces,
            pages,
            summary,
        })
    }

    /// List a namespace's baseline keys, or one key's value in every locale.
    pub fn lookup_key(&self, namespace: &str, key: Option<&str>) -> CatalogResult<KeyLookup> {
        let baseline_code = self.baseline()?;
        let catalogs = self.store.load_all()?;
        let baseline = catalogs
            .get(&baseline_code)
            .ok_or_else(|| CatalogError::NotFound(format!("baseline locale '{}'", baseline_code)))?;

        let Some(key) = key else {
            if !baseline.has_namespace(namespace) {
                return Err(CatalogError::NotFound(format!("namespace '{}'", namespace)));
            }
            return Ok(KeyLookup::Keys {
                namespace: namespace.to_string(),
                keys: baseline
                    .namespace_leaves(namespace)
                    .into_iter()
                    .map(|(k, _)| k)
                    .collect(),
            });
        };

        let values: BTreeMap<String, Option<String>> = catalogs
            .iter()
            .map(|(code, catalog)| (code.clone(), catalog.get(namespace, key).map(str::to_string)))
            .collect();
        if values.values().all(Option::is_none) {
            return Err(CatalogError::NotFound(format!("key '{}.{}'", namespace, key)));
        }
        Ok(KeyLookup::Values {
            namespace: namespace.to_string(),
            key: key.to_string(),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace(files: &[(&str, &str)]) -> (Workspace, TempDir) {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("messages");
        fs::create_dir_all(&content).unwrap();
        for (locale, json) in files {
            fs::write(content.join(format!("{}.json", locale)), json).unwrap();
        }
        let ws = Workspace::open(&content, dir.path().join("data"), "en").unwrap();
        (ws, dir)
    }

    const EN: &str = r#"{
        "Greeting": {"hello": "Hello, {name}!", "bye": "Bye"},
        "Nav": {"menu": {"home": "Home", "about": "About us"}}
    }"#;

    // ==================== Consumers ====================

    #[test]
    fn test_namespace_usages() {
        let source = r#"
            const t = useTranslations("Greeting");
            const n = await getTranslations('Nav.menu');
            const x = await getTranslations({ locale, namespace: "Footer" });
            const y = await getTranslations({namespace: `Billing`});
            useTranslations(dynamicName);
        "#;
        let found: Vec<String> = namespace_usages(source).into_iter().collect();
        assert_eq!(found, vec!["Billing", "Footer", "Greeting", "Nav"]);
    }

    #[test]
    fn test_manifest_and_scan_are_merged() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("consumers.json");
        fs::write(&manifest, r#"{"/checkout": ["Billing", "Nav"]}"#).unwrap();

        let src = dir.path().join("src/app");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("page.tsx"), r#"useTranslations("Greeting")"#).unwrap();
        fs::create_dir_all(dir.path().join("src/node_modules/x")).unwrap();
        fs::write(
            dir.path().join("src/node_modules/x/index.js"),
            r#"useTranslations("Vendor")"#,
        )
        .unwrap();

        let mut index = ConsumerIndex::from_manifest(&manifest).unwrap();
        index.merge(ConsumerIndex::scan_sources(&dir.path().join("src")).unwrap());

        assert_eq!(index.consumers_of("Nav"), vec!["/checkout"]);
        assert_eq!(index.consumers_of("Greeting"), vec!["app/page.tsx"]);
        assert!(index.consumers_of("Vendor").is_empty());
        assert_eq!(index.by_consumer()["/checkout"], vec!["Billing", "Nav"]);
    }

    #[test]
    fn test_malformed_manifest_is_serialization_error() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("consumers.json");
        fs::write(&manifest, r#"{"/a": "Nav"}"#).unwrap();
        assert!(matches!(
            ConsumerIndex::from_manifest(&manifest),
            Err(CatalogError::Serialization { .. })
        ));
    }

    // ==================== Report ====================

    #[test]
    fn test_completion_and_missing_sets() {
        let (ws, _dir) = workspace(&[
            ("en", EN),
            (
                "es",
                r#"{"Greeting": {"hello": "Hola, {name}!", "bye": ""}, "Nav": {"menu": {"home": "Inicio"}}}"#,
            ),
        ]);
        let report = ws.coverage_report().unwrap();

        assert_eq!(report.baseline, "en");
        let es = report.locales.iter().find(|l| l.locale == "es").unwrap();
        assert_eq!(es.total_keys, 3);
        assert_eq!(es.translated, 2);
        assert_eq!(es.completion, 50.0);
        assert_eq!(es.missing["Greeting"], vec!["bye"]);
        assert_eq!(es.missing["Nav"], vec!["menu.about"]);
        assert_eq!(es.missing_count, 2);

        let en = report.locales.iter().find(|l| l.locale == "en").unwrap();
        assert_eq!(en.completion, 100.0);
        assert!(en.is_default);
        assert_eq!(report.summary.complete_locales, 1);
        assert_eq!(report.summary.average_completion, 75.0);
    }

    #[test]
    fn test_completion_is_rounded_to_two_decimals() {
        let (ws, _dir) = workspace(&[
            ("en", r#"{"A": {"a": "1", "b": "2", "c": "3"}}"#),
            ("fr", r#"{"A": {"a": "un"}}"#),
        ]);
        let report = ws.coverage_report().unwrap();
        let fr = report.locales.iter().find(|l| l.locale == "fr").unwrap();
        assert_eq!(fr.completion, 33.33);
    }

    #[test]
    fn test_orphaned_keys_do_not_count() {
        let (ws, _dir) = workspace(&[
            ("en", r#"{"A": {"a": "one"}}"#),
            ("de", r#"{"A": {"a": "eins", "old": "alt"}, "Legacy": {"x": "y"}}"#),
        ]);
        let report = ws.coverage_report().unwrap();
        let de = report.locales.iter().find(|l| l.locale == "de").unwrap();
        assert_eq!(de.completion, 100.0);
        assert_eq!(de.orphaned, vec!["A.old", "Legacy.x"]);
    }

    #[test]
    fn test_unused_namespaces_are_flagged() {
        let (ws, _dir) = workspace(&[("en", EN)]);
        let mut consumers = ConsumerIndex::default();
        consumers.add("/", "Greeting");
        consumers.add("/", "Ghost");
        let ws = ws.with_consumers(consumers);

        let report = ws.coverage_report().unwrap();
        let greeting = report.namespaces.iter().find(|n| n.name == "Greeting").unwrap();
        let nav = report.namespaces.iter().find(|n| n.name == "Nav").unwrap();
        assert!(!greeting.unused);
        assert!(nav.unused);
        assert_eq!(report.summary.unused_namespaces, 1);
        assert_eq!(report.pages[0].undefined_namespaces, vec!["Ghost"]);
    }

    #[test]
    fn test_empty_baseline_is_fully_complete() {
        let (ws, _dir) = workspace(&[("en", "{}"), ("es", "{}")]);
        let report = ws.coverage_report().unwrap();
        assert!(report.locales.iter().all(|l| l.completion == 100.0));
    }

    // ==================== Lookup ====================

    #[test]
    fn test_lookup_namespace_keys() {
        let (ws, _dir) = workspace(&[("en", EN)]);
        let lookup = ws.lookup_key("Nav", None).unwrap();
        assert_eq!(
            lookup,
            KeyLookup::Keys {
                namespace: "Nav".to_string(),
                keys: vec!["menu.about".to_string(), "menu.home".to_string()],
            }
        );
        assert!(matches!(ws.lookup_key("Nope", None), Err(CatalogError::NotFound(_))));
    }

    #[test]
    fn test_lookup_values_per_locale() {
        let (ws, _dir) = workspace(&[("en", EN), ("es", r#"{"Greeting": {"bye": "Adiós"}}"#)]);
        let KeyLookup::Values { values, .. } = ws.lookup_key("Greeting", Some("hello")).unwrap()
        else {
            panic!("expected values");
        };
        assert_eq!(values["en"].as_deref(), Some("Hello, {name}!"));
        assert_eq!(values["es"], None);

        assert!(matches!(
            ws.lookup_key("Greeting", Some("nope")),
            Err(CatalogError::NotFound(_))
        ));
    }
}
