use crate::catalog::CatalogStore;
use crate::config::Config;
use crate::coverage::ConsumerIndex;
use crate::error::CatalogResult;
use crate::ledger::Ledger;
use crate::settings::{LocaleSettings, SettingsStore};
use crate::snapshot::SnapshotStore;
use crate::translation::Translator;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// Every store the catalog operations work against.
///
/// Operations are implemented as `impl Workspace` blocks in the module that
/// owns them (mutation, exchange, rollback, lifecycle, ...). All writes go
/// through `store`, and every committed write appends to `ledger`.
pub struct Workspace {
    pub(crate) store: CatalogStore,
    pub(crate) ledger: Ledger,
    pub(crate) snapshots: SnapshotStore,
    pub(crate) settings: SettingsStore,
    pub(crate) consumers: ConsumerIndex,
    pub(crate) translator: Option<Translator>,
    pub(crate) archive_dir: PathBuf,
}

impl Workspace {
    /// Open a workspace over a content directory and a data directory
    /// (`changelog.json`, `settings.json`, `versions/`, `archive/`).
    ///
    /// Settings are reconciled with the locale files on disk; when no
    /// settings exist yet `fallback_baseline` becomes the default locale.
    pub fn open(
        content_dir: impl Into<PathBuf>,
        data_dir: impl AsRef<Path>,
        fallback_baseline: &str,
    ) -> CatalogResult<Self> {
        let data_dir = data_dir.as_ref();
        let store = CatalogStore::open(content_dir)?;
        let settings = SettingsStore::open(data_dir.join("settings.json"))?;
        let reconciled = settings.reconcile(&store.locales()?, fallback_baseline)?;

        info!(
            "Workspace opened: {} locales in {}",
            reconciled.locales.len(),
            store.dir().display()
        );

        Ok(Self {
            store,
            ledger: Ledger::open(data_dir.join("changelog.json"))?,
            snapshots: SnapshotStore::open(data_dir.join("versions"))?,
            settings,
            consumers: ConsumerIndex::default(),
            translator: None,
            archive_dir: data_dir.join("archive"),
        })
    }

    /// Open everything the environment config describes: stores, consumer
    /// map and (if an API key is configured) the translator.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut consumers = ConsumerIndex::default();
        if let Some(manifest) = &config.consumers_file {
            consumers.merge(ConsumerIndex::from_manifest(manifest).with_context(|| {
                format!("Failed to load consumers file {}", manifest.display())
            })?);
        }
        if let Some(source_dir) = &config.source_dir {
            consumers.merge(ConsumerIndex::scan_sources(source_dir).with_context(|| {
                format!("Failed to scan source directory {}", source_dir.display())
            })?);
        }

        let mut workspace = Self::open(
            config.content_dir.clone(),
            &config.data_dir,
            &config.baseline_locale,
        )
        .with_context(|| format!("Failed to open content directory {}", config.content_dir.display()))?
        .with_consumers(consumers);

        if let Some(translator) = Translator::from_config(config) {
            info!("Translation enabled with model {}", config.openai_model);
            workspace = workspace.with_translator(translator);
        } else {
            info!("OPENAI_API_KEY not set, translation endpoints disabled");
        }
        Ok(workspace)
    }

    pub fn with_translator(mut self, translator: Translator) -> Self {
        self.translator = Some(translator);
        self
    }

    pub fn with_consumers(mut self, consumers: ConsumerIndex) -> Self {
        self.consumers = consumers;
        self
    }

    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn snapshot_store(&self) -> &SnapshotStore {
        &self.snapshots
    }

    pub fn locale_settings(&self) -> CatalogResult<LocaleSettings> {
        self.settings.load()
    }

    pub fn translation_enabled(&self) -> bool {
        self.translator.is_some()
    }

    /// Code of the default (baseline) locale.
    pub fn baseline(&self) -> CatalogResult<String> {
        Ok(self.settings.load()?.default_locale()?.code.clone())
    }
}
