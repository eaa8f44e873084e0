//! The mirror state engine.
//!
//! Every operation is a short sequence of phases over the config document
//! and the record store. Nothing survives between invocations except what
//! those two hold on disk, so re-running an interrupted operation is always
//! safe.

mod add;
mod plan;
mod remove;
mod sync;
mod update;
mod verify;

pub use add::{AddOutcome, AddReport};
pub use remove::{RemoveOutcome, RemoveReport};
pub use sync::{SyncOutcome, SyncReport};
pub use update::{GroupUpdate, UpdateOutcome, UpdateReport};
pub use verify::VerifyReport;

use crate::error::{Error, Result};
use crate::mirror_config::{self, MirrorConfig, CONFIG_FILE_NAME};
use crate::model::RemoteKind;
use crate::progress::{Confirm, ProgressReporter, SilentReporter};
use crate::provider::{Fetcher, MetadataCache, RemoteMetadata, SourceProvider};
use crate::report::ShowEntry;
use crate::storage::store::STORE_DIR_NAME;
use crate::storage::{MirrorLock, RecordStore};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

static SILENT: SilentReporter = SilentReporter;

pub struct MirrorEngine<'a> {
    root: PathBuf,
    provider: &'a dyn SourceProvider,
    fetcher: &'a dyn Fetcher,
    confirm: &'a dyn Confirm,
    reporter: &'a dyn ProgressReporter,
}

/// Which part of the mirror an operation touches.
#[derive(Debug, Clone, Copy)]
enum Scope<'a> {
    All,
    Entity(RemoteKind, &'a str),
}

/// Everything one locked operation works on. The lock is released last.
struct Session {
    config: MirrorConfig,
    store: RecordStore,
    config_path: PathBuf,
    _lock: MirrorLock,
}

impl Session {
    fn save_config(&self) -> Result<()> {
        mirror_config::save(&self.config_path, &self.config)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InitReport {
    pub created_root: bool,
    pub created_config: bool,
    pub created_store: bool,
}

fn is_initialized(root: &Path) -> bool {
    root.join(CONFIG_FILE_NAME).is_file() && root.join(STORE_DIR_NAME).is_dir()
}

/// Create whatever is missing of a mirror at `root`. Safe to repeat.
pub fn init(root: &Path) -> Result<InitReport> {
    let mut report = InitReport::default();
    if !root.is_dir() {
        fs::create_dir_all(root)?;
        report.created_root = true;
    }
    let _lock = MirrorLock::acquire(root)?;

    let config_path = root.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        mirror_config::save(&config_path, &MirrorConfig::default())?;
        report.created_config = true;
    }

    let store_path = root.join(STORE_DIR_NAME);
    if !store_path.exists() {
        RecordStore::open(&store_path)?;
        report.created_store = true;
    }

    info!(
        "Mirror at {} ready (root created: {}, config created: {}, store created: {})",
        root.display(),
        report.created_root,
        report.created_config,
        report.created_store
    );
    Ok(report)
}

/// Every tracked entity in config order. Reads only the config document.
pub fn show(root: &Path) -> Result<Vec<ShowEntry>> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if !config_path.is_file() {
        return Err(Error::NotInitialized(root.to_path_buf()));
    }
    let config = mirror_config::load(&config_path)?;
    Ok(config
        .entities()
        .map(|(kind, id, entry)| ShowEntry {
            kind,
            id: id.clone(),
            name: entry.name.clone(),
            url: entry.url.clone(),
        })
        .collect())
}

impl<'a> MirrorEngine<'a> {
    pub fn new(
        root: impl Into<PathBuf>,
        provider: &'a dyn SourceProvider,
        fetcher: &'a dyn Fetcher,
        confirm: &'a dyn Confirm,
    ) -> Self {
        Self {
            root: root.into(),
            provider,
            fetcher,
            confirm,
            reporter: &SILENT,
        }
    }

    pub fn with_reporter(mut self, reporter: &'a dyn ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn open_session(&self) -> Result<Session> {
        if !is_initialized(&self.root) {
            return Err(Error::NotInitialized(self.root.clone()));
        }
        let lock = MirrorLock::acquire(&self.root)?;
        let config_path = self.root.join(CONFIG_FILE_NAME);
        let config = mirror_config::load(&config_path)?;
        let store = RecordStore::open(&self.root.join(STORE_DIR_NAME))?;
        Ok(Session {
            config,
            store,
            config_path,
            _lock: lock,
        })
    }

    /// Offline classification and id derivation.
    fn identify(&self, url: &str) -> Result<(RemoteKind, String)> {
        let kind = self.provider.classify(url)?;
        let id = self.provider.derive_id(url)?;
        debug!("{} classified as {} {}", url, kind, id);
        Ok((kind, id))
    }

    fn resolve_metadata(
        &self,
        cache: &mut MetadataCache,
        id: &str,
        url: &str,
    ) -> Result<RemoteMetadata> {
        if cache.get(id).is_none() {
            self.reporter.on_metadata_fetch(url);
        }
        Ok(cache.get_or_fetch(self.provider, id, url)?.clone())
    }
}
