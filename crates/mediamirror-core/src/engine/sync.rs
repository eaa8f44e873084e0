use super::{MirrorEngine, Scope, Session};
use crate::error::Result;
use crate::mirror_config::options::{OptionOverlay, OptionSet};
use crate::mirror_config::{effective_options, effective_options_for};
use crate::model::RemoteKind;
use crate::provider::{FetchOutcome, FileRequest, ItemRef};
use crate::storage::models::{FileRecord, ItemRecord, ParentType};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    NotTracked { kind: RemoteKind, id: String },
    Synced(SyncReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Files that were not yet downloaded when the sync started.
    pub pending: usize,
    pub downloaded: usize,
    pub failed: usize,
    pub skipped_unavailable: usize,
    pub bytes: u64,
    /// Nothing was transferred; `pending` is what would have been.
    pub dry_run: bool,
}

impl MirrorEngine<'_> {
    /// Download every file not yet marked downloaded, for one tracked
    /// entity or for the whole mirror.
    pub fn sync(&self, url: Option<&str>, runtime: &OptionOverlay) -> Result<SyncOutcome> {
        let target = url.map(|url| self.identify(url)).transpose()?;
        let session = self.open_session()?;
        let scope = match &target {
            Some((kind, id)) => {
                let tracked = session.config.entity_exists(*kind, id)
                    || is_child_item(&session, *kind, id)?;
                if !tracked {
                    info!("{} {} is not tracked", kind, id);
                    return Ok(SyncOutcome::NotTracked {
                        kind: *kind,
                        id: id.clone(),
                    });
                }
                Scope::Entity(*kind, id)
            }
            None => Scope::All,
        };
        Ok(SyncOutcome::Synced(self.sync_in(&session, scope, runtime)?))
    }

    pub(super) fn sync_in(
        &self,
        session: &Session,
        scope: Scope<'_>,
        runtime: &OptionOverlay,
    ) -> Result<SyncReport> {
        let start = Instant::now();
        let base = effective_options(&session.config, runtime)?;
        let mut tables = session.store.open_all()?;

        let item_ids: Option<BTreeSet<String>> = match scope {
            Scope::All => None,
            Scope::Entity(RemoteKind::Single, id) => Some(BTreeSet::from([id.to_string()])),
            Scope::Entity(_, id) => {
                let mut ids = tables
                    .groups
                    .get(id)?
                    .map(|group| group.children)
                    .unwrap_or_default();
                ids.extend(
                    tables
                        .items
                        .entries()?
                        .into_iter()
                        .filter(|(_, item)| item.owned_by(id))
                        .map(|(key, _)| key),
                );
                Some(ids)
            }
        };

        let pending: Vec<FileRecord> = tables
            .files
            .entries()?
            .into_iter()
            .map(|(_, file)| file)
            .filter(|file| !file.downloaded)
            .filter(|file| item_ids.as_ref().map_or(true, |ids| ids.contains(&file.parent)))
            .collect();

        let mut report = SyncReport {
            pending: pending.len(),
            dry_run: base.skips_download(),
            ..SyncReport::default()
        };
        info!("{} files pending download", pending.len());
        if report.dry_run {
            for file in &pending {
                info!("Would fetch {}", file.filepath);
            }
            return Ok(report);
        }

        self.reporter.on_sync_start(pending.len());
        let mut options_by_owner: HashMap<String, OptionSet> = HashMap::new();
        for mut file in pending {
            let Some(item) = tables.items.get(&file.parent)? else {
                warn!(
                    "{} belongs to unknown item {}, skipping",
                    file.filepath, file.parent
                );
                report.failed += 1;
                continue;
            };
            if !item.available {
                debug!("{} is unavailable upstream, skipping {}", item.remote_id, file.filepath);
                report.skipped_unavailable += 1;
                continue;
            }
            let options = self.item_options(session, &item, runtime, &mut options_by_owner)?;

            self.reporter.on_file_start(&file.filepath);
            match self.fetch_one(&item, &file, &self.root.join(&file.filepath), &options) {
                Ok(outcome) => {
                    // Only ever flips false -> true.
                    file.downloaded = true;
                    file.size_bytes = Some(outcome.size_bytes);
                    let key = file.filepath.clone();
                    tables.files.set(&key, file);
                    tables.files.commit()?;
                    report.downloaded += 1;
                    report.bytes += outcome.size_bytes;
                    self.reporter.on_file_complete(&key, true);
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", file.filepath, e);
                    report.failed += 1;
                    self.reporter.on_file_complete(&file.filepath, false);
                }
            }
        }

        let elapsed = start.elapsed();
        self.reporter
            .on_sync_complete(report.downloaded, report.failed, elapsed.as_secs_f64());
        info!(
            "Sync finished in {:.2}s: {} downloaded, {} failed, {} unavailable",
            elapsed.as_secs_f64(),
            report.downloaded,
            report.failed,
            report.skipped_unavailable
        );
        Ok(report)
    }

    fn fetch_one(
        &self,
        item: &ItemRecord,
        file: &FileRecord,
        dest: &Path,
        options: &OptionSet,
    ) -> Result<FetchOutcome> {
        if let Some(dir) = dest.parent() {
            fs::create_dir_all(dir)?;
        }
        let item_ref = ItemRef {
            id: &item.remote_id,
            name: &item.name,
            url: &item.source_url,
        };
        let request = FileRequest {
            kind: file.kind,
            language: file.language.as_deref(),
        };
        self.fetcher.fetch(&item_ref, &request, dest, options)
    }

    /// Options of the tracked entity an item descends from, memoized per owner.
    fn item_options(
        &self,
        session: &Session,
        item: &ItemRecord,
        runtime: &OptionOverlay,
        memo: &mut HashMap<String, OptionSet>,
    ) -> Result<OptionSet> {
        let owner = match (item.parent_type, item.parent_id.as_deref()) {
            (ParentType::Group, Some(group_id)) => group_id,
            _ => item.remote_id.as_str(),
        };
        if let Some(options) = memo.get(owner) {
            return Ok(options.clone());
        }
        let tracked_as = RemoteKind::ALL
            .into_iter()
            .find(|kind| session.config.entity_exists(*kind, owner));
        let options = match tracked_as {
            Some(kind) => effective_options_for(&session.config, kind, owner, runtime)?,
            None => effective_options(&session.config, runtime)?,
        };
        memo.insert(owner.to_string(), options.clone());
        Ok(options)
    }
}

/// A group's child is reachable by its own link even though only the group
/// has a config entry.
fn is_child_item(session: &Session, kind: RemoteKind, id: &str) -> Result<bool> {
    if kind != RemoteKind::Single {
        return Ok(false);
    }
    let items = session.store.open_table::<ItemRecord>()?;
    Ok(items
        .get(id)?
        .is_some_and(|item| item.parent_type == ParentType::Group))
}
