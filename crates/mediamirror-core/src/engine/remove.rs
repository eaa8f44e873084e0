use super::MirrorEngine;
use crate::error::Result;
use crate::mirror_config::effective_options_for;
use crate::mirror_config::options::OptionOverlay;
use crate::model::{EntityKind, RemoteKind};
use crate::report::{dir_size, human_readable_size};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    NotTracked { kind: RemoteKind, id: String },
    /// The user declined the deletion prompt. Nothing was touched.
    Cancelled,
    Removed(RemoveReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveReport {
    pub kind: RemoteKind,
    pub id: String,
    pub name: String,
    pub items: usize,
    pub files: usize,
    pub paths: usize,
    /// Size of the deleted directory. `None` when the media was kept.
    pub freed_bytes: Option<u64>,
}

impl MirrorEngine<'_> {
    /// Forget a tracked entity and, unless `no_rm`, delete its media.
    ///
    /// Media goes first and records second, so an interrupted removal
    /// leaves stale records rather than untracked files.
    pub fn remove(&self, url: &str, runtime: &OptionOverlay) -> Result<RemoveOutcome> {
        let (kind, id) = self.identify(url)?;
        let mut session = self.open_session()?;
        let Some(entry) = session.config.entity(kind, &id).cloned() else {
            info!("{} {} is not tracked", kind, id);
            return Ok(RemoveOutcome::NotTracked { kind, id });
        };
        let options = effective_options_for(&session.config, kind, &id, runtime)?;
        let mut tables = session.store.open_all()?;

        // Phase 1: locate the entity and everything it owns
        let (own_path, mut item_ids) = match kind.entity_kind() {
            EntityKind::Group(_) => match tables.groups.get(&id)? {
                Some(group) => (Some(group.path), group.children),
                None => (None, BTreeSet::new()),
            },
            EntityKind::Item => (
                tables.items.get(&id)?.map(|item| item.path),
                BTreeSet::from([id.clone()]),
            ),
        };
        if let EntityKind::Group(_) = kind.entity_kind() {
            for (item_id, item) in tables.items.entries()? {
                if item.owned_by(&id) {
                    item_ids.insert(item_id);
                }
            }
        }

        // Phase 2: media on disk, best-effort
        let mut freed_bytes = None;
        if let (false, Some(path)) = (options.no_rm, own_path.as_deref()) {
            let dir = self.root.join(path);
            let size = dir_size(&dir);
            if !options.force {
                let prompt = format!(
                    "Remove {} '{}' and delete {} ({})?",
                    kind,
                    entry.name,
                    dir.display(),
                    human_readable_size(size)
                );
                if !self.confirm.confirm(&prompt)? {
                    info!("Removal of {} cancelled", id);
                    return Ok(RemoveOutcome::Cancelled);
                }
            }
            match fs::remove_dir_all(&dir) {
                Ok(()) => info!("Deleted {}", dir.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!("{} was already gone", dir.display())
                }
                Err(e) => warn!("Could not fully delete {}: {}", dir.display(), e),
            }
            freed_bytes = Some(size);
        }

        // Phase 3: records, then the config entry
        let mut owners = item_ids.clone();
        owners.insert(id.clone());

        let mut files = 0;
        for (filepath, file) in tables.files.entries()? {
            if item_ids.contains(&file.parent) {
                tables.files.delete(&filepath);
                files += 1;
            }
        }
        let mut paths = 0;
        for (path, record) in tables.paths.entries()? {
            if owners.contains(&record.owner) {
                tables.paths.delete(&path);
                paths += 1;
            }
        }
        let mut items = 0;
        for item_id in &item_ids {
            if tables.items.contains(item_id)? {
                tables.items.delete(item_id);
                items += 1;
            }
        }
        if let EntityKind::Group(_) = kind.entity_kind() {
            tables.groups.delete(&id);
        }
        tables.commit_all()?;

        session.config.remove_entity(kind, &id);
        session.save_config()?;
        info!(
            "Removed {} '{}': {} items, {} files, {} paths",
            kind, entry.name, items, files, paths
        );

        Ok(RemoveOutcome::Removed(RemoveReport {
            kind,
            id,
            name: entry.name,
            items,
            files,
            paths,
            freed_bytes,
        }))
    }
}
