use super::MirrorEngine;
use crate::error::Result;
use crate::mirror_config::options::OptionSet;
use crate::model::{FileKind, RemoteKind};
use crate::paths::{compute_file_set, compute_path, nest_path, resolve_collision, PathLookup};
use crate::provider::{MetadataCache, RemoteMetadata};
use crate::storage::models::{FileRecord, ItemRecord, ParentType, PathRecord};
use crate::storage::{Table, Tables};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::debug;

/// The group a planned item nests under.
#[derive(Debug, Clone, Copy)]
pub(super) struct ParentRef<'a> {
    pub id: &'a str,
    pub path: &'a str,
}

/// Paths allocated to anyone but `owner`. A path `owner` already holds is
/// handed back to it, which lets an interrupted add be replayed.
struct HeldByOthers<'t, 'a> {
    paths: &'t Table<'a, PathRecord>,
    owner: &'t str,
}

impl PathLookup for HeldByOthers<'_, '_> {
    fn is_taken(&self, path: &str) -> Result<bool> {
        Ok(self
            .paths
            .get(path)?
            .is_some_and(|record| record.owner != self.owner))
    }
}

/// Allocate a free path for `owner` and record it in the Path table.
pub(super) fn register_path(
    paths: &mut Table<'_, PathRecord>,
    candidate: &str,
    owner: &str,
) -> Result<String> {
    let lookup = HeldByOthers {
        paths: &*paths,
        owner,
    };
    let path = resolve_collision(candidate, &lookup, owner)?;
    paths.set(
        &path,
        PathRecord {
            owner: owner.to_string(),
        },
    );
    Ok(path)
}

/// Buffer the Item, its Path entries and its File records. Nothing is
/// committed here.
pub(super) fn plan_item(
    tables: &mut Tables<'_>,
    metadata: &RemoteMetadata,
    id: &str,
    parent: Option<ParentRef<'_>>,
    options: &OptionSet,
    today: NaiveDate,
) -> Result<ItemRecord> {
    let candidate = match parent {
        Some(parent) => nest_path(parent.path, &metadata.name),
        None => compute_path(RemoteKind::Single, None, &metadata.name),
    };
    let path = register_path(&mut tables.paths, &candidate, id)?;

    let mut files = BTreeSet::new();
    for (candidate, stub) in compute_file_set(&path, &metadata.name, options) {
        let filepath = register_path(&mut tables.paths, &candidate, id)?;
        let resolution = (stub.kind == FileKind::Video).then(|| options.resolution.to_string());
        // A replayed plan keeps whatever was already fetched.
        let (downloaded, size_bytes) = match tables.files.get(&filepath)? {
            Some(existing) if existing.parent == id => (existing.downloaded, existing.size_bytes),
            _ => (false, None),
        };
        tables.files.set(
            &filepath,
            FileRecord {
                filepath: filepath.clone(),
                parent: id.to_string(),
                kind: stub.kind,
                language: stub.language,
                resolution,
                size_bytes,
                downloaded,
            },
        );
        files.insert(filepath);
    }

    let record = ItemRecord {
        remote_id: id.to_string(),
        name: metadata.name.clone(),
        source_url: metadata.url.clone(),
        parent_id: parent.map(|p| p.id.to_string()),
        parent_type: if parent.is_some() {
            ParentType::Group
        } else {
            ParentType::None
        },
        path,
        files,
        available: metadata.available,
        last_checked: today,
    };
    debug!(
        "Planned item {} at {} with {} files",
        id,
        record.path,
        record.files.len()
    );
    tables.items.set(id, record.clone());
    Ok(record)
}

impl MirrorEngine<'_> {
    /// Plan every child in `child_urls` that is neither in `known` nor
    /// already mirrored elsewhere. Any metadata failure aborts the whole
    /// plan, leaving the caller free to drop the buffered writes.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn plan_children(
        &self,
        tables: &mut Tables<'_>,
        cache: &mut MetadataCache,
        parent: ParentRef<'_>,
        child_urls: &[String],
        known: &BTreeSet<String>,
        options: &OptionSet,
        today: NaiveDate,
    ) -> Result<Vec<ItemRecord>> {
        let mut planned = Vec::new();
        for url in child_urls {
            let id = match self.provider.derive_id(url) {
                Ok(id) => id,
                Err(e) => {
                    debug!("Skipping child link {}: {}", url, e);
                    continue;
                }
            };
            if known.contains(&id) {
                continue;
            }
            if let Some(existing) = tables.items.get(&id)? {
                if !existing.owned_by(parent.id) {
                    debug!(
                        "Item {} is already mirrored at {}, leaving it with its owner",
                        id, existing.path
                    );
                    continue;
                }
                debug!("Re-planning {} left over from an earlier {} run", id, parent.id);
            }
            let metadata = self.resolve_metadata(cache, &id, url)?;
            planned.push(plan_item(tables, &metadata, &id, Some(parent), options, today)?);
        }
        Ok(planned)
    }
}
