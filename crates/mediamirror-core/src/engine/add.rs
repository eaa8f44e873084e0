use super::plan::{self, ParentRef};
use super::sync::SyncReport;
use super::{MirrorEngine, Scope};
use crate::error::Result;
use crate::mirror_config::options::{OptionOverlay, OptionSet};
use crate::mirror_config::{effective_options, EntityEntry};
use crate::model::{EntityKind, RemoteKind};
use crate::paths::compute_path;
use crate::provider::{FileRequest, ItemRef, MetadataCache};
use crate::report::human_readable_size;
use crate::storage::models::{GroupRecord, ItemRecord};
use crate::storage::Tables;
use chrono::Local;
use std::collections::BTreeSet;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Nothing changed. The entity was tracked before this call.
    AlreadyTracked { kind: RemoteKind, id: String },
    /// The user declined the download prompt. Nothing was written.
    Cancelled,
    Added(AddReport),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddReport {
    pub kind: RemoteKind,
    pub id: String,
    pub name: String,
    pub path: String,
    pub items: usize,
    pub files: usize,
    pub estimated_bytes: u64,
    /// Present when the add went on to download.
    pub sync: Option<SyncReport>,
}

impl MirrorEngine<'_> {
    pub fn add(
        &self,
        url: &str,
        runtime: &OptionOverlay,
        cache: &mut MetadataCache,
    ) -> Result<AddOutcome> {
        // Phase 1: identify offline
        let (kind, id) = self.identify(url)?;
        let mut session = self.open_session()?;
        if session.config.entity_exists(kind, &id) {
            info!("{} {} is already tracked", kind, id);
            return Ok(AddOutcome::AlreadyTracked { kind, id });
        }
        let options = effective_options(&session.config, runtime)?;
        let mut tables = session.store.open_all()?;
        if kind == RemoteKind::Single {
            if let Some(existing) = tables.items.get(&id)? {
                if existing.parent_id.is_some() {
                    info!(
                        "{} is already mirrored at {} as part of a group",
                        id, existing.path
                    );
                    return Ok(AddOutcome::AlreadyTracked { kind, id });
                }
                info!("Records for {} exist without a config entry, re-adding", id);
            }
        }

        // Phase 2: resolve metadata
        info!("Fetching metadata for {}", url);
        let metadata = self.resolve_metadata(cache, &id, url)?;
        let today = Local::now().date_naive();

        // Phase 3: plan paths and files
        let (path, planned) = match kind.entity_kind() {
            EntityKind::Item => {
                let item = plan::plan_item(&mut tables, &metadata, &id, None, &options, today)?;
                (item.path.clone(), vec![item])
            }
            EntityKind::Group(group_kind) => {
                let candidate = compute_path(kind, None, &metadata.name);
                let path = plan::register_path(&mut tables.paths, &candidate, &id)?;
                let parent = ParentRef {
                    id: &id,
                    path: &path,
                };
                let children = self.plan_children(
                    &mut tables,
                    cache,
                    parent,
                    &metadata.children,
                    &BTreeSet::new(),
                    &options,
                    today,
                )?;
                tables.groups.set(
                    &id,
                    GroupRecord {
                        remote_id: id.clone(),
                        kind: group_kind,
                        name: metadata.name.clone(),
                        source_url: metadata.url.clone(),
                        children: children.iter().map(|c| c.remote_id.clone()).collect(),
                        path: path.clone(),
                        available: metadata.available,
                    },
                );
                (path, children)
            }
        };
        let file_count: usize = planned.iter().map(|item| item.files.len()).sum();
        self.reporter.on_plan_complete(planned.len(), file_count);
        info!(
            "Planned {} '{}' at {}: {} items, {} files",
            kind,
            metadata.name,
            path,
            planned.len(),
            file_count
        );

        // Phase 4: estimate, then confirm when a download follows
        let estimated_bytes = self.estimate(&tables, &planned, &options)?;
        info!("Estimated download size: {}", human_readable_size(estimated_bytes));
        if !options.force && !options.skips_download() {
            let prompt = format!(
                "Download {} files ({}) for {} '{}'?",
                file_count,
                human_readable_size(estimated_bytes),
                kind,
                metadata.name
            );
            if !self.confirm.confirm(&prompt)? {
                info!("Add of {} cancelled, nothing written", id);
                return Ok(AddOutcome::Cancelled);
            }
        }

        // Phase 5: records children-first, then the config entry. An add
        // interrupted in between is picked up again by re-running it.
        tables.commit_all()?;
        session.config.set_entity(
            kind,
            &id,
            EntityEntry {
                name: metadata.name.clone(),
                url: metadata.url.clone(),
                options: runtime.file_settings(),
            },
        );
        session.save_config()?;

        let sync = if options.skips_download() {
            None
        } else {
            Some(self.sync_in(&session, Scope::Entity(kind, &id), runtime)?)
        };

        Ok(AddOutcome::Added(AddReport {
            kind,
            id,
            name: metadata.name,
            path,
            items: planned.len(),
            files: file_count,
            estimated_bytes,
            sync,
        }))
    }

    /// Sum of the fetcher's estimates. Files it cannot size count as zero.
    fn estimate(
        &self,
        tables: &Tables<'_>,
        items: &[ItemRecord],
        options: &OptionSet,
    ) -> Result<u64> {
        let mut total = 0;
        for item in items {
            let item_ref = ItemRef {
                id: &item.remote_id,
                name: &item.name,
                url: &item.source_url,
            };
            for filepath in &item.files {
                let Some(file) = tables.files.get(filepath)? else {
                    continue;
                };
                let request = FileRequest {
                    kind: file.kind,
                    language: file.language.as_deref(),
                };
                match self.fetcher.estimate_size(&item_ref, &request, options) {
                    Ok(bytes) => total += bytes,
                    Err(e) => warn!("Could not estimate size of {}: {}", filepath, e),
                }
            }
        }
        Ok(total)
    }
}
