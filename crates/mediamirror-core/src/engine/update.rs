use super::plan::ParentRef;
use super::sync::SyncReport;
use super::{MirrorEngine, Scope, Session};
use crate::error::{Error, Result};
use crate::mirror_config::options::OptionOverlay;
use crate::mirror_config::{effective_options, effective_options_for, CONFIG_FILE_NAME};
use crate::model::RemoteKind;
use crate::provider::MetadataCache;
use chrono::Local;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    NotTracked { kind: RemoteKind, id: String },
    /// Singles have no children to refresh.
    NotAGroup { id: String },
    Updated(UpdateReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    pub groups: Vec<GroupUpdate>,
    /// Groups that could not be refreshed, with the reason.
    pub failed: Vec<(String, String)>,
    pub sync: Option<SyncReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupUpdate {
    pub kind: RemoteKind,
    pub id: String,
    pub name: String,
    /// Newly discovered children, in listing order.
    pub added: Vec<String>,
}

impl MirrorEngine<'_> {
    /// Pick up new children of one group, or of every tracked group when
    /// `url` is `None`. Existing children are never touched.
    pub fn update(
        &self,
        url: Option<&str>,
        runtime: &OptionOverlay,
        cache: &mut MetadataCache,
    ) -> Result<UpdateOutcome> {
        let target = url.map(|url| self.identify(url)).transpose()?;
        if let Some((RemoteKind::Single, id)) = &target {
            info!("{} is a single item and has nothing to update", id);
            return Ok(UpdateOutcome::NotAGroup { id: id.clone() });
        }
        let session = self.open_session()?;
        let options = effective_options(&session.config, runtime)?;
        let mut report = UpdateReport::default();

        match &target {
            Some((kind, id)) => {
                if !session.config.entity_exists(*kind, id) {
                    info!("{} {} is not tracked", kind, id);
                    return Ok(UpdateOutcome::NotTracked {
                        kind: *kind,
                        id: id.clone(),
                    });
                }
                report
                    .groups
                    .push(self.update_group(&session, *kind, id, runtime, cache)?);
            }
            None => {
                let groups: Vec<(RemoteKind, String)> = session
                    .config
                    .entities()
                    .filter(|(kind, _, _)| *kind != RemoteKind::Single)
                    .map(|(kind, id, _)| (kind, id.clone()))
                    .collect();
                info!("Updating {} tracked groups", groups.len());
                for (kind, id) in groups {
                    match self.update_group(&session, kind, &id, runtime, cache) {
                        Ok(update) => report.groups.push(update),
                        Err(e) => {
                            warn!("Update of {} {} failed: {}", kind, id, e);
                            report.failed.push((id, e.to_string()));
                        }
                    }
                }
            }
        }

        if options.sync {
            let scope = match &target {
                Some((kind, id)) => Scope::Entity(*kind, id),
                None => Scope::All,
            };
            report.sync = Some(self.sync_in(&session, scope, runtime)?);
        }
        Ok(UpdateOutcome::Updated(report))
    }

    /// Refresh one group and commit it on its own.
    fn update_group(
        &self,
        session: &Session,
        kind: RemoteKind,
        id: &str,
        runtime: &OptionOverlay,
        cache: &mut MetadataCache,
    ) -> Result<GroupUpdate> {
        let options = effective_options_for(&session.config, kind, id, runtime)?;
        let mut tables = session.store.open_all()?;
        let Some(mut group) = tables.groups.get(id)? else {
            return Err(Error::Other(format!(
                "{} {} is listed in {} but has no record",
                kind, id, CONFIG_FILE_NAME
            )));
        };

        let metadata = self.resolve_metadata(cache, id, &group.source_url)?;
        let parent = ParentRef {
            id,
            path: &group.path,
        };
        let added = self.plan_children(
            &mut tables,
            cache,
            parent,
            &metadata.children,
            &group.children,
            &options,
            Local::now().date_naive(),
        )?;

        group
            .children
            .extend(added.iter().map(|item| item.remote_id.clone()));
        group.available = metadata.available;
        let name = group.name.clone();
        tables.groups.set(id, group);
        tables.commit_all()?;

        info!("{} '{}': {} new items", kind, name, added.len());
        Ok(GroupUpdate {
            kind,
            id: id.to_string(),
            name,
            added: added.into_iter().map(|item| item.remote_id).collect(),
        })
    }
}
