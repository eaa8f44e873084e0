use super::MirrorEngine;
use crate::error::Result;
use crate::model::{EntityKind, RemoteKind};
use crate::storage::models::ParentType;
use tracing::{info, warn};

/// Divergences between the config document, the record store and disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// In the config document but without a record.
    pub missing_records: Vec<(RemoteKind, String)>,
    /// Top-level records the config document does not list.
    pub unlisted_records: Vec<(RemoteKind, String)>,
    /// Marked downloaded but absent on disk.
    pub missing_files: Vec<String>,
    pub checked_files: usize,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.missing_records.is_empty()
            && self.unlisted_records.is_empty()
            && self.missing_files.is_empty()
    }
}

impl MirrorEngine<'_> {
    /// Report only. Never repairs, and never clears a `downloaded` flag.
    pub fn verify(&self) -> Result<VerifyReport> {
        let session = self.open_session()?;
        let tables = session.store.open_all()?;
        let mut report = VerifyReport::default();

        for (kind, id, _) in session.config.entities() {
            let present = match kind.entity_kind() {
                EntityKind::Group(_) => tables.groups.contains(id)?,
                EntityKind::Item => tables.items.contains(id)?,
            };
            if !present {
                warn!("{} {} is in the config but has no record", kind, id);
                report.missing_records.push((kind, id.clone()));
            }
        }

        for (id, group) in tables.groups.entries()? {
            let kind = RemoteKind::from(group.kind);
            if !session.config.entity_exists(kind, &id) {
                warn!("{} {} has a record but is not in the config", kind, id);
                report.unlisted_records.push((kind, id));
            }
        }
        for (id, item) in tables.items.entries()? {
            if item.parent_type == ParentType::None
                && !session.config.entity_exists(RemoteKind::Single, &id)
            {
                warn!("single {} has a record but is not in the config", id);
                report.unlisted_records.push((RemoteKind::Single, id));
            }
        }

        for (filepath, file) in tables.files.entries()? {
            if !file.downloaded {
                continue;
            }
            report.checked_files += 1;
            if !self.root.join(&filepath).is_file() {
                warn!("{} is marked downloaded but missing", filepath);
                report.missing_files.push(filepath);
            }
        }

        info!(
            "Verified {} downloaded files: {} missing, {} config/record mismatches",
            report.checked_files,
            report.missing_files.len(),
            report.missing_records.len() + report.unlisted_records.len()
        );
        Ok(report)
    }
}
