use crate::model::{FileKind, GroupKind};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The four logical tables of the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Group,
    Item,
    Path,
    File,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::Group,
        TableKind::Item,
        TableKind::Path,
        TableKind::File,
    ];

    /// Column family name.
    pub fn name(self) -> &'static str {
        match self {
            TableKind::Group => "group",
            TableKind::Item => "item",
            TableKind::Path => "path",
            TableKind::File => "file",
        }
    }
}

/// A value type stored in exactly one table.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const TABLE: TableKind;
}

/// A channel or playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub remote_id: String,
    pub kind: GroupKind,
    pub name: String,
    pub source_url: String,
    pub children: BTreeSet<String>,
    pub path: String,
    pub available: bool,
}

impl Record for GroupRecord {
    const TABLE: TableKind = TableKind::Group;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParentType {
    Group,
    None,
}

/// A single media unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub remote_id: String,
    pub name: String,
    pub source_url: String,
    pub parent_id: Option<String>,
    pub parent_type: ParentType,
    pub path: String,
    pub files: BTreeSet<String>,
    pub available: bool,
    pub last_checked: NaiveDate,
}

impl ItemRecord {
    pub fn owned_by(&self, group_id: &str) -> bool {
        self.parent_type == ParentType::Group && self.parent_id.as_deref() == Some(group_id)
    }
}

impl Record for ItemRecord {
    const TABLE: TableKind = TableKind::Item;
}

/// Owner of an allocated path. The path itself is the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    pub owner: String,
}

impl Record for PathRecord {
    const TABLE: TableKind = TableKind::Path;
}

/// One downloadable artifact of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub filepath: String,
    pub parent: String,
    pub kind: FileKind,
    pub language: Option<String>,
    pub resolution: Option<String>,
    pub size_bytes: Option<u64>,
    pub downloaded: bool,
}

impl Record for FileRecord {
    const TABLE: TableKind = TableKind::File;
}
