use super::models::*;
use crate::error::{Error, Result};
use crate::paths::PathLookup;
use rocksdb::{ColumnFamily, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

pub const STORE_DIR_NAME: &str = ".mirror.db";

/// RocksDB-backed store with one column family per table.
pub struct RecordStore {
    db: DB,
    path: PathBuf,
}

impl RecordStore {
    /// Open (or create) the store. Missing tables are created empty.
    pub fn open(path: &Path) -> Result<Self> {
        let mut db_options = Options::default();
        db_options.create_if_missing(true);
        db_options.create_missing_column_families(true);

        let names = TableKind::ALL.iter().map(|t| t.name());
        let db = DB::open_cf(&db_options, path, names)?;
        debug!("Opened record store at {}", path.display());
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn open_table<R: Record>(&self) -> Result<Table<'_, R>> {
        // Fail early if the family is missing rather than on first access.
        self.column_family(R::TABLE)?;
        Ok(Table {
            store: self,
            pending: BTreeMap::new(),
        })
    }

    /// All four tables, ready to be used together.
    pub fn open_all(&self) -> Result<Tables<'_>> {
        Ok(Tables {
            groups: self.open_table()?,
            items: self.open_table()?,
            paths: self.open_table()?,
            files: self.open_table()?,
        })
    }

    fn column_family(&self, table: TableKind) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(table.name())
            .ok_or_else(|| Error::Other(format!("record store has no '{}' table", table.name())))
    }
}

/// Typed view over one table.
///
/// Writes are buffered until [`Table::commit`]. Reads see buffered writes
/// first, then committed state.
pub struct Table<'s, R: Record> {
    store: &'s RecordStore,
    pending: BTreeMap<String, Option<R>>,
}

impl<'s, R: Record> Table<'s, R> {
    pub fn get(&self, key: &str) -> Result<Option<R>> {
        if let Some(buffered) = self.pending.get(key) {
            return Ok(buffered.clone());
        }
        let cf = self.store.column_family(R::TABLE)?;
        match self.store.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Full overwrite of the record at `key`.
    pub fn set(&mut self, key: &str, value: R) {
        trace!("{}: set {}", R::TABLE.name(), key);
        self.pending.insert(key.to_string(), Some(value));
    }

    /// No-op if absent.
    pub fn delete(&mut self, key: &str) {
        trace!("{}: delete {}", R::TABLE.name(), key);
        self.pending.insert(key.to_string(), None);
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Write every buffered change in one synced batch.
    pub fn commit(&mut self) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let cf = self.store.column_family(R::TABLE)?;
        let mut batch = WriteBatch::default();
        for (key, value) in &self.pending {
            match value {
                Some(record) => batch.put_cf(cf, key.as_bytes(), bincode::serialize(record)?),
                None => batch.delete_cf(cf, key.as_bytes()),
            }
        }

        let mut write_options = WriteOptions::default();
        write_options.set_sync(true);
        self.store.db.write_opt(batch, &write_options)?;

        let count = self.pending.len();
        self.pending.clear();
        debug!("{}: committed {} changes", R::TABLE.name(), count);
        Ok(count)
    }

    /// Every live record, buffered changes included, ordered by key.
    pub fn entries(&self) -> Result<Vec<(String, R)>> {
        let cf = self.store.column_family(R::TABLE)?;
        let mut merged: BTreeMap<String, R> = BTreeMap::new();

        for item in self.store.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let key = String::from_utf8_lossy(&key).into_owned();
            if self.pending.contains_key(&key) {
                continue;
            }
            merged.insert(key, bincode::deserialize(&value)?);
        }
        for (key, value) in &self.pending {
            if let Some(record) = value {
                merged.insert(key.clone(), record.clone());
            }
        }

        Ok(merged.into_iter().collect())
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries()?.into_iter().map(|(k, _)| k).collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.entries()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl PathLookup for Table<'_, PathRecord> {
    fn is_taken(&self, path: &str) -> Result<bool> {
        self.contains(path)
    }
}

/// The four tables of one mirror, committed children-first.
pub struct Tables<'s> {
    pub groups: Table<'s, GroupRecord>,
    pub items: Table<'s, ItemRecord>,
    pub paths: Table<'s, PathRecord>,
    pub files: Table<'s, FileRecord>,
}

impl Tables<'_> {
    /// Path, File, Item, then Group, so a crash never leaves a group
    /// pointing at a child that was not written.
    pub fn commit_all(&mut self) -> Result<usize> {
        let mut count = self.paths.commit()?;
        count += self.files.commit()?;
        count += self.items.commit()?;
        count += self.groups.commit()?;
        Ok(count)
    }
}
