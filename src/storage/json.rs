//! JSON file storage implementation
//!
//! All sources share one table file. Every mutation is a full
//! read-modify-write of that file while holding an exclusive lock on a
//! sibling `.lock` file, and the new table replaces the old one through a
//! temp file and rename so readers never observe a half-written table.

use crate::state::{ProgressRecord, Source, SourceId};
use crate::storage::traits::{ProgressStore, StorageError, StorageResult};
use crate::url::parse_chain_url;
use fs2::FileExt;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

type ProgressTable = BTreeMap<SourceId, ProgressRecord>;

/// Progress store backed by a single JSON object file
#[derive(Debug, Clone)]
pub struct JsonProgressStore {
    path: PathBuf,
}

impl JsonProgressStore {
    /// Creates a store for the table at `path`
    ///
    /// Nothing is touched on disk until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the table file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("progress"));
        name.push(suffix);
        self.path.with_file_name(name)
    }

    /// Opens the lock file and takes the requested lock on it
    ///
    /// The lock is released when the returned handle is dropped.
    fn lock(&self, exclusive: bool) -> StorageResult<File> {
        let lock_path = self.sibling(".lock");
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)?;

        let locked = if exclusive {
            FileExt::lock_exclusive(&file)
        } else {
            FileExt::lock_shared(&file)
        };
        locked.map_err(|source| StorageError::Lock {
            path: lock_path,
            source,
        })?;

        Ok(file)
    }

    /// Reads the whole table
    ///
    /// A missing or empty file is an empty table. A file that is not a JSON
    /// object is logged and also treated as empty; individual entries that do
    /// not decode are skipped.
    fn read_table(&self) -> StorageResult<ProgressTable> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(ProgressTable::new()),
            Err(err) => return Err(err.into()),
        };

        if content.trim().is_empty() {
            return Ok(ProgressTable::new());
        }

        let entries: Map<String, Value> = match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "progress table at {} is unreadable, treating it as empty: {err}",
                    self.path.display()
                );
                return Ok(ProgressTable::new());
            }
        };

        let mut table = ProgressTable::new();
        for (id, value) in entries {
            match serde_json::from_value::<ProgressRecord>(value) {
                Ok(record) => {
                    table.insert(SourceId::new(id), record);
                }
                Err(err) => warn!("skipping malformed progress record {id}: {err}"),
            }
        }

        Ok(table)
    }

    fn write_table(&self, table: &ProgressTable) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.sibling(".tmp");
        let tmp = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;

        let mut buf = BufWriter::new(tmp);
        serde_json::to_writer(&mut buf, table)?;
        buf.flush()?;
        let file = buf.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }

        #[cfg(unix)]
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    /// Runs `f` on the table under the exclusive lock
    ///
    /// The table is written back only if `f` changed it.
    fn update<T>(&self, f: impl FnOnce(&mut ProgressTable) -> T) -> StorageResult<T> {
        let _lock = self.lock(true)?;
        let mut table = self.read_table()?;
        let before = table.clone();

        let result = f(&mut table);

        if table != before {
            self.write_table(&table)?;
        }

        Ok(result)
    }

    fn snapshot(&self) -> StorageResult<ProgressTable> {
        if !self.path.exists() {
            return Ok(ProgressTable::new());
        }
        let _lock = self.lock(false)?;
        self.read_table()
    }
}

/// Finds a record stored for the same entry URL under a different key
///
/// Tables written by older versions of the tool key sources by another hash
/// of the entry URL. Such a record is picked up on load and rekeyed on the
/// next save.
fn legacy_key(table: &ProgressTable, source: &Source) -> Option<SourceId> {
    table
        .iter()
        .filter(|(id, _)| *id != source.id())
        .find(|(_, record)| {
            parse_chain_url(&record.entry_url).map_or(false, |url| &url == source.entry_url())
        })
        .map(|(id, _)| id.clone())
}

impl ProgressStore for JsonProgressStore {
    fn load(&self, source: &Source) -> StorageResult<ProgressRecord> {
        let mut table = self.snapshot()?;
        let stored = match table.remove(source.id()) {
            Some(record) => Some(record),
            None => legacy_key(&table, source).and_then(|key| {
                debug!("found progress for {} under older key {}", source.entry_url(), key);
                table.remove(&key)
            }),
        };

        match stored {
            Some(mut record) => {
                if record.entry_url.is_empty() {
                    record.entry_url = source.entry_url().to_string();
                }
                debug!(
                    "loaded progress for {}: {} visited, cursor {:?}",
                    source.id().short(),
                    record.visited.len(),
                    record.cursor
                );
                Ok(record)
            }
            None => Ok(ProgressRecord::fresh(source)),
        }
    }

    fn save(&self, source: &Source, record: &ProgressRecord) -> StorageResult<()> {
        let mut record = record.clone();
        if record.entry_url.is_empty() {
            record.entry_url = source.entry_url().to_string();
        }

        self.update(|table| {
            if let Some(key) = legacy_key(table, source) {
                table.remove(&key);
            }
            table.insert(source.id().clone(), record);
        })
    }

    fn delete(&self, id: &SourceId) -> StorageResult<bool> {
        self.update(|table| table.remove(id).is_some())
    }

    fn list_all(&self) -> StorageResult<Vec<(SourceId, ProgressRecord)>> {
        Ok(self.snapshot()?.into_iter().collect())
    }

    fn purge_completed(&self) -> StorageResult<usize> {
        self.update(|table| {
            let before = table.len();
            table.retain(|_, record| !record.is_complete());
            before - table.len()
        })
    }
}
