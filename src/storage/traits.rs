//! Storage traits and error types
//!
//! This module defines the trait interface for progress store backends and
//! associated error types.

use crate::state::{ProgressRecord, Source, SourceId};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to lock {path}: {source}")]
    Lock {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for progress store implementations
///
/// A store maps source ids to progress records. Implementations must make
/// every `save` durable before returning, since the engine calls it once per
/// page and relies on it to bound what a crash can lose.
pub trait ProgressStore {
    /// Loads the record for a source
    ///
    /// Returns a fresh record (empty visited set, cursor at the entry URL)
    /// when the source has no stored progress.
    fn load(&self, source: &Source) -> StorageResult<ProgressRecord>;

    /// Persists the record for a source, replacing any previous one
    fn save(&self, source: &Source, record: &ProgressRecord) -> StorageResult<()>;

    /// Removes the record for a source
    ///
    /// # Returns
    ///
    /// `true` if a record existed
    fn delete(&self, id: &SourceId) -> StorageResult<bool>;

    /// Lists every stored record, ordered by source id
    fn list_all(&self) -> StorageResult<Vec<(SourceId, ProgressRecord)>>;

    /// Removes every record whose chain is already complete
    ///
    /// # Returns
    ///
    /// The number of records removed
    fn purge_completed(&self) -> StorageResult<usize>;
}

impl<S: ProgressStore + ?Sized> ProgressStore for &S {
    fn load(&self, source: &Source) -> StorageResult<ProgressRecord> {
        (**self).load(source)
    }

    fn save(&self, source: &Source, record: &ProgressRecord) -> StorageResult<()> {
        (**self).save(source, record)
    }

    fn delete(&self, id: &SourceId) -> StorageResult<bool> {
        (**self).delete(id)
    }

    fn list_all(&self) -> StorageResult<Vec<(SourceId, ProgressRecord)>> {
        (**self).list_all()
    }

    fn purge_completed(&self) -> StorageResult<usize> {
        (**self).purge_completed()
    }
}

impl<S: ProgressStore + ?Sized> ProgressStore for Arc<S> {
    fn load(&self, source: &Source) -> StorageResult<ProgressRecord> {
        (**self).load(source)
    }

    fn save(&self, source: &Source, record: &ProgressRecord) -> StorageResult<()> {
        (**self).save(source, record)
    }

    fn delete(&self, id: &SourceId) -> StorageResult<bool> {
        (**self).delete(id)
    }

    fn list_all(&self) -> StorageResult<Vec<(SourceId, ProgressRecord)>> {
        (**self).list_all()
    }

    fn purge_completed(&self) -> StorageResult<usize> {
        (**self).purge_completed()
    }
}
