//! Storage module for persisting chain progress
//!
//! This module owns the progress table shared by every source:
//! - Loading the resume point of a source
//! - Saving progress after every page
//! - Listing, deleting and purging records for the operator

mod json;
mod traits;

pub use json::JsonProgressStore;
pub use traits::{ProgressStore, StorageError, StorageResult};

use std::path::Path;

/// Opens the progress table at `path`
///
/// # Arguments
///
/// * `path` - Path to the JSON table file; it need not exist yet
pub fn open_store(path: &Path) -> JsonProgressStore {
    JsonProgressStore::new(path)
}
