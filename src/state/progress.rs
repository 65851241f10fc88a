use crate::state::Source;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Persisted traversal state for one source
///
/// Serialized as one value of the progress table. Every field defaults when
/// missing, and the key names written by older versions of the tool
/// (`processed`, `current_url`, `output_dir`, `entry_url`) are still read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// URLs already fetched and saved; only ever grows during a run
    #[serde(default, alias = "processed")]
    pub visited: BTreeSet<String>,

    /// URL to fetch next; `None` once the chain is complete
    #[serde(default, alias = "current_url")]
    pub cursor: Option<String>,

    /// Directory pages are written to, fixed at the first run
    #[serde(default, alias = "output_dir")]
    pub output_location: Option<PathBuf>,

    /// First URL of the chain
    #[serde(default, alias = "entry_url")]
    pub entry_url: String,

    /// Time of the last save
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Record for a source that has never been fetched
    pub fn fresh(source: &Source) -> Self {
        Self {
            visited: BTreeSet::new(),
            cursor: Some(source.entry_url().to_string()),
            output_location: None,
            entry_url: source.entry_url().to_string(),
            updated_at: None,
        }
    }

    /// Returns true if the chain has no page left to fetch
    pub fn is_complete(&self) -> bool {
        self.cursor.as_deref().map_or(true, |c| c.trim().is_empty())
    }

    pub fn has_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Adds a saved page to the visited set
    pub fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    /// Moves the cursor and stamps the record
    pub fn advance(&mut self, next: Option<String>) {
        self.cursor = next;
        self.updated_at = Some(Utc::now());
    }
}
