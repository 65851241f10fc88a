use crate::state::ProgressRecord;
use crate::url::parse_chain_url;
use crate::UrlResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Stable identifier of a source, derived from its entry URL
///
/// The id is the hex SHA-256 of the parsed entry URL, so spelling variants
/// the URL parser treats as equal (host case, a missing root slash, a
/// fragment) map to the same id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Derives the id for an already parsed entry URL
    pub fn for_entry(entry_url: &Url) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(entry_url.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Wraps an id typed by an operator or read from the table
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters, enough to tell sources apart in listings
    pub fn short(&self) -> &str {
        self.0
            .char_indices()
            .nth(12)
            .map_or(&self.0[..], |(end, _)| &self.0[..end])
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One logical multi-page document being downloaded
#[derive(Debug, Clone)]
pub struct Source {
    id: SourceId,
    entry_url: Url,
    output_location: PathBuf,
}

impl Source {
    /// Creates a source from its entry URL and requested output directory
    ///
    /// The output directory is only a request: once a progress record exists,
    /// the location stored in it wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use chapter_chain::Source;
    ///
    /// let a = Source::new("https://example.com/book/1", "novels").unwrap();
    /// let b = Source::new("https://EXAMPLE.com/book/1#top", "elsewhere").unwrap();
    /// assert_eq!(a.id(), b.id());
    /// ```
    pub fn new(entry_url: &str, output_location: impl Into<PathBuf>) -> UrlResult<Self> {
        let entry_url = parse_chain_url(entry_url)?;
        Ok(Self {
            id: SourceId::for_entry(&entry_url),
            entry_url,
            output_location: output_location.into(),
        })
    }

    /// Rebuilds the source behind a stored record, keeping its stored id
    ///
    /// Records written without an entry URL fall back to their cursor for
    /// the URL; the id still comes from the table key so the same record is
    /// updated on resume.
    pub fn from_record(
        id: SourceId,
        record: &ProgressRecord,
        default_output: impl Into<PathBuf>,
    ) -> UrlResult<Self> {
        let entry = if record.entry_url.trim().is_empty() {
            record.cursor.as_deref().unwrap_or_default()
        } else {
            record.entry_url.as_str()
        };

        Ok(Self {
            id,
            entry_url: parse_chain_url(entry)?,
            output_location: record
                .output_location
                .clone()
                .unwrap_or_else(|| default_output.into()),
        })
    }

    pub fn id(&self) -> &SourceId {
        &self.id
    }

    pub fn entry_url(&self) -> &Url {
        &self.entry_url
    }

    pub fn output_location(&self) -> &Path {
        &self.output_location
    }
}
