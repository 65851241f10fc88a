//! Traversal engine - follows one chain from its cursor to its end
//!
//! This module contains the loop that coordinates fetching, saving and link
//! following for a single source:
//! - Loading the resume point from the progress store
//! - Fetching and writing each page
//! - Finding the next link and persisting the advanced cursor
//! - Deciding when the chain has ended

use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::{parse_page, LinkExtractor};
use crate::output::{sanitize_title, ChapterWriter};
use crate::state::{ProgressRecord, Source, SourceId, TraversalState};
use crate::storage::ProgressStore;
use crate::url::parse_chain_url;
use crate::ChainError;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Called after every saved page with the count saved so far in this run
pub type ProgressCallback = Arc<dyn Fn(usize, &Url) + Send + Sync>;

/// Why a chain ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoneReason {
    /// The last saved page has no next link
    NoNextLink,

    /// The next link points at a page already saved
    Cycle(String),

    /// The cursor itself was already visited, so nothing was fetched
    AlreadyVisited(String),

    /// The stored record had no cursor left
    AlreadyComplete,
}

/// Outcome of processing one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Fetch this URL next
    Continue(Url),

    /// The chain is finished
    Done(DoneReason),
}

/// Summary of a run that reached the end of its chain
#[derive(Debug, Clone)]
pub struct TraversalReport {
    pub source_id: SourceId,
    pub pages_saved: usize,
    pub output_location: PathBuf,
    pub last_url: Option<String>,
    pub reason: DoneReason,
}

/// In-memory working copy of one source's progress during a run
struct ChainRun<'a> {
    source: &'a Source,
    record: ProgressRecord,
    state: TraversalState,
    writer: ChapterWriter,
    pages_saved: usize,
    last_url: Option<String>,
}

impl ChainRun<'_> {
    fn transition(&mut self, to: TraversalState) -> Result<(), ChainError> {
        if !self.state.can_transition_to(to) {
            return Err(ChainError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        debug!("{}: {} -> {}", self.source.id().short(), self.state, to);
        self.state = to;
        Ok(())
    }

    fn report(&self, reason: DoneReason) -> TraversalReport {
        TraversalReport {
            source_id: self.source.id().clone(),
            pages_saved: self.pages_saved,
            output_location: self.writer.dir().to_path_buf(),
            last_url: self.last_url.clone(),
            reason,
        }
    }
}

/// Follows chains of pages, one source at a time
///
/// The engine is generic over how pages are fetched and where progress is
/// kept, so both can be swapped out in tests.
pub struct TraversalEngine<F, S> {
    fetcher: F,
    store: S,
    extractor: LinkExtractor,
    progress_callback: Option<ProgressCallback>,
}

impl<F: PageFetcher, S: ProgressStore> TraversalEngine<F, S> {
    pub fn new(fetcher: F, store: S, extractor: LinkExtractor) -> Self {
        Self {
            fetcher,
            store,
            extractor,
            progress_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs a source's chain until it ends or a page cannot be fetched
    ///
    /// Progress is saved after every page. When the chain ends the source's
    /// record is deleted; when the run fails the record is left as it was
    /// after the last saved page, and the next run resumes from there.
    ///
    /// # Returns
    ///
    /// * `Ok(TraversalReport)` - The chain ended (no next link, or a cycle)
    /// * `Err(ChainError)` - The run was aborted; progress is kept
    pub async fn run(&self, source: &Source) -> Result<TraversalReport, ChainError> {
        let mut run = self.begin(source)?;

        match self.drive(&mut run).await {
            Ok(report) => Ok(report),
            Err(e) => {
                if run.state.is_active() {
                    run.state = TraversalState::Aborted;
                }
                error!(
                    "Aborted {} after {} page(s) this run; progress kept for resume: {}",
                    source.entry_url(),
                    run.pages_saved,
                    e
                );
                Err(e)
            }
        }
    }

    /// Loads the working copy and settles the output location
    fn begin<'a>(&self, source: &'a Source) -> Result<ChainRun<'a>, ChainError> {
        let mut record = self.store.load(source)?;

        let output_location = match record.output_location.as_ref() {
            Some(stored) if !stored.as_os_str().is_empty() => {
                if stored != source.output_location() {
                    info!(
                        "Using recorded output location {} for {}",
                        stored.display(),
                        source.entry_url()
                    );
                }
                stored.clone()
            }
            _ => source.output_location().to_path_buf(),
        };
        record.output_location = Some(output_location.clone());

        Ok(ChainRun {
            source,
            record,
            state: TraversalState::Idle,
            writer: ChapterWriter::new(output_location),
            pages_saved: 0,
            last_url: None,
        })
    }

    async fn drive(&self, run: &mut ChainRun<'_>) -> Result<TraversalReport, ChainError> {
        let source = run.source;

        let stored = match run.record.cursor.as_deref().map(str::trim) {
            Some(cursor) if !cursor.is_empty() => Some(parse_chain_url(cursor)),
            _ => None,
        };
        let mut cursor = match stored {
            Some(Ok(cursor)) => cursor,
            Some(Err(e)) => {
                // Position unknown; start the chain over
                warn!(
                    "stored cursor for {} is unusable ({}), restarting from the entry URL",
                    source.id().short(),
                    e
                );
                run.record.visited.clear();
                run.record.cursor = Some(source.entry_url().to_string());
                source.entry_url().clone()
            }
            None => return self.finish(run, DoneReason::AlreadyComplete),
        };

        if run.record.visited.is_empty() {
            info!("Starting {} -> {}", source.entry_url(), run.writer.dir().display());
        } else {
            info!(
                "Resuming {} at {} ({} page(s) already saved)",
                source.entry_url(),
                cursor,
                run.record.visited.len()
            );
        }

        // The record exists from the first fetch attempt on
        self.store.save(source, &run.record)?;
        run.transition(TraversalState::Fetching)?;

        loop {
            match self.advance(run, &cursor).await? {
                Advance::Continue(next) => {
                    cursor = next;
                    run.transition(TraversalState::Fetching)?;
                }
                Advance::Done(reason) => return self.finish(run, reason),
            }
        }
    }

    /// Processes the page under `cursor`: fetch, save, find next, persist
    async fn advance(&self, run: &mut ChainRun<'_>, cursor: &Url) -> Result<Advance, ChainError> {
        let key = cursor.as_str();

        if run.record.has_visited(key) {
            debug!("{} already saved, not fetching it again", key);
            return Ok(Advance::Done(DoneReason::AlreadyVisited(key.to_string())));
        }

        let body = self.fetcher.fetch(cursor).await?;

        run.transition(TraversalState::Saving)?;
        let page = parse_page(&body, cursor, &self.extractor);
        let title = sanitize_title(page.title.as_deref());
        let path = run.writer.write(&title, &body)?;
        run.record.mark_visited(key);
        run.pages_saved += 1;
        run.last_url = Some(key.to_string());
        info!("Saved {} -> {}", key, path.display());

        if let Some(callback) = &self.progress_callback {
            callback(run.pages_saved, cursor);
        }

        run.transition(TraversalState::Advancing)?;
        let next = page.next;
        run.record.advance(next.as_ref().map(Url::to_string));
        self.store.save(run.source, &run.record)?;

        Ok(match next {
            None => Advance::Done(DoneReason::NoNextLink),
            Some(next) if run.record.has_visited(next.as_str()) => {
                Advance::Done(DoneReason::Cycle(next.to_string()))
            }
            Some(next) => Advance::Continue(next),
        })
    }

    fn finish(
        &self,
        run: &mut ChainRun<'_>,
        reason: DoneReason,
    ) -> Result<TraversalReport, ChainError> {
        run.transition(TraversalState::Done)?;
        self.store.delete(run.source.id())?;

        match &reason {
            DoneReason::NoNextLink => info!("No next link found, chain complete"),
            DoneReason::Cycle(url) => info!("Next link {} was already saved, chain complete", url),
            DoneReason::AlreadyVisited(url) => {
                info!("Cursor {} was already saved, chain complete", url)
            }
            DoneReason::AlreadyComplete => info!("Nothing left to fetch"),
        }

        Ok(run.report(reason))
    }
}
