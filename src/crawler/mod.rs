//! Crawler module for following chains of pages
//!
//! This module contains the core traversal logic, including:
//! - HTTP fetching with retry and exponential backoff
//! - HTML parsing and next-link extraction
//! - The traversal engine that saves pages and records progress

mod engine;
mod fetcher;
mod parser;

pub use engine::{Advance, DoneReason, ProgressCallback, TraversalEngine, TraversalReport};
pub use fetcher::{build_http_client, retry_with_backoff, HttpFetcher, PageFetcher, RetryPolicy};
pub use parser::{parse_page, LinkExtractor, LinkMatcher, ParsedPage, SelectorMatcher};

use crate::config::Config;
use crate::storage::{open_store, JsonProgressStore};
use crate::ChainError;

/// Builds the engine used by the command-line tool
///
/// Wires an HTTP fetcher, the JSON progress table and the configured link
/// selectors together.
///
/// # Arguments
///
/// * `config` - A validated configuration
///
/// # Returns
///
/// * `Ok(TraversalEngine)` - Ready to run sources
/// * `Err(ChainError)` - The HTTP client or a selector could not be built
pub fn build_engine(
    config: &Config,
) -> Result<TraversalEngine<HttpFetcher, JsonProgressStore>, ChainError> {
    let fetcher = HttpFetcher::new(&config.fetch, &config.user_agent)?;
    let store = open_store(&config.output.state_file);
    let extractor = LinkExtractor::from_config(&config.links)?;

    Ok(TraversalEngine::new(fetcher, store, extractor))
}
