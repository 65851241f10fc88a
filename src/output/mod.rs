//! Output module for chapter files and operator listings
//!
//! This module handles:
//! - Naming and writing fetched chapter pages
//! - Formatting the in-progress source listing
//! - Parsing the operator's resume choice

mod chapter;
mod listing;

pub use chapter::{sanitize_title, ChapterWriter, UNTITLED};
pub use listing::{format_source_listing, parse_selection};
