//! URL handling module for Chapter-Chain
//!
//! Parsing of entry and cursor URLs, and resolution of discovered links
//! against the page they were found on.

mod normalize;

pub use normalize::{parse_chain_url, resolve_link};
