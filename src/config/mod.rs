//! Configuration module for Chapter-Chain
//!
//! This module handles loading, parsing, and validating the optional TOML
//! configuration file. Without a file, [`Config::default`] applies.
//!
//! # Example
//!
//! ```no_run
//! use chapter_chain::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("chapter-chain.toml")).unwrap();
//! println!("Attempts per page: {}", config.fetch.max_attempts);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, FetchConfig, LinksConfig, OutputConfig, UserAgentConfig, DEFAULT_NEXT_SELECTORS,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;
