//! Chapter-Chain: a resumable fetcher for serialized web documents
//!
//! This crate follows a chain of "next" links from an entry page, saving every
//! page to disk and recording progress so an interrupted download can resume
//! where it stopped.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Chapter-Chain operations
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::TraversalState,
        to: state::TraversalState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    OperatorInput(String),
}

/// A fetch that failed on every attempt of its retry budget
#[derive(Debug, Clone, Error)]
#[error("Failed to fetch {url} after {attempts} attempt(s): {last_cause}")]
pub struct FetchError {
    pub url: String,
    pub attempts: u32,
    pub last_cause: String,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid link selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Chapter-Chain operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{HttpFetcher, LinkExtractor, TraversalEngine};
pub use state::{ProgressRecord, Source, SourceId, TraversalState};
pub use storage::{JsonProgressStore, ProgressStore};
