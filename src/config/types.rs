use serde::Deserialize;
use std::path::PathBuf;

/// Browser-like identification sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Next-link selectors tried in order when none are configured
pub const DEFAULT_NEXT_SELECTORS: &[&str] = &["a[rel=next]", "#next_chap", ".next"];

/// Main configuration structure for Chapter-Chain
///
/// Every section is optional in the TOML file; missing keys fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub links: LinksConfig,
}

/// Network fetch behavior
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Total time allowed for one request, in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Time allowed for establishing the connection, in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Attempts per page before the run is aborted
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// First backoff delay in milliseconds; doubles on every retry
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Value of the User-Agent header
    #[serde(default = "default_user_agent")]
    pub header: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            header: default_user_agent(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory new downloads are written to
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    /// Path to the shared progress table
    #[serde(rename = "state-file", default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            state_file: default_state_file(),
        }
    }
}

/// Next-link discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LinksConfig {
    /// CSS selectors in priority order
    #[serde(rename = "next-selectors", default = "default_next_selectors")]
    pub next_selectors: Vec<String>,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            next_selectors: default_next_selectors(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("novels")
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".novel_downloads_state.json")
}

fn default_next_selectors() -> Vec<String> {
    DEFAULT_NEXT_SELECTORS.iter().map(|s| s.to_string()).collect()
}
