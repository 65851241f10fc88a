//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the engine, including:
//! - Building the HTTP client with the configured user agent and timeouts
//! - GET requests for chapter pages
//! - Retry with exponential backoff for transient failures

use crate::config::{FetchConfig, UserAgentConfig};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

/// Something that can fetch the raw content of a page
///
/// The engine only depends on this trait; [`HttpFetcher`] is the network
/// implementation.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches `url` and returns the response body as text
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// Attempt budget and backoff schedule for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Delay after the first failed attempt; doubles after each later one
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay to wait after the failed attempt number `attempt` (zero-based)
    ///
    /// With a one second base, attempts 0, 1, 2 wait 1, 2 and 4 seconds.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.backoff_base_ms),
        )
    }
}

/// Runs `attempt_fn` until it succeeds or the policy's budget is spent
///
/// Every error is treated as transient. A warning is logged before each
/// retry and an error once the budget is exhausted; the final error carries
/// the cause of the last attempt.
///
/// # Arguments
///
/// * `policy` - Attempt budget and backoff schedule
/// * `url` - The URL being fetched, for logs and the returned error
/// * `attempt_fn` - Performs one attempt; receives the zero-based attempt number
pub async fn retry_with_backoff<T, E, F, Fut>(
    policy: &RetryPolicy,
    url: &str,
    mut attempt_fn: F,
) -> Result<T, FetchError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    loop {
        match attempt_fn(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt + 1 < policy.max_attempts => {
                let wait = policy.backoff_delay(attempt);
                warn!(
                    "Retrying ({}/{}) {} in {:?}: {}",
                    attempt + 1,
                    policy.max_attempts,
                    url,
                    wait,
                    e
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                error!("Failed to fetch {}: {}", url, e);
                return Err(FetchError {
                    url: url.to_string(),
                    attempts: attempt + 1,
                    last_cause: e.to_string(),
                });
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `fetch` - Timeouts for each request
/// * `user_agent` - The User-Agent header to send
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use chapter_chain::config::{FetchConfig, UserAgentConfig};
/// use chapter_chain::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default(), &UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    fetch: &FetchConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header.as_str())
        .timeout(Duration::from_secs(fetch.timeout_secs))
        .connect_timeout(Duration::from_secs(fetch.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages over HTTP with retry and backoff
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Creates a fetcher from configuration
    pub fn new(fetch: &FetchConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(fetch, user_agent)?,
            policy: RetryPolicy::from(fetch),
        })
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// One GET; non-success statuses count as failures
    async fn fetch_once(&self, url: &Url) -> Result<String, reqwest::Error> {
        let response = self.client.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        response.text().await
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        debug!("GET {}", url);
        retry_with_backoff(&self.policy, url.as_str(), |_| self.fetch_once(url)).await
    }
}
