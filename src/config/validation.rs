use crate::config::types::{Config, FetchConfig, LinksConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use scraper::Selector;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetch_config(&config.fetch)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_links_config(&config.links)?;
    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be greater than 0".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 || config.connect_timeout_secs > config.timeout_secs {
        return Err(ConfigError::Validation(format!(
            "connect_timeout_secs must be between 1 and timeout_secs ({}), got {}",
            config.timeout_secs, config.connect_timeout_secs
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.header.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent header cannot be empty".to_string(),
        ));
    }

    // Header values cannot carry control characters
    if config.header.chars().any(|c| c.is_control()) {
        return Err(ConfigError::Validation(
            "user-agent header cannot contain control characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.state_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "state_file cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the next-link selector list
fn validate_links_config(config: &LinksConfig) -> Result<(), ConfigError> {
    if config.next_selectors.is_empty() {
        return Err(ConfigError::Validation(
            "at least one next-link selector is required".to_string(),
        ));
    }

    for selector in &config.next_selectors {
        validate_selector(selector)?;
    }

    Ok(())
}

/// Checks that a selector parses as CSS
pub(crate) fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })
}
