use crate::config::types::{
    Config, CrawlerConfig, IdentityConfig, JitterWindow, OutputConfig, SearchConfig, SiteConfig,
};
use crate::{ConfigError, ConfigResult};
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_search_config(&config.search)?;
    validate_crawler_config(&config.crawler)?;
    validate_identity_config(&config.identity)?;
    validate_site_config(&config.site)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_search_config(config: &SearchConfig) -> ConfigResult<()> {
    if config.description.trim().is_empty() && config.location.trim().is_empty() {
        return Err(ConfigError::Validation(
            "search description and location cannot both be empty".to_string(),
        ));
    }

    if config.batch_size < 1 || config.batch_size > 100 {
        return Err(ConfigError::Validation(format!(
            "batch-size must be between 1 and 100, got {}",
            config.batch_size
        )));
    }

    if config.max_rounds == Some(0) {
        return Err(ConfigError::Validation(
            "max-rounds must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    validate_window("retry-backoff", &config.retry_backoff)?;
    if let Some(window) = &config.challenge_backoff {
        validate_window("challenge-backoff", window)?;
    }
    validate_window("search-start-delay", &config.search_start_delay)?;
    validate_window("snippet-delay", &config.snippet_delay)?;
    validate_window("detail-delay", &config.detail_delay)?;

    Ok(())
}

fn validate_window(name: &str, window: &JitterWindow) -> ConfigResult<()> {
    if window.min_ms > window.max_ms {
        return Err(ConfigError::Validation(format!(
            "{} min-ms ({}) must not exceed max-ms ({})",
            name, window.min_ms, window.max_ms
        )));
    }
    Ok(())
}

fn validate_identity_config(config: &IdentityConfig) -> ConfigResult<()> {
    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents cannot contain empty entries".to_string(),
        ));
    }

    if config.headers.keys().any(|k| k.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "header names cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> ConfigResult<()> {
    let origin = Url::parse(&config.origin)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid origin '{}': {}", config.origin, e)))?;

    if origin.scheme() != "http" && origin.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "origin '{}' must use http or https",
            config.origin
        )));
    }

    if config.challenge_marker.is_empty() || config.end_of_results_marker.is_empty() {
        return Err(ConfigError::Validation(
            "site markers cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> ConfigResult<()> {
    if config.checkpoint_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "checkpoint-path cannot be empty".to_string(),
        ));
    }

    if config.output_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output-path cannot be empty".to_string(),
        ));
    }

    if config.checkpoint_path == config.output_path {
        return Err(ConfigError::Validation(
            "checkpoint-path and output-path must differ".to_string(),
        ));
    }

    Ok(())
}
