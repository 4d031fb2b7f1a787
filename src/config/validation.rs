use crate::config::types::{Config, CrawlerConfig, OutputConfig, ProxyConfig, SearchConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_search_config(&config.search)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_proxy_config(&config.proxy)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the target site settings
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", config.base_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    if config.search_path.is_empty() {
        return Err(ConfigError::Validation(
            "search-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler pacing and limits
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_listings == Some(0) {
        return Err(ConfigError::Validation(
            "max-listings must be >= 1 when set".to_string(),
        ));
    }

    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min-delay-ms ({}) must not exceed max-delay-ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.request_timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request and connect timeouts must be >= 1s".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    if config.backoff_base_ms > config.backoff_max_ms {
        return Err(ConfigError::Validation(format!(
            "backoff-base-ms ({}) must not exceed backoff-max-ms ({})",
            config.backoff_base_ms, config.backoff_max_ms
        )));
    }

    if config.min_delay_ms < 100 {
        tracing::warn!(
            "min-delay-ms is {}ms; very short delays are likely to get the crawler blocked",
            config.min_delay_ms
        );
    }

    Ok(())
}

/// Validates the user agent pool
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if let Some(agent) = config.agents.iter().find(|a| a.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "user agent strings cannot be blank, got {:?}",
            agent
        )));
    }

    if let Some(agent) = config.agents.iter().find(|a| a.contains(['\r', '\n'])) {
        return Err(ConfigError::Validation(format!(
            "user agent strings cannot contain line breaks, got {:?}",
            agent
        )));
    }

    Ok(())
}

/// Validates the proxy URL, if any
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if let Some(proxy) = &config.url {
        let url = Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy url: {}", e)))?;

        if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
            return Err(ConfigError::InvalidUrl(format!(
                "Unsupported proxy scheme '{}'",
                url.scheme()
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.prefix.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output prefix cannot be empty".to_string(),
        ));
    }

    if config.prefix.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "output prefix must be a file name, got '{}'",
            config.prefix
        )));
    }

    if config.formats.is_empty() {
        return Err(ConfigError::Validation(
            "at least one output format is required".to_string(),
        ));
    }

    Ok(())
}
