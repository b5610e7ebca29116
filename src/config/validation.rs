use crate::config::types::{Config, CrawlerConfig, OutputConfig, RedditConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_reddit_config(&config.reddit)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates listing API configuration
fn validate_reddit_config(config: &RedditConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page-size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    Ok(())
}

/// Validates crawl configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.subreddits.is_empty() {
        return Err(ConfigError::Validation(
            "at least one subreddit must be configured".to_string(),
        ));
    }

    for name in &config.subreddits {
        validate_subreddit_name(name)?;
    }

    if config.mode().is_none() {
        return Err(ConfigError::Validation(
            "crawl-posts and crawl-comments cannot both be disabled".to_string(),
        ));
    }

    if config.flush_every < 1 {
        return Err(ConfigError::Validation(format!(
            "flush-every must be >= 1, got {}",
            config.flush_every
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a subreddit name: 2 to 21 characters of letters, digits and underscores
pub(crate) fn validate_subreddit_name(name: &str) -> Result<(), ConfigError> {
    if name.len() < 2 || name.len() > 21 {
        return Err(ConfigError::InvalidSubreddit(format!(
            "'{}' must be between 2 and 21 characters",
            name
        )));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::InvalidSubreddit(format!(
            "'{}' may only contain letters, digits and underscores",
            name
        )));
    }

    Ok(())
}
