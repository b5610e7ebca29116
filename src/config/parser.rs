use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// Environment overrides (`REDDIT_ACCESS_TOKEN`, `REDDIT_USER_AGENT`,
/// `SUBREDDITS`, `RATE_LIMIT`, `DATABASE_PATH`) are applied after parsing and
/// before validation.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;

    validate(&config)?;

    Ok(config)
}

/// Applies environment overrides to a parsed configuration
///
/// `lookup` resolves a variable name to its value. Unset variables leave the
/// file value untouched.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = lookup("REDDIT_ACCESS_TOKEN") {
        config.reddit.access_token = Some(token);
    }

    if let Some(user_agent) = lookup("REDDIT_USER_AGENT") {
        config.reddit.user_agent = user_agent;
    }

    if let Some(list) = lookup("SUBREDDITS") {
        config.crawler.subreddits = parse_subreddit_list(&list);
    }

    if let Some(value) = lookup("RATE_LIMIT") {
        config.crawler.rate_limit =
            value
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::Environment {
                    name: "RATE_LIMIT".to_string(),
                    message: format!("expected whole seconds, got '{}': {}", value, e),
                })?;
    }

    if let Some(path) = lookup("DATABASE_PATH") {
        config.output.database_path = path;
    }

    Ok(())
}

/// Splits a comma-separated subreddit list, trimming entries and dropping empties
pub fn parse_subreddit_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Recorded on every crawl-run record so passes can be traced back to the
/// configuration that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
