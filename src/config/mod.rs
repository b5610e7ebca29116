//! Configuration module for Reddit-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! including the environment variables that may override individual settings.
//!
//! # Example
//!
//! ```no_run
//! use reddit_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Subreddits: {:?}", config.crawler.subreddits);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlMode, CrawlerConfig, OutputConfig, RedditConfig};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash,
    parse_subreddit_list,
};
pub use validation::validate;
