//! Reddit-Harvest: resumable subreddit ingestion
//!
//! This crate pages through a subreddit's newest-first listing, flattens each
//! post and its comments into tabular rows, and appends them to a SQLite table.
//! Repeated runs resume from the oldest timestamp already stored for a
//! subreddit instead of re-reading the whole listing.

pub mod config;
pub mod ingest;
pub mod model;
pub mod output;
pub mod source;
pub mod storage;

#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

/// Main error type for Reddit-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Listing source error: {0}")]
    Source(#[from] source::SourceError),

    #[error("Record sink error: {0}")]
    Sink(#[from] storage::StorageError),

    /// The resume boundary could not be read. Never treated as "no boundary".
    #[error("Failed to resolve resume boundary for r/{subreddit}: {source}")]
    Cursor {
        subreddit: String,
        source: storage::StorageError,
    },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
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

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid subreddit name: {0}")]
    InvalidSubreddit(String),

    #[error("Invalid value for environment variable {name}: {message}")]
    Environment { name: String, message: String },
}

/// Result type alias for Reddit-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use ingest::{harvest_partition, PassOutcome, PassReport, ResumeBoundary};
pub use model::{Comment, Post, Row};
pub use source::{ListingSource, RedditSource};
pub use storage::{RecordSink, SqliteSink};
