use crate::storage::DuplicatePolicy;
use serde::Deserialize;
use std::time::Duration;

/// Default listing API root
pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";

/// Main configuration structure for Reddit-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub output: OutputConfig,
}

/// Listing API client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    /// Root URL of the listing API
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Pre-obtained bearer token, sent as-is when present
    #[serde(rename = "access-token", default)]
    pub access_token: Option<String>,

    /// Posts requested per listing page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            access_token: None,
            page_size: default_page_size(),
        }
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Subreddits to harvest, in order
    #[serde(default)]
    pub subreddits: Vec<String>,

    /// Minimum time between requests (seconds)
    #[serde(rename = "rate-limit", default = "default_rate_limit")]
    pub rate_limit: u64,

    /// Emit one post-only row per post
    #[serde(rename = "crawl-posts", default)]
    pub crawl_posts: bool,

    /// Emit one row per comment
    #[serde(rename = "crawl-comments", default = "default_true")]
    pub crawl_comments: bool,

    /// What the sink does with a row it has already stored
    #[serde(rename = "on-duplicate", default)]
    pub on_duplicate: DuplicatePolicy,

    /// Number of posts processed per commit
    #[serde(rename = "flush-every", default = "default_flush_every")]
    pub flush_every: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            subreddits: Vec::new(),
            rate_limit: default_rate_limit(),
            crawl_posts: false,
            crawl_comments: true,
            on_duplicate: DuplicatePolicy::default(),
            flush_every: default_flush_every(),
        }
    }
}

impl CrawlerConfig {
    /// Returns the row shape selected by the two crawl toggles
    ///
    /// Returns `None` when both toggles are off; validation rejects that case.
    pub fn mode(&self) -> Option<CrawlMode> {
        match (self.crawl_posts, self.crawl_comments) {
            (true, true) => Some(CrawlMode::Both),
            (true, false) => Some(CrawlMode::Posts),
            (false, true) => Some(CrawlMode::Comments),
            (false, false) => None,
        }
    }

    /// The rate limit as a `Duration`
    pub fn rate_limit_interval(&self) -> Duration {
        Duration::from_secs(self.rate_limit)
    }
}

/// Which rows a post produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// One row per post, comment columns absent
    Posts,
    /// One row per comment; posts without comments produce nothing
    Comments,
    /// The post row followed by one row per comment
    Both,
}

impl CrawlMode {
    /// Returns true if comment listings must be fetched
    pub fn includes_comments(&self) -> bool {
        matches!(self, Self::Comments | Self::Both)
    }

    /// Returns true if a post-only row is emitted
    pub fn includes_posts(&self) -> bool {
        matches!(self, Self::Posts | Self::Both)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("reddit-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_page_size() -> u32 {
    100
}

fn default_rate_limit() -> u64 {
    5
}

fn default_flush_every() -> usize {
    1
}

fn default_true() -> bool {
    true
}
