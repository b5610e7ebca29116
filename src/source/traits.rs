//! Listing source trait and error types

use crate::model::{Comment, Post};
use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while reading from the listing source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Rate limited by {url}")]
    RateLimited { url: String },

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type for listing source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// One page of a newest-first listing
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Posts in the order the source returned them
    pub posts: Vec<Post>,

    /// Token for the next page; `None` when the listing is drained
    pub after: Option<String>,
}

/// External feed of posts and their comments
///
/// # Ordering
///
/// Implementations must return posts newest first, across pages as well as
/// within a page. The crawl driver stops at the first post at or before its
/// resume boundary, so an out-of-order post ends the pass early and the
/// older posts behind it are not read in that pass.
///
/// # Comments
///
/// `fetch_comments` returns a flat list with every placeholder ("load more")
/// node already resolved or removed.
///
/// Retries, if any, belong to the implementation; callers treat every error
/// as final for the current pass.
#[async_trait]
pub trait ListingSource: Send {
    /// Fetches one page of the subreddit's newest posts
    ///
    /// `after` is the token of the previous page, `None` for the first page.
    async fn fetch_new(&mut self, subreddit: &str, after: Option<&str>)
        -> SourceResult<ListingPage>;

    /// Fetches every comment of `post`
    async fn fetch_comments(&mut self, post: &Post) -> SourceResult<Vec<Comment>>;
}
