//! Crawl driver: walks a newest-first listing down to the resume boundary
//!
//! # State machine
//!
//! ```text
//! NotStarted -> Fetching -+-> post older than boundary -> Stopped
//!                  ^      |
//!                  +------+-> emit post
//!                         +-> listing drained          -> Exhausted
//!                         +-> source error             -> Failed
//! ```
//!
//! # Precondition
//!
//! The listing must be newest first. The driver stops at the first post at or
//! before the boundary and requests no further pages, so a single
//! out-of-order post ends the pass early. Such posts are counted and logged as
//! ordering anomalies but do not change the stop rule.

use crate::ingest::cursor::ResumeBoundary;
use crate::model::{Comment, Post};
use crate::source::{ListingSource, SourceResult, Throttle};
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Current state of a crawl pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    /// No page requested yet
    NotStarted,

    /// Pages are being read
    Fetching,

    // ===== Terminal States =====
    /// Reached a post at or before the resume boundary
    Stopped,

    /// The listing has no more posts
    Exhausted,

    /// The source returned an error
    Failed,
}

impl CrawlState {
    /// Returns true if the driver will not request anything else
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Exhausted | Self::Failed)
    }
}

/// Counters gathered while driving a listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    pub pages_fetched: u64,
    pub posts_emitted: u64,
    pub comment_requests: u64,
    pub ordering_anomalies: u64,
}

/// Pulls posts newer than a resume boundary from a listing source
pub struct CrawlDriver<'a, S: ListingSource + ?Sized> {
    source: &'a mut S,
    subreddit: String,
    boundary: ResumeBoundary,
    throttle: &'a mut Throttle,
    state: CrawlState,
    buffer: VecDeque<Post>,
    after: Option<String>,
    last_created: Option<DateTime<Utc>>,
    stats: DriverStats,
}

impl<'a, S: ListingSource + ?Sized> CrawlDriver<'a, S> {
    /// Creates a driver for one pass over `subreddit`
    ///
    /// # Arguments
    ///
    /// * `source` - The listing source, borrowed for the whole pass
    /// * `subreddit` - Partition key of the pass
    /// * `boundary` - Posts at or before this time are not emitted
    /// * `throttle` - Applied before every listing and comment request; shared
    ///   across passes so the interval also holds between subreddits
    pub fn new(
        source: &'a mut S,
        subreddit: impl Into<String>,
        boundary: ResumeBoundary,
        throttle: &'a mut Throttle,
    ) -> Self {
        Self {
            source,
            subreddit: subreddit.into(),
            boundary,
            throttle,
            state: CrawlState::NotStarted,
            buffer: VecDeque::new(),
            after: None,
            last_created: None,
            stats: DriverStats::default(),
        }
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    /// Returns the next post strictly newer than the boundary
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Post))` - The next post to process
    /// * `Ok(None)` - The pass is over (`Stopped`, `Exhausted` or `Failed`)
    /// * `Err(SourceError)` - A page request failed; the driver is now `Failed`
    pub async fn next_post(&mut self) -> SourceResult<Option<Post>> {
        loop {
            if self.state.is_terminal() {
                return Ok(None);
            }

            if let Some(post) = self.buffer.pop_front() {
                self.check_order(&post);

                if self.boundary.is_reached_by(post.created_utc) {
                    tracing::info!(
                        "r/{}: reached resume boundary at post {} ({}), stopping",
                        self.subreddit,
                        post.id,
                        post.created_utc.to_rfc3339()
                    );
                    self.buffer.clear();
                    self.state = CrawlState::Stopped;
                    return Ok(None);
                }

                self.stats.posts_emitted += 1;
                return Ok(Some(post));
            }

            if self.state == CrawlState::Fetching && self.after.is_none() {
                tracing::info!("r/{}: listing exhausted", self.subreddit);
                self.state = CrawlState::Exhausted;
                return Ok(None);
            }

            self.fetch_page().await?;
        }
    }

    /// Fetches the comments of a post emitted by this driver
    ///
    /// A failure moves the driver to `Failed`.
    pub async fn comments(&mut self, post: &Post) -> SourceResult<Vec<Comment>> {
        self.throttle.acquire().await;
        self.stats.comment_requests += 1;

        match self.source.fetch_comments(post).await {
            Ok(comments) => {
                tracing::debug!("Post {}: {} comments", post.id, comments.len());
                Ok(comments)
            }
            Err(e) => {
                self.state = CrawlState::Failed;
                Err(e)
            }
        }
    }

    async fn fetch_page(&mut self) -> SourceResult<()> {
        self.throttle.acquire().await;
        self.state = CrawlState::Fetching;

        let page = match self
            .source
            .fetch_new(&self.subreddit, self.after.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.state = CrawlState::Failed;
                return Err(e);
            }
        };

        self.stats.pages_fetched += 1;
        tracing::debug!(
            "r/{}: page {} with {} posts",
            self.subreddit,
            self.stats.pages_fetched,
            page.posts.len()
        );

        // an empty page ends the listing even if it carries a token
        self.after = if page.posts.is_empty() {
            None
        } else {
            page.after
        };
        self.buffer.extend(page.posts);

        Ok(())
    }

    fn check_order(&mut self, post: &Post) {
        if let Some(previous) = self.last_created {
            if post.created_utc > previous {
                self.stats.ordering_anomalies += 1;
                tracing::warn!(
                    "r/{}: post {} ({}) is newer than its predecessor ({}); listing is out of order",
                    self.subreddit,
                    post.id,
                    post.created_utc.to_rfc3339(),
                    previous.to_rfc3339()
                );
            }
        }
        self.last_created = Some(post.created_utc);
    }
}
