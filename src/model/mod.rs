//! Data model for harvested content
//!
//! - `Post` and `Comment` are what the listing source yields
//! - `Row` is the denormalized record written to the sink

mod row;

pub use row::{Row, NO_AUTHOR};

use chrono::{DateTime, Utc};

/// A single subreddit post as observed in the newest-first listing
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Identifier, unique within the source
    pub id: String,

    pub title: String,

    /// Self-text; empty for link posts
    pub body: String,

    /// `None` when the account was deleted or removed
    pub author: Option<String>,

    pub score: i64,

    /// Creation time on the source clock
    pub created_utc: DateTime<Utc>,

    pub permalink: String,

    pub num_comments: i64,

    /// External URL the post links to
    pub url: String,

    /// Subreddit name; the partition key
    pub subreddit: String,
}

/// A single comment on a [`Post`]
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Identifier, unique within the source
    pub id: String,

    pub body: String,

    /// `None` when the account was deleted or removed
    pub author: Option<String>,

    pub score: i64,

    pub created_utc: DateTime<Utc>,

    pub permalink: String,

    /// Identifier of the owning post
    pub post_id: String,

    /// Identifier of the parent comment; `None` for top-level comments
    pub parent_id: Option<String>,
}
