use chrono::{DateTime, Utc};

/// Value stored in author columns when the author is absent
pub const NO_AUTHOR: &str = "no author";

/// One flattened record of the `reddit_posts_comments` table
///
/// Post columns are always present. Comment columns are all `None` for
/// post-only rows. Rows produced from a comment carry every comment column
/// except `parent_comment_id`, which stays `None` for top-level comments.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub post_id: String,
    pub post_title: String,
    pub post_body: String,
    pub post_author: String,
    pub post_score: i64,
    pub post_created_utc: DateTime<Utc>,
    pub post_permalink: String,
    pub post_num_comments: i64,
    pub post_url: String,
    pub post_subreddit: String,

    pub comment_id: Option<String>,
    pub comment_body: Option<String>,
    pub comment_author: Option<String>,
    pub comment_score: Option<i64>,
    pub comment_created_utc: Option<DateTime<Utc>>,
    pub comment_permalink: Option<String>,
    pub parent_comment_id: Option<String>,
}

impl Row {
    /// Returns true if this row carries comment columns
    pub fn is_comment_row(&self) -> bool {
        self.comment_id.is_some()
    }
}
