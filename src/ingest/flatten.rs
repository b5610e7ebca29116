//! Flattener: joins post and comment attributes into rows
//!
//! Rows are built by laying the post columns down first and the comment
//! columns on top, so a comment value wins whenever both sides carry the same
//! column. Today the only shared column is `post_id`.

use crate::config::CrawlMode;
use crate::model::{Comment, Post, Row, NO_AUTHOR};

/// Produces the rows a post contributes under `mode`
///
/// `comments` is ignored in `CrawlMode::Posts`.
pub fn flatten(post: &Post, comments: &[Comment], mode: CrawlMode) -> Vec<Row> {
    let mut rows = Vec::new();

    if mode.includes_posts() {
        rows.push(flatten_post(post));
    }

    if mode.includes_comments() {
        rows.extend(flatten_comments(post, comments));
    }

    rows
}

/// One row per comment, each carrying the full post columns
///
/// A post without comments yields no rows.
pub fn flatten_comments(post: &Post, comments: &[Comment]) -> Vec<Row> {
    comments
        .iter()
        .map(|comment| {
            let mut row = flatten_post(post);
            overlay_comment(&mut row, comment);
            row
        })
        .collect()
}

/// A single post-only row with every comment column absent
pub fn flatten_post(post: &Post) -> Row {
    Row {
        post_id: post.id.clone(),
        post_title: post.title.clone(),
        post_body: post.body.clone(),
        post_author: author_or_sentinel(post.author.as_deref()),
        post_score: post.score,
        post_created_utc: post.created_utc,
        post_permalink: post.permalink.clone(),
        post_num_comments: post.num_comments,
        post_url: post.url.clone(),
        post_subreddit: post.subreddit.clone(),

        comment_id: None,
        comment_body: None,
        comment_author: None,
        comment_score: None,
        comment_created_utc: None,
        comment_permalink: None,
        parent_comment_id: None,
    }
}

fn overlay_comment(row: &mut Row, comment: &Comment) {
    if row.post_id != comment.post_id {
        tracing::warn!(
            "Comment {} belongs to post {}, flattened under post {}",
            comment.id,
            comment.post_id,
            row.post_id
        );
    }

    row.post_id = comment.post_id.clone();
    row.comment_id = Some(comment.id.clone());
    row.comment_body = Some(comment.body.clone());
    row.comment_author = Some(author_or_sentinel(comment.author.as_deref()));
    row.comment_score = Some(comment.score);
    row.comment_created_utc = Some(comment.created_utc);
    row.comment_permalink = Some(comment.permalink.clone());
    row.parent_comment_id = comment.parent_id.clone();
}

fn author_or_sentinel(author: Option<&str>) -> String {
    author.unwrap_or(NO_AUTHOR).to_string()
}
