//! Shared test doubles

use crate::ingest::flatten_comments;
use crate::model::{Comment, Post, Row};
use crate::source::{ListingPage, ListingSource, SourceError, SourceResult};
use crate::storage::{RecordSink, RunRecord, RunSummary, StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

pub fn post(id: &str, created: i64, subreddit: &str) -> Post {
    Post {
        id: id.to_string(),
        title: format!("Title {}", id),
        body: format!("Body {}", id),
        author: Some("poster".to_string()),
        score: 10,
        created_utc: DateTime::from_timestamp(created, 0).unwrap(),
        permalink: format!("/r/{}/comments/{}/", subreddit, id),
        num_comments: 0,
        url: format!("https://example.com/{}", id),
        subreddit: subreddit.to_string(),
    }
}

pub fn comment(id: &str, post_id: &str, created: i64) -> Comment {
    Comment {
        id: id.to_string(),
        body: format!("Comment {}", id),
        author: Some("commenter".to_string()),
        score: 1,
        created_utc: DateTime::from_timestamp(created, 0).unwrap(),
        permalink: format!("https://www.reddit.com/comments/{}/{}/", post_id, id),
        post_id: post_id.to_string(),
        parent_id: None,
    }
}

pub fn row_for(post: &Post, comment: &Comment) -> Row {
    flatten_comments(post, std::slice::from_ref(comment))
        .pop()
        .unwrap()
}

/// Listing source replaying a fixed list of posts in pages
pub struct ScriptedSource {
    pub posts: Vec<Post>,
    pub comments: HashMap<String, Vec<Comment>>,
    pub page_size: usize,
    /// Fail the listing request with this page index (0-based)
    pub fail_on_page: Option<usize>,
    /// Fail the comment request for this post id
    pub fail_comments_for: Option<String>,
    pub pages_requested: usize,
    pub comment_requests: usize,
}

impl ScriptedSource {
    pub fn new(posts: Vec<Post>, page_size: usize) -> Self {
        Self {
            posts,
            comments: HashMap::new(),
            page_size,
            fail_on_page: None,
            fail_comments_for: None,
            pages_requested: 0,
            comment_requests: 0,
        }
    }

    pub fn with_comments(mut self, post_id: &str, comments: Vec<Comment>) -> Self {
        self.comments.insert(post_id.to_string(), comments);
        self
    }
}

#[async_trait]
impl ListingSource for ScriptedSource {
    async fn fetch_new(
        &mut self,
        _subreddit: &str,
        after: Option<&str>,
    ) -> SourceResult<ListingPage> {
        let page_index = self.pages_requested;
        self.pages_requested += 1;

        if self.fail_on_page == Some(page_index) {
            return Err(SourceError::Status {
                url: format!("scripted://page/{}", page_index),
                status: 503,
            });
        }

        let start = after.map(|a| a.parse::<usize>().unwrap()).unwrap_or(0);
        let end = (start + self.page_size).min(self.posts.len());
        let posts = self.posts[start..end].to_vec();
        let after = (end < self.posts.len()).then(|| end.to_string());

        Ok(ListingPage { posts, after })
    }

    async fn fetch_comments(&mut self, post: &Post) -> SourceResult<Vec<Comment>> {
        self.comment_requests += 1;

        if self.fail_comments_for.as_deref() == Some(post.id.as_str()) {
            return Err(SourceError::RateLimited {
                url: format!("scripted://comments/{}", post.id),
            });
        }

        Ok(self.comments.get(&post.id).cloned().unwrap_or_default())
    }
}

/// Record sink whose reads and writes can be made to fail
#[derive(Default)]
pub struct FlakySink {
    pub rows: Vec<Row>,
    pub append_calls: usize,
    /// Fail the append call with this index (0-based)
    pub fail_append_at: Option<usize>,
    pub fail_reads: bool,
}

impl FlakySink {
    fn unavailable() -> StorageError {
        StorageError::Sqlite(rusqlite::Error::InvalidQuery)
    }
}

impl RecordSink for FlakySink {
    fn append(&mut self, rows: &[Row]) -> StorageResult<usize> {
        let call = self.append_calls;
        self.append_calls += 1;
        if self.fail_append_at == Some(call) {
            return Err(Self::unavailable());
        }
        self.rows.extend_from_slice(rows);
        Ok(rows.len())
    }

    fn min_timestamp(&self, subreddit: &str) -> StorageResult<Option<DateTime<Utc>>> {
        if self.fail_reads {
            return Err(Self::unavailable());
        }
        Ok(self
            .rows
            .iter()
            .filter(|r| r.post_subreddit == subreddit)
            .map(|r| r.post_created_utc)
            .min())
    }

    fn begin_run(
        &mut self,
        _subreddit: &str,
        _config_hash: &str,
        _boundary: Option<DateTime<Utc>>,
    ) -> StorageResult<i64> {
        Ok(1)
    }

    fn finish_run(&mut self, _run_id: i64, _summary: &RunSummary) -> StorageResult<()> {
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        Err(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self, _subreddit: &str) -> StorageResult<Option<RunRecord>> {
        Ok(None)
    }

    fn count_rows(&self, subreddit: &str) -> StorageResult<u64> {
        Ok(self
            .rows
            .iter()
            .filter(|r| r.post_subreddit == subreddit)
            .count() as u64)
    }

    fn count_distinct_posts(&self, _subreddit: &str) -> StorageResult<u64> {
        Ok(0)
    }

    fn count_distinct_comments(&self, _subreddit: &str) -> StorageResult<u64> {
        Ok(0)
    }

    fn list_subreddits(&self) -> StorageResult<Vec<String>> {
        Ok(Vec::new())
    }
}
