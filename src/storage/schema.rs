//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Reddit-Harvest database.

/// Name of the flattened rows table
pub const TABLE_NAME: &str = "reddit_posts_comments";

/// Name of the crawl-run ledger table
pub const CRAWL_RUNS_TABLE: &str = "crawl_runs";

/// SQL schema for the database
///
/// Timestamps in the rows table are unix seconds so `MIN()` orders them
/// numerically. The rows table has no uniqueness constraint.
pub const SCHEMA_SQL: &str = r#"
-- Flattened post/comment rows, append-only
CREATE TABLE IF NOT EXISTS reddit_posts_comments (
    row_id INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id TEXT NOT NULL,
    post_title TEXT NOT NULL,
    post_body TEXT NOT NULL,
    post_author TEXT NOT NULL,
    post_score INTEGER NOT NULL,
    post_created_utc INTEGER NOT NULL,
    post_permalink TEXT NOT NULL,
    post_num_comments INTEGER NOT NULL,
    post_url TEXT NOT NULL,
    post_subreddit TEXT NOT NULL,
    comment_id TEXT,
    comment_body TEXT,
    comment_author TEXT,
    comment_score INTEGER,
    comment_created_utc INTEGER,
    comment_permalink TEXT,
    parent_comment_id TEXT,
    ingested_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rows_subreddit_created
    ON reddit_posts_comments(post_subreddit COLLATE NOCASE, post_created_utc);
CREATE INDEX IF NOT EXISTS idx_rows_post_comment
    ON reddit_posts_comments(post_id, comment_id);

-- One record per crawl pass over a subreddit
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subreddit TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    boundary_utc INTEGER,
    status TEXT NOT NULL,
    stop_reason TEXT,
    posts_seen INTEGER NOT NULL DEFAULT 0,
    rows_written INTEGER NOT NULL DEFAULT 0,
    ordering_anomalies INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_crawl_runs_subreddit ON crawl_runs(subreddit COLLATE NOCASE);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
