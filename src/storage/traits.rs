//! Storage traits and error types
//!
//! This module defines the trait interface for record sinks and
//! associated error types.

use crate::model::Row;
use crate::storage::{RunRecord, RunSummary};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Stored timestamp out of range: {0}")]
    InvalidTimestamp(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable, append-only tabular store for flattened rows
///
/// Rows are never updated or deleted through this interface. Each call to
/// [`RecordSink::append`] is its own unit of durability: once it returns
/// `Ok`, the rows survive a crash of the caller.
pub trait RecordSink {
    // ===== Rows =====

    /// Commits `rows` to the rows table
    ///
    /// An empty slice is a no-op. Returns the number of rows actually
    /// inserted, which is lower than `rows.len()` only when the sink skips
    /// duplicates.
    fn append(&mut self, rows: &[Row]) -> StorageResult<usize>;

    /// Minimum stored post creation time for `subreddit`
    ///
    /// `Ok(None)` means no rows exist for the key; query failures are `Err`.
    fn min_timestamp(&self, subreddit: &str) -> StorageResult<Option<DateTime<Utc>>>;

    // ===== Run Ledger =====

    /// Records the start of a crawl pass and returns its ID
    fn begin_run(
        &mut self,
        subreddit: &str,
        config_hash: &str,
        boundary: Option<DateTime<Utc>>,
    ) -> StorageResult<i64>;

    /// Records the end of a crawl pass
    fn finish_run(&mut self, run_id: i64, summary: &RunSummary) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run for a subreddit
    fn get_latest_run(&self, subreddit: &str) -> StorageResult<Option<RunRecord>>;

    // ===== Statistics =====

    /// Counts stored rows for a subreddit
    fn count_rows(&self, subreddit: &str) -> StorageResult<u64>;

    /// Counts distinct stored posts for a subreddit
    fn count_distinct_posts(&self, subreddit: &str) -> StorageResult<u64>;

    /// Counts distinct stored comments for a subreddit
    fn count_distinct_comments(&self, subreddit: &str) -> StorageResult<u64>;

    /// Lists every subreddit with stored rows or runs, sorted
    fn list_subreddits(&self) -> StorageResult<Vec<String>>;
}
