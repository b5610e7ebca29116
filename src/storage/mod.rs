//! Storage module for persisting harvested rows
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Append-only row commits, one transaction per commit
//! - The resume-boundary aggregate over stored rows
//! - Crawl-run ledger records

mod schema;
mod sqlite;
mod traits;

pub use schema::{CRAWL_RUNS_TABLE, TABLE_NAME};
pub use sqlite::SqliteSink;
pub use traits::{RecordSink, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

/// Opens (or creates) the SQLite sink at `path`
pub fn open_sink(path: &Path, policy: DuplicatePolicy) -> StorageResult<SqliteSink> {
    SqliteSink::open(path, policy)
}

/// What the sink does with a row whose `(post_id, comment_id)` is already stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Append unconditionally; reruns produce duplicate rows
    #[default]
    Append,
    /// Skip rows that already exist
    Skip,
}

/// Represents one crawl pass over a subreddit
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub subreddit: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub boundary: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub stop_reason: Option<String>,
    pub posts_seen: u64,
    pub rows_written: u64,
    pub ordering_anomalies: u64,
    pub error_message: Option<String>,
}

/// Final counters of a crawl pass, written when the pass ends
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub status: RunStatus,
    pub stop_reason: Option<String>,
    pub posts_seen: u64,
    pub rows_written: u64,
    pub ordering_anomalies: u64,
    pub error_message: Option<String>,
}

/// Status of a crawl pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
