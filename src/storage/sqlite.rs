//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the RecordSink trait.

use crate::model::Row;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RecordSink, StorageError, StorageResult};
use crate::storage::{DuplicatePolicy, RunRecord, RunStatus, RunSummary};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::Path;

const INSERT_ROW_SQL: &str = "
    INSERT INTO reddit_posts_comments (
        post_id, post_title, post_body, post_author, post_score, post_created_utc,
        post_permalink, post_num_comments, post_url, post_subreddit,
        comment_id, comment_body, comment_author, comment_score, comment_created_utc,
        comment_permalink, parent_comment_id, ingested_at
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)";

// `IS` makes two NULL comment ids compare equal, so post-only rows dedupe too.
const INSERT_ROW_IF_ABSENT_SQL: &str = "
    INSERT INTO reddit_posts_comments (
        post_id, post_title, post_body, post_author, post_score, post_created_utc,
        post_permalink, post_num_comments, post_url, post_subreddit,
        comment_id, comment_body, comment_author, comment_score, comment_created_utc,
        comment_permalink, parent_comment_id, ingested_at
    )
    SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18
    WHERE NOT EXISTS (
        SELECT 1 FROM reddit_posts_comments WHERE post_id = ?1 AND comment_id IS ?11
    )";

const RUN_COLUMNS: &str = "id, subreddit, started_at, finished_at, config_hash, boundary_utc, status,
     stop_reason, posts_seen, rows_written, ordering_anomalies, error_message";

/// SQLite record sink
pub struct SqliteSink {
    conn: Connection,
    policy: DuplicatePolicy,
}

impl SqliteSink {
    /// Opens or creates the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `policy` - How commits treat rows that are already stored
    pub fn open(path: &Path, policy: DuplicatePolicy) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // FULL sync: a commit that returned Ok must survive a process crash
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn, policy })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory(policy: DuplicatePolicy) -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn, policy })
    }

    /// Opens an existing database without writing to it
    ///
    /// No schema setup and no journal-mode change. Commits through this sink
    /// fail.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(Self {
            conn,
            policy: DuplicatePolicy::default(),
        })
    }

    fn count(&self, sql: &str, subreddit: &str) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row(sql, params![subreddit], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl RecordSink for SqliteSink {
    // ===== Rows =====

    fn append(&mut self, rows: &[Row]) -> StorageResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let sql = match self.policy {
            DuplicatePolicy::Append => INSERT_ROW_SQL,
            DuplicatePolicy::Skip => INSERT_ROW_IF_ABSENT_SQL,
        };
        let now = Utc::now().to_rfc3339();

        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(sql)?;
            for row in rows {
                inserted += stmt.execute(params![
                    row.post_id,
                    row.post_title,
                    row.post_body,
                    row.post_author,
                    row.post_score,
                    row.post_created_utc.timestamp(),
                    row.post_permalink,
                    row.post_num_comments,
                    row.post_url,
                    row.post_subreddit,
                    row.comment_id,
                    row.comment_body,
                    row.comment_author,
                    row.comment_score,
                    row.comment_created_utc.map(|ts| ts.timestamp()),
                    row.comment_permalink,
                    row.parent_comment_id,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        Ok(inserted)
    }

    fn min_timestamp(&self, subreddit: &str) -> StorageResult<Option<DateTime<Utc>>> {
        // MIN over zero rows yields a single NULL, not an empty result
        let min: Option<i64> = self.conn.query_row(
            "SELECT MIN(post_created_utc) FROM reddit_posts_comments
             WHERE post_subreddit = ?1 COLLATE NOCASE",
            params![subreddit],
            |row| row.get(0),
        )?;

        min.map(timestamp_to_datetime).transpose()
    }

    // ===== Run Ledger =====

    fn begin_run(
        &mut self,
        subreddit: &str,
        config_hash: &str,
        boundary: Option<DateTime<Utc>>,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawl_runs (subreddit, started_at, config_hash, boundary_utc, status)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                subreddit,
                now,
                config_hash,
                boundary.map(|ts| ts.timestamp()),
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, summary: &RunSummary) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE crawl_runs SET status = ?1, finished_at = ?2, stop_reason = ?3,
             posts_seen = ?4, rows_written = ?5, ordering_anomalies = ?6, error_message = ?7
             WHERE id = ?8",
            params![
                summary.status.to_db_string(),
                now,
                summary.stop_reason,
                summary.posts_seen as i64,
                summary.rows_written as i64,
                summary.ordering_anomalies as i64,
                summary.error_message,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM crawl_runs WHERE id = ?1", RUN_COLUMNS))?;

        let run = stmt
            .query_row(params![run_id], map_run_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))??;

        Ok(run)
    }

    fn get_latest_run(&self, subreddit: &str) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM crawl_runs WHERE subreddit = ?1 COLLATE NOCASE
             ORDER BY id DESC LIMIT 1",
            RUN_COLUMNS
        ))?;

        let run = stmt
            .query_row(params![subreddit], map_run_row)
            .optional()?
            .transpose()?;

        Ok(run)
    }

    // ===== Statistics =====

    fn count_rows(&self, subreddit: &str) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(*) FROM reddit_posts_comments WHERE post_subreddit = ?1 COLLATE NOCASE",
            subreddit,
        )
    }

    fn count_distinct_posts(&self, subreddit: &str) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(DISTINCT post_id) FROM reddit_posts_comments
             WHERE post_subreddit = ?1 COLLATE NOCASE",
            subreddit,
        )
    }

    fn count_distinct_comments(&self, subreddit: &str) -> StorageResult<u64> {
        self.count(
            "SELECT COUNT(DISTINCT comment_id) FROM reddit_posts_comments
             WHERE post_subreddit = ?1 COLLATE NOCASE",
            subreddit,
        )
    }

    fn list_subreddits(&self) -> StorageResult<Vec<String>> {
        // Rows carry the API's spelling, runs the configured one; fold case
        // like every other subreddit lookup.
        let mut stmt = self.conn.prepare(
            "SELECT name FROM (
                 SELECT post_subreddit AS name FROM reddit_posts_comments
                 UNION ALL
                 SELECT subreddit AS name FROM crawl_runs
             )
             GROUP BY name COLLATE NOCASE
             ORDER BY name COLLATE NOCASE",
        )?;

        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(names)
    }
}

/// Maps a `crawl_runs` row; the outer result carries SQLite errors, the inner
/// one timestamp conversion errors.
fn map_run_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StorageResult<RunRecord>> {
    let boundary: Option<i64> = row.get(5)?;
    let status: String = row.get(6)?;
    let posts_seen: i64 = row.get(8)?;
    let rows_written: i64 = row.get(9)?;
    let ordering_anomalies: i64 = row.get(10)?;

    let boundary = match boundary.map(timestamp_to_datetime).transpose() {
        Ok(boundary) => boundary,
        Err(e) => return Ok(Err(e)),
    };

    Ok(Ok(RunRecord {
        id: row.get(0)?,
        subreddit: row.get(1)?,
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        config_hash: row.get(4)?,
        boundary,
        status: RunStatus::from_db_string(&status).unwrap_or(RunStatus::Failed),
        stop_reason: row.get(7)?,
        posts_seen: posts_seen as u64,
        rows_written: rows_written as u64,
        ordering_anomalies: ordering_anomalies as u64,
        error_message: row.get(11)?,
    }))
}

fn timestamp_to_datetime(secs: i64) -> StorageResult<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(StorageError::InvalidTimestamp(secs))
}
