//! Batch writer: periodic commits of flattened rows
//!
//! Rows are buffered per post and committed every `flush_every` posts, so a
//! crash loses at most the posts since the last commit. A commit covers whole
//! posts only; a stored post is never missing some of its rows because of a
//! partial batch.

use crate::model::Row;
use crate::storage::{RecordSink, StorageResult};

/// Buffers rows and commits them to a sink in post-sized units
pub struct BatchWriter<'a, S: RecordSink + ?Sized> {
    sink: &'a mut S,
    pending: Vec<Row>,
    flush_every: usize,
    posts_pending: usize,
    rows_written: u64,
    commits: u64,
}

impl<'a, S: RecordSink + ?Sized> BatchWriter<'a, S> {
    /// Creates a writer committing every `flush_every` posts (at least one)
    pub fn new(sink: &'a mut S, flush_every: usize) -> Self {
        Self {
            sink,
            pending: Vec::new(),
            flush_every: flush_every.max(1),
            posts_pending: 0,
            rows_written: 0,
            commits: 0,
        }
    }

    /// Adds the rows of one processed post, committing if the batch is full
    ///
    /// Returns the number of rows committed by this call.
    pub fn push_post(&mut self, rows: Vec<Row>) -> StorageResult<usize> {
        self.pending.extend(rows);
        self.posts_pending += 1;

        if self.posts_pending >= self.flush_every {
            self.flush()
        } else {
            Ok(0)
        }
    }

    /// Commits every pending row
    ///
    /// Nothing pending is a no-op and does not touch the sink. On failure the
    /// pending rows are discarded; the caller is expected to end the pass.
    pub fn flush(&mut self) -> StorageResult<usize> {
        let posts = std::mem::take(&mut self.posts_pending);
        if self.pending.is_empty() {
            return Ok(0);
        }

        let rows = std::mem::take(&mut self.pending);
        let inserted = self.sink.append(&rows)?;

        self.rows_written += inserted as u64;
        self.commits += 1;
        tracing::debug!(
            "Committed {} rows from {} posts ({} offered)",
            inserted,
            posts,
            rows.len()
        );

        Ok(inserted)
    }

    /// Rows successfully committed so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Number of non-empty commits so far
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Rows waiting for the next commit
    pub fn pending_rows(&self) -> usize {
        self.pending.len()
    }
}
