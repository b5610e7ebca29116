//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! per-subreddit statistics from the record sink, and for summarizing the
//! passes of a run on the console.

use crate::ingest::{PassOutcome, PassReport, ResumeBoundary};
use crate::storage::{RecordSink, RunRecord, StorageResult};

/// Stored data for one subreddit
#[derive(Debug, Clone)]
pub struct SubredditStatistics {
    pub subreddit: String,

    /// Rows stored, duplicates included
    pub total_rows: u64,

    pub distinct_posts: u64,

    pub distinct_comments: u64,

    /// Where the next pass would stop
    pub boundary: ResumeBoundary,

    /// Most recent pass recorded in the run ledger
    pub latest_run: Option<RunRecord>,
}

/// Loads statistics for every subreddit with stored rows or recorded passes
///
/// # Arguments
///
/// * `sink` - The record sink to query
///
/// # Returns
///
/// * `Ok(Vec<SubredditStatistics>)` - One entry per subreddit, sorted by name
/// * `Err(StorageError)` - Failed to query the sink
pub fn load_statistics<S: RecordSink + ?Sized>(sink: &S) -> StorageResult<Vec<SubredditStatistics>> {
    let mut all = Vec::new();

    for subreddit in sink.list_subreddits()? {
        all.push(SubredditStatistics {
            total_rows: sink.count_rows(&subreddit)?,
            distinct_posts: sink.count_distinct_posts(&subreddit)?,
            distinct_comments: sink.count_distinct_comments(&subreddit)?,
            boundary: sink.min_timestamp(&subreddit)?.into(),
            latest_run: sink.get_latest_run(&subreddit)?,
            subreddit,
        });
    }

    all.sort_by_key(|entry| entry.subreddit.to_lowercase());
    Ok(all)
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &[SubredditStatistics]) {
    println!("=== Harvest Statistics ===\n");

    if stats.is_empty() {
        println!("No rows stored yet.");
        return;
    }

    for entry in stats {
        println!("r/{}:", entry.subreddit);
        println!("  Rows stored: {}", entry.total_rows);
        println!("  Distinct posts: {}", entry.distinct_posts);
        println!("  Distinct comments: {}", entry.distinct_comments);
        println!("  Resume boundary: {}", entry.boundary);

        match &entry.latest_run {
            Some(run) => {
                println!(
                    "  Last pass: #{} started {} ({})",
                    run.id,
                    run.started_at,
                    run.status.to_db_string()
                );
                if let Some(reason) = &run.stop_reason {
                    println!("    Stopped at: {}", reason);
                }
                println!(
                    "    Posts: {}, rows written: {}",
                    run.posts_seen, run.rows_written
                );
                if run.ordering_anomalies > 0 {
                    println!("    Ordering anomalies: {}", run.ordering_anomalies);
                }
                if let Some(error) = &run.error_message {
                    println!("    Error: {}", error);
                }
            }
            None => println!("  Last pass: none recorded"),
        }
        println!();
    }
}

/// Prints one line per pass, then a total
pub fn print_pass_reports(reports: &[PassReport]) {
    println!("=== Harvest Summary ===\n");

    let mut total_rows = 0;
    for report in reports {
        total_rows += report.rows_written;
        let status = match &report.outcome {
            PassOutcome::Completed(reason) => format!("ok ({})", reason.to_db_string()),
            PassOutcome::Failed(e) => format!("FAILED: {}", e),
        };
        println!(
            "  r/{:<21} {:>6} posts {:>8} rows {:>7.1}s  {}",
            report.subreddit,
            report.posts_seen,
            report.rows_written,
            report.elapsed.as_secs_f64(),
            status
        );
    }

    let failed = reports.iter().filter(|r| r.outcome.is_failed()).count();
    println!(
        "\n{} subreddits, {} failed, {} rows written",
        reports.len(),
        failed,
        total_rows
    );
}
