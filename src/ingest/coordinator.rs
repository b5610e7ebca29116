//! Harvest coordinator - per-subreddit pass orchestration
//!
//! One pass over a subreddit runs strictly in sequence:
//! 1. Resolve the resume boundary from stored rows
//! 2. Record the pass in the run ledger
//! 3. For each post newer than the boundary: fetch comments, flatten, commit
//! 4. Record the outcome
//!
//! Any source or sink error ends the pass. Rows committed before the error
//! stay committed, and the next subreddit is processed as usual.

use crate::config::{Config, CrawlMode};
use crate::ingest::cursor::{resolve_boundary, ResumeBoundary};
use crate::ingest::driver::{CrawlDriver, CrawlState};
use crate::ingest::flatten::flatten;
use crate::ingest::writer::BatchWriter;
use crate::source::{ListingSource, RedditSource, Throttle};
use crate::storage::{open_sink, RecordSink, RunStatus, RunSummary};
use crate::HarvestError;
use std::path::Path;
use std::time::{Duration, Instant};

/// Settings shared by every pass of a harvest
#[derive(Debug, Clone)]
pub struct PassOptions {
    /// Which rows each post produces
    pub mode: CrawlMode,

    /// Posts per commit
    pub flush_every: usize,

    /// Minimum time between source requests
    pub rate_limit: Duration,

    /// Hash of the configuration, recorded in the run ledger
    pub config_hash: String,
}

impl PassOptions {
    /// Builds pass options from a validated configuration
    pub fn from_config(config: &Config, config_hash: impl Into<String>) -> Result<Self, HarvestError> {
        let mode = config.crawler.mode().ok_or_else(|| {
            crate::ConfigError::Validation(
                "crawl-posts and crawl-comments cannot both be disabled".to_string(),
            )
        })?;

        Ok(Self {
            mode,
            flush_every: config.crawler.flush_every,
            rate_limit: config.crawler.rate_limit_interval(),
            config_hash: config_hash.into(),
        })
    }
}

/// Why a pass that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Reached already-stored data
    BoundaryReached,
    /// The listing had nothing more
    Exhausted,
}

impl StopReason {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::BoundaryReached => "boundary",
            Self::Exhausted => "exhausted",
        }
    }
}

/// How a pass ended
#[derive(Debug)]
pub enum PassOutcome {
    Completed(StopReason),
    Failed(HarvestError),
}

impl PassOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Result of one pass over a subreddit
#[derive(Debug)]
pub struct PassReport {
    pub subreddit: String,
    pub boundary: Option<ResumeBoundary>,
    pub run_id: Option<i64>,
    pub pages_fetched: u64,
    pub posts_seen: u64,
    pub rows_written: u64,
    pub ordering_anomalies: u64,
    pub elapsed: Duration,
    pub outcome: PassOutcome,
}

impl PassReport {
    fn aborted(subreddit: &str, boundary: Option<ResumeBoundary>, error: HarvestError) -> Self {
        Self {
            subreddit: subreddit.to_string(),
            boundary,
            run_id: None,
            pages_fetched: 0,
            posts_seen: 0,
            rows_written: 0,
            ordering_anomalies: 0,
            elapsed: Duration::ZERO,
            outcome: PassOutcome::Failed(error),
        }
    }
}

/// Runs one crawl pass over `subreddit`
///
/// Never returns an error: failures end up in `PassReport::outcome`, with
/// every row committed before the failure left in place.
///
/// # Arguments
///
/// * `source` - Listing source to pull from
/// * `sink` - Record sink for rows, the resume boundary and the run ledger
/// * `subreddit` - Partition key of the pass
/// * `options` - Shared pass settings
/// * `throttle` - Request throttle, carried over from the previous pass
pub async fn harvest_partition<S, K>(
    source: &mut S,
    sink: &mut K,
    subreddit: &str,
    options: &PassOptions,
    throttle: &mut Throttle,
) -> PassReport
where
    S: ListingSource + ?Sized,
    K: RecordSink + ?Sized,
{
    let start = Instant::now();

    let boundary = match resolve_boundary(&*sink, subreddit) {
        Ok(boundary) => boundary,
        Err(e) => {
            tracing::error!("r/{}: {}; skipping this subreddit", subreddit, e);
            return PassReport::aborted(subreddit, None, e);
        }
    };

    tracing::info!("r/{}: starting pass (resume boundary: {})", subreddit, boundary);

    let run_id = match sink.begin_run(subreddit, &options.config_hash, boundary.timestamp()) {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("r/{}: failed to record run start: {}", subreddit, e);
            return PassReport::aborted(subreddit, Some(boundary), e.into());
        }
    };

    let mut driver = CrawlDriver::new(source, subreddit, boundary, throttle);
    let mut writer = BatchWriter::new(&mut *sink, options.flush_every);
    let mut sink_failed = false;

    let mut outcome = loop {
        let post = match driver.next_post().await {
            Ok(Some(post)) => post,
            Ok(None) => break completed_outcome(driver.state()),
            Err(e) => break PassOutcome::Failed(e.into()),
        };

        tracing::debug!("r/{}: processing post {} '{}'", subreddit, post.id, post.title);

        let comments = if options.mode.includes_comments() {
            match driver.comments(&post).await {
                Ok(comments) => comments,
                Err(e) => break PassOutcome::Failed(e.into()),
            }
        } else {
            Vec::new()
        };

        let rows = flatten(&post, &comments, options.mode);
        if let Err(e) = writer.push_post(rows) {
            sink_failed = true;
            break PassOutcome::Failed(e.into());
        }
    };

    // Posts buffered before a source error are complete; commit them too.
    if !sink_failed {
        if let Err(e) = writer.flush() {
            match outcome {
                PassOutcome::Completed(_) => outcome = PassOutcome::Failed(e.into()),
                PassOutcome::Failed(_) => {
                    tracing::error!("r/{}: final commit also failed: {}", subreddit, e)
                }
            }
        }
    }

    let stats = driver.stats();
    let rows_written = writer.rows_written();
    drop(writer);

    let summary = RunSummary {
        status: if outcome.is_failed() {
            RunStatus::Failed
        } else {
            RunStatus::Completed
        },
        stop_reason: match &outcome {
            PassOutcome::Completed(reason) => Some(reason.to_db_string().to_string()),
            PassOutcome::Failed(_) => None,
        },
        posts_seen: stats.posts_emitted,
        rows_written,
        ordering_anomalies: stats.ordering_anomalies,
        error_message: match &outcome {
            PassOutcome::Failed(e) => Some(e.to_string()),
            PassOutcome::Completed(_) => None,
        },
    };

    if let Err(e) = sink.finish_run(run_id, &summary) {
        tracing::warn!("r/{}: failed to record run end: {}", subreddit, e);
    }

    match &outcome {
        PassOutcome::Completed(reason) => tracing::info!(
            "r/{}: pass complete ({}), {} posts, {} rows written",
            subreddit,
            reason.to_db_string(),
            stats.posts_emitted,
            rows_written
        ),
        PassOutcome::Failed(e) => tracing::error!(
            "r/{}: pass halted after {} posts, {} rows written: {}",
            subreddit,
            stats.posts_emitted,
            rows_written,
            e
        ),
    }

    PassReport {
        subreddit: subreddit.to_string(),
        boundary: Some(boundary),
        run_id: Some(run_id),
        pages_fetched: stats.pages_fetched,
        posts_seen: stats.posts_emitted,
        rows_written,
        ordering_anomalies: stats.ordering_anomalies,
        elapsed: start.elapsed(),
        outcome,
    }
}

/// Runs one pass per subreddit, in order
///
/// A failed pass is logged and the remaining subreddits still run. One
/// throttle spans every pass, so the first request for a subreddit still
/// waits out the interval after the last request for the previous one.
pub async fn harvest_all<S, K>(
    source: &mut S,
    sink: &mut K,
    subreddits: &[String],
    options: &PassOptions,
) -> Vec<PassReport>
where
    S: ListingSource + ?Sized,
    K: RecordSink + ?Sized,
{
    let mut throttle = Throttle::new(options.rate_limit);
    let mut reports = Vec::with_capacity(subreddits.len());
    for subreddit in subreddits {
        reports.push(
            harvest_partition(source, sink, subreddit.trim(), options, &mut throttle).await,
        );
    }
    reports
}

/// Runs a complete harvest from configuration
///
/// Builds the HTTP listing source and opens the SQLite sink, both scoped to
/// this call, then harvests every subreddit in `subreddits`.
///
/// # Example
///
/// ```no_run
/// use reddit_harvest::config::load_config_with_hash;
/// use reddit_harvest::ingest::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("harvest.toml"))?;
/// let reports = run_harvest(&config, &hash, &config.crawler.subreddits).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(
    config: &Config,
    config_hash: &str,
    subreddits: &[String],
) -> Result<Vec<PassReport>, HarvestError> {
    let options = PassOptions::from_config(config, config_hash)?;
    let mut source = RedditSource::new(&config.reddit)?;
    let mut sink = open_sink(
        Path::new(&config.output.database_path),
        config.crawler.on_duplicate,
    )?;

    Ok(harvest_all(&mut source, &mut sink, subreddits, &options).await)
}

fn completed_outcome(state: CrawlState) -> PassOutcome {
    match state {
        CrawlState::Stopped => PassOutcome::Completed(StopReason::BoundaryReached),
        _ => PassOutcome::Completed(StopReason::Exhausted),
    }
}
