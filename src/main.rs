//! Reddit-Harvest main entry point
//!
//! This is the command-line interface for the resumable subreddit harvester.

use anyhow::Context;
use clap::Parser;
use reddit_harvest::config::{load_config_with_hash, validate, Config};
use reddit_harvest::ingest::{run_harvest, ResumeBoundary};
use reddit_harvest::output::{load_statistics, print_pass_reports, print_statistics};
use reddit_harvest::storage::{open_sink, RecordSink, SqliteSink};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Reddit-Harvest: resumable subreddit ingestion
///
/// Pages through each configured subreddit's newest posts, stores every post
/// and comment as a flattened row in SQLite, and on later runs stops once it
/// reaches data that is already stored.
#[derive(Parser, Debug)]
#[command(name = "reddit-harvest")]
#[command(version)]
#[command(about = "Resumable subreddit ingestion into SQLite", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show where each subreddit would resume, without fetching
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Harvest only this subreddit (repeatable); overrides the config list
    #[arg(long = "subreddit", value_name = "NAME")]
    subreddits: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if !cli.subreddits.is_empty() {
        config.crawler.subreddits = cli.subreddits.clone();
        validate(&config).context("invalid --subreddit override")?;
    }

    if cli.dry_run {
        handle_dry_run(&config)?;
        return Ok(ExitCode::SUCCESS);
    }
    if cli.stats {
        handle_stats(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    handle_harvest(&config, &config_hash, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("reddit_harvest=info,warn"),
            1 => EnvFilter::new("reddit_harvest=debug,info"),
            2 => EnvFilter::new("reddit_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the configuration and resume boundaries
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Reddit-Harvest Dry Run ===\n");

    println!("Source:");
    println!("  Base URL: {}", config.reddit.base_url);
    println!("  User agent: {}", config.reddit.user_agent);
    println!("  Page size: {}", config.reddit.page_size);
    println!(
        "  Access token: {}",
        if config.reddit.access_token.is_some() {
            "set"
        } else {
            "none"
        }
    );

    println!("\nCrawler:");
    println!("  Rate limit: {}s between requests", config.crawler.rate_limit);
    println!("  Crawl posts: {}", config.crawler.crawl_posts);
    println!("  Crawl comments: {}", config.crawler.crawl_comments);
    println!("  On duplicate: {:?}", config.crawler.on_duplicate);
    println!("  Commit every: {} posts", config.crawler.flush_every);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);

    let db_path = Path::new(&config.output.database_path);
    // A dry run never creates the database or touches its schema
    let sink = if db_path.exists() {
        Some(SqliteSink::open_read_only(db_path).context("failed to open database")?)
    } else {
        None
    };

    println!("\nSubreddits ({}):", config.crawler.subreddits.len());
    for subreddit in &config.crawler.subreddits {
        let boundary = match &sink {
            Some(sink) => ResumeBoundary::from(
                sink.min_timestamp(subreddit)
                    .with_context(|| format!("failed to read boundary for r/{}", subreddit))?,
            ),
            None => ResumeBoundary::NoBoundary,
        };
        println!("  - r/{} (resume boundary: {})", subreddit, boundary);
    }

    println!("\n✓ Configuration is valid");

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let sink = open_sink(
        Path::new(&config.output.database_path),
        config.crawler.on_duplicate,
    )
    .context("failed to open database")?;

    let stats = load_statistics(&sink).context("failed to load statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main harvest; fails the process if any pass failed
async fn handle_harvest(config: &Config, config_hash: &str, quiet: bool) -> anyhow::Result<ExitCode> {
    tracing::info!(
        "Harvesting {} subreddits into {}",
        config.crawler.subreddits.len(),
        config.output.database_path
    );

    let reports = run_harvest(config, config_hash, &config.crawler.subreddits)
        .await
        .context("harvest could not start")?;

    if !quiet {
        print_pass_reports(&reports);
    }

    let failed = reports.iter().filter(|r| r.outcome.is_failed()).count();
    if failed > 0 {
        tracing::error!("{} of {} passes failed", failed, reports.len());
        Ok(ExitCode::FAILURE)
    } else {
        tracing::info!("Harvest completed successfully");
        Ok(ExitCode::SUCCESS)
    }
}
