//! Output module for harvest summaries
//!
//! This module handles:
//! - Per-subreddit statistics read back from the record sink
//! - Console reports of finished passes

pub mod stats;

pub use stats::{load_statistics, print_pass_reports, print_statistics, SubredditStatistics};
