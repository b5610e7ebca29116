//! Ingestion pipeline
//!
//! Resolves where a subreddit's last pass left off, walks the listing down to
//! that point, flattens each post with its comments and commits the rows.

mod coordinator;
mod cursor;
mod driver;
mod flatten;
mod writer;

pub use coordinator::{
    harvest_all, harvest_partition, run_harvest, PassOptions, PassOutcome, PassReport, StopReason,
};
pub use cursor::{resolve_boundary, ResumeBoundary};
pub use driver::{CrawlDriver, CrawlState, DriverStats};
pub use flatten::{flatten, flatten_comments, flatten_post};
pub use writer::BatchWriter;
