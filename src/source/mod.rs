//! Listing source module
//!
//! This module contains everything that talks to the external listing API:
//! - The `ListingSource` trait the crawl driver pulls from
//! - The HTTP implementation against the Reddit JSON listing endpoints
//! - The fixed-interval request throttle

mod reddit;
mod throttle;
mod traits;

pub use reddit::{build_http_client, RedditSource};
pub use throttle::Throttle;
pub use traits::{ListingPage, ListingSource, SourceError, SourceResult};
