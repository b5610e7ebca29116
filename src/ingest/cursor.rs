//! Cursor resolver: the resume boundary for a subreddit
//!
//! The boundary is not stored anywhere. It is the minimum post creation time
//! among the rows already persisted for the subreddit, read fresh before every
//! pass.

use crate::storage::RecordSink;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::fmt;

/// Where a crawl pass stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeBoundary {
    /// Nothing stored yet; read the whole listing
    NoBoundary,
    /// Stop at the first post created at or before this time
    At(DateTime<Utc>),
}

impl ResumeBoundary {
    /// Returns true if a post created at `created_utc` is already covered
    pub fn is_reached_by(&self, created_utc: DateTime<Utc>) -> bool {
        match self {
            Self::NoBoundary => false,
            Self::At(boundary) => created_utc <= *boundary,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::NoBoundary => None,
            Self::At(boundary) => Some(*boundary),
        }
    }
}

impl From<Option<DateTime<Utc>>> for ResumeBoundary {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(Self::NoBoundary, Self::At)
    }
}

impl fmt::Display for ResumeBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoBoundary => write!(f, "none"),
            Self::At(boundary) => write!(f, "{}", boundary.to_rfc3339()),
        }
    }
}

/// Resolves the resume boundary for `subreddit`
///
/// # Returns
///
/// * `Ok(ResumeBoundary::NoBoundary)` - No rows stored for the subreddit
/// * `Ok(ResumeBoundary::At(ts))` - Oldest stored post creation time
/// * `Err(HarvestError::Cursor)` - The sink could not be queried
pub fn resolve_boundary<S>(sink: &S, subreddit: &str) -> Result<ResumeBoundary, HarvestError>
where
    S: RecordSink + ?Sized,
{
    sink.min_timestamp(subreddit)
        .map(ResumeBoundary::from)
        .map_err(|source| HarvestError::Cursor {
            subreddit: subreddit.to_string(),
            source,
        })
}
