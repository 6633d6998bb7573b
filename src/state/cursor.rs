use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker written for a category that must never be crawled again
const EXHAUSTED_MARKER: &str = "exhausted";

/// Position of a category's listing crawl
///
/// `Exhausted` is a distinct state, not a number: once a category reached its
/// end-of-results page it is never advanced again, in this run or any later
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCursor", into = "RawCursor")]
pub enum PageCursor {
    /// Index of the next page to fetch
    Next(u32),

    /// The category's listing has been fully crawled
    Exhausted,
}

impl PageCursor {
    /// Returns true if the category must not be crawled further
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Returns the next page index, or None for an exhausted category
    pub fn index(&self) -> Option<u32> {
        match self {
            Self::Next(index) => Some(*index),
            Self::Exhausted => None,
        }
    }
}

impl Default for PageCursor {
    fn default() -> Self {
        Self::Next(0)
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Next(index) => write!(f, "{}", index),
            Self::Exhausted => write!(f, "{}", EXHAUSTED_MARKER),
        }
    }
}

/// On-disk form of a cursor
///
/// Older snapshots stored exhaustion as a negative page number; those are
/// read as `Exhausted` and written back with the marker.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawCursor {
    Index(i64),
    Marker(String),
}

impl TryFrom<RawCursor> for PageCursor {
    type Error = String;

    fn try_from(raw: RawCursor) -> Result<Self, Self::Error> {
        match raw {
            RawCursor::Index(index) if index < 0 => Ok(Self::Exhausted),
            RawCursor::Index(index) => u32::try_from(index)
                .map(Self::Next)
                .map_err(|_| format!("page cursor out of range: {}", index)),
            RawCursor::Marker(marker) if marker == EXHAUSTED_MARKER => Ok(Self::Exhausted),
            RawCursor::Marker(marker) => Err(format!("unknown page cursor marker: '{}'", marker)),
        }
    }
}

impl From<PageCursor> for RawCursor {
    fn from(cursor: PageCursor) -> Self {
        match cursor {
            PageCursor::Next(index) => RawCursor::Index(i64::from(index)),
            PageCursor::Exhausted => RawCursor::Marker(EXHAUSTED_MARKER.to_string()),
        }
    }
}
