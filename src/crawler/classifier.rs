//! Page outcome classification
//!
//! A rendered listing page ends in one of three ways. The store shows an
//! explicit marker once a category has no more games; a page with neither
//! the marker nor any rows means the render went wrong (timeout, layout
//! change, block page) and must not be mistaken for the end of the category.

use crate::crawler::extract::ListingExtractor;
use scraper::{ElementRef, Html};

/// What a rendered listing page contained
#[derive(Debug)]
pub enum PageFetchResult<'a> {
    /// The end-of-results marker and no rows
    EmptyResults,

    /// At least one game row, in page order
    ItemBlocks(Vec<ElementRef<'a>>),

    /// No rows and no marker
    AnomalousEmpty,
}

impl PageFetchResult<'_> {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageFetchResult::EmptyResults => "empty_results",
            PageFetchResult::ItemBlocks(_) => "item_blocks",
            PageFetchResult::AnomalousEmpty => "anomalous_empty",
        }
    }
}

/// Classifies a rendered listing page
///
/// Rules are applied in order:
/// 1. marker present and zero rows: `EmptyResults`
/// 2. one or more rows: `ItemBlocks`
/// 3. anything else: `AnomalousEmpty`
pub fn classify<'a>(document: &'a Html, extractor: &ListingExtractor) -> PageFetchResult<'a> {
    let rows = extractor.item_rows(document);

    if rows.is_empty() && extractor.has_empty_marker(document) {
        PageFetchResult::EmptyResults
    } else if !rows.is_empty() {
        PageFetchResult::ItemBlocks(rows)
    } else {
        PageFetchResult::AnomalousEmpty
    }
}
