//! HTML extraction for the store's page types
//!
//! Markup knowledge lives here and nowhere else: the crawl core only sees
//! `ListingExtractor::item_id` and `ListingExtractor::extract`.

mod detail;
mod index;
mod listing;

pub use detail::DetailExtractor;
pub use index::extract_categories;
pub use listing::{ListingExtractor, EMPTY_RESULTS_MARKER, ITEM_ROW};

use crate::ScraperError;
use scraper::{ElementRef, Selector};

/// Compiles a CSS selector
pub(crate) fn selector(css: &str) -> Result<Selector, ScraperError> {
    Selector::parse(css).map_err(|e| ScraperError::Selector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

/// Whitespace-trimmed text content of an element
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first match, if it has any
pub(crate) fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(text_of)
        .filter(|text| !text.is_empty())
}

/// An attribute of the first match
pub(crate) fn first_attr(scope: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    scope
        .select(selector)
        .next()
        .and_then(|element| element.value().attr(attr))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Trimmed, non-empty texts of every match
pub(crate) fn all_texts(scope: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    scope
        .select(selector)
        .map(text_of)
        .filter(|text| !text.is_empty())
        .collect()
}
