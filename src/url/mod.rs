//! URL handling module for Games-Scraper
//!
//! This module builds listing page addresses from category base addresses,
//! cleans category links found on the store index, and maps item ids to and
//! from detail-page addresses.

mod address;
mod item;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use address::{category_address, page_address, strip_query, OFFSET_PARAM};
pub use item::{detail_address, item_id_from_address};

/// Parses an absolute HTTP(S) address
///
/// # Arguments
///
/// * `address` - The address string to parse
///
/// # Returns
///
/// * `Ok(Url)` - The parsed address
/// * `Err(UrlError)` - The address is malformed or not HTTP(S)
pub fn parse_address(address: &str) -> UrlResult<Url> {
    let url = Url::parse(address.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Resolves a possibly relative href against the page it was found on
///
/// Returns None for empty, fragment-only, or non-HTTP(S) links.
pub fn resolve_href(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    match base.join(href) {
        Ok(absolute) if absolute.scheme() == "http" || absolute.scheme() == "https" => {
            Some(absolute)
        }
        _ => None,
    }
}
