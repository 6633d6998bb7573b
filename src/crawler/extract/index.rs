//! Category discovery on the store index page

use crate::crawler::extract::{selector, text_of};
use crate::url::{category_address, resolve_href};
use crate::ScraperError;
use scraper::Html;
use std::collections::BTreeMap;
use url::Url;

/// Genre menu entries on the index page
const GENRE_MENU_ITEM: &str = "#genre_flyout .popup_menu_item";

/// Reads the genre menu into a name to address mapping
///
/// Entries without a link, or whose link is not a category page, are
/// skipped. Addresses are returned without their query string. A later
/// entry with the same name replaces an earlier one.
pub fn extract_categories(html: &str, page: &Url) -> Result<BTreeMap<String, String>, ScraperError> {
    let menu_item = selector(GENRE_MENU_ITEM)?;
    let document = Html::parse_document(html);

    let mut categories = BTreeMap::new();
    for entry in document.select(&menu_item) {
        let name = text_of(entry);
        let Some(href) = entry.value().attr("href") else {
            tracing::debug!("Menu entry '{}' has no link", name);
            continue;
        };
        if name.is_empty() {
            continue;
        }

        match resolve_href(href, page).and_then(|link| category_address(&link)) {
            Some(address) => {
                categories.insert(name, address.to_string());
            }
            None => tracing::debug!("Skipping non-category menu entry '{}' ({})", name, href),
        }
    }

    Ok(categories)
}
