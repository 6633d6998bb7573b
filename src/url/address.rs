use url::Url;

/// Query parameter the store uses to page through a category listing
pub const OFFSET_PARAM: &str = "offset";

/// Returns a copy of the address without its query string and fragment
pub fn strip_query(address: &Url) -> Url {
    let mut clean = address.clone();
    clean.set_query(None);
    clean.set_fragment(None);
    clean
}

/// Builds the listing address for one page of a category
///
/// Pages are addressed by the index of their first item, so page `cursor`
/// starts at `cursor * page_size`. Any query already on the base address is
/// dropped.
///
/// # Examples
///
/// ```
/// use games_scraper::url::page_address;
/// use url::Url;
///
/// let base = Url::parse("https://store.example.com/category/rpg/?snr=1_4").unwrap();
/// let page = page_address(&base, 2, 12);
/// assert_eq!(page.as_str(), "https://store.example.com/category/rpg/?offset=24");
/// ```
pub fn page_address(base: &Url, cursor: u32, page_size: u32) -> Url {
    let mut page = strip_query(base);
    let offset = u64::from(cursor) * u64::from(page_size);
    page.query_pairs_mut()
        .append_pair(OFFSET_PARAM, &offset.to_string());
    page
}

/// Cleans a category link from the store index
///
/// The query is removed, and links that do not contain a `category` path
/// segment are rejected (the genre menu also links to unrelated pages).
pub fn category_address(link: &Url) -> Option<Url> {
    let is_category = link
        .path_segments()
        .map(|mut segments| segments.any(|s| s == "category"))
        .unwrap_or(false);

    if is_category {
        Some(strip_query(link))
    } else {
        None
    }
}
