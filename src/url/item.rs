use crate::state::ItemId;
use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the item id from a detail-page address
///
/// Detail pages live under `/app/<id>/<slug>`; the segment following `app`
/// is the numeric id.
///
/// # Examples
///
/// ```
/// use games_scraper::url::item_id_from_address;
///
/// let id = item_id_from_address("https://store.example.com/app/620/Portal_2/").unwrap();
/// assert_eq!(id, 620);
/// ```
pub fn item_id_from_address(address: &str) -> UrlResult<ItemId> {
    let url = Url::parse(address).map_err(|e| UrlError::Parse(e.to_string()))?;

    let mut segments = url
        .path_segments()
        .ok_or_else(|| UrlError::MissingItemId(address.to_string()))?;

    segments
        .by_ref()
        .find(|segment| *segment == "app")
        .ok_or_else(|| UrlError::MissingItemId(address.to_string()))?;

    segments
        .next()
        .and_then(|segment| segment.parse::<ItemId>().ok())
        .ok_or_else(|| UrlError::MissingItemId(address.to_string()))
}

/// Builds the detail-page address for an item id
pub fn detail_address(base: &Url, id: ItemId) -> UrlResult<Url> {
    base.join(&format!("app/{}", id))
        .map_err(|e| UrlError::Parse(e.to_string()))
}
