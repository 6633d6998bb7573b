//! Category listing rows
//!
//! The listing is built from CSS-module classes with a hashed suffix
//! (`salepreviewwidgets_SaleItemBrowserRow_y9MSd`), so rows and fields are
//! matched on the stable class prefix only.

use crate::crawler::extract::{all_texts, first_attr, first_text, selector};
use crate::crawler::records::{ItemRecord, ReviewSummary};
use crate::state::ItemId;
use crate::url::{item_id_from_address, resolve_href};
use crate::ScraperError;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// One game row in a category listing
pub const ITEM_ROW: &str = r#"[class*="salepreviewwidgets_SaleItemBrowserRow"]"#;

/// Element shown instead of rows once the listing has run out of games
pub const EMPTY_RESULTS_MARKER: &str = r#"[class*="saleitembrowser_EmptyResults"]"#;

/// Compiled selectors for listing rows
pub struct ListingExtractor {
    row: Selector,
    empty_marker: Selector,
    link: Selector,
    image: Selector,
    name: Selector,
    description: Selector,
    tags: Selector,
    release_date: Selector,
    platform_icons: Selector,
    review_category: Selector,
    review_count: Selector,
    price: Selector,
    discount: Selector,
    original_price: Selector,
}

impl ListingExtractor {
    pub fn new() -> Result<Self, ScraperError> {
        Ok(Self {
            row: selector(ITEM_ROW)?,
            empty_marker: selector(EMPTY_RESULTS_MARKER)?,
            link: selector(r#"a[href*="/app/"]"#)?,
            image: selector("img[src]")?,
            name: selector(r#"[class*="StoreSaleWidgetTitle"]"#)?,
            description: selector(r#"[class*="StoreSaleWidgetShortDesc"]"#)?,
            tags: selector(r#"[class*="StoreSaleWidgetTags"] a"#)?,
            release_date: selector(r#"[class*="StoreSaleWidgetRelease"]"#)?,
            platform_icons: selector(r#"[class*="WidgetPlatforms"] svg"#)?,
            review_category: selector(r#"[class*="ReviewScoreValue"]"#)?,
            review_count: selector(r#"[class*="ReviewScoreCount"]"#)?,
            price: selector(r#"[class*="StoreSalePriceBox"]"#)?,
            discount: selector(r#"[class*="StoreSaleDiscountBox"]"#)?,
            original_price: selector(r#"[class*="StoreOriginalPrice"]"#)?,
        })
    }

    /// Every game row on a rendered listing page, in page order
    pub fn item_rows<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        document.select(&self.row).collect()
    }

    /// Whether the page shows the end-of-results marker
    pub fn has_empty_marker(&self, document: &Html) -> bool {
        document.select(&self.empty_marker).next().is_some()
    }

    /// Detail-page address of a row, resolved against the listing page
    pub fn item_address(&self, row: ElementRef<'_>, page: &Url) -> Option<Url> {
        let href = first_attr(row, &self.link, "href")?;
        let address = resolve_href(&href, page);
        if address.is_none() {
            tracing::warn!("Listing row with unresolvable link {} on {}", href, page);
        }
        address
    }

    /// Id of a row, read from its detail-page link only
    ///
    /// This is cheap enough to run before deciding whether the row is worth a
    /// full extraction.
    pub fn item_id(&self, row: ElementRef<'_>, page: &Url) -> Option<ItemId> {
        let address = self.item_address(row, page)?;
        match item_id_from_address(address.as_str()) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("Listing row with unusable link {}: {}", address, e);
                None
            }
        }
    }

    /// Extracts every field of a row
    ///
    /// Missing fields become `None` (or empty lists); a row never fails.
    pub fn extract(&self, row: ElementRef<'_>, id: ItemId, category: &str, page: &Url) -> ItemRecord {
        let name = first_text(row, &self.name).unwrap_or_else(|| {
            tracing::warn!("No name found for game {}", id);
            String::new()
        });

        let review = ReviewSummary {
            category: first_text(row, &self.review_category),
            count: first_text(row, &self.review_count).and_then(|text| parse_count(&text)),
        };
        if review.category.is_none() {
            tracing::debug!("Review summary not found for game {}", id);
        }

        let discount = first_text(row, &self.discount).filter(|text| text.contains('%'));
        let final_price = first_text(row, &self.price);
        let (price, discounted_price) = if discount.is_some() {
            (first_text(row, &self.original_price), final_price)
        } else {
            (final_price, None)
        };

        ItemRecord {
            id,
            category: category.to_string(),
            name,
            address: self
                .item_address(row, page)
                .map(String::from)
                .unwrap_or_default(),
            image_address: first_attr(row, &self.image, "src"),
            description: first_text(row, &self.description),
            tags: all_texts(row, &self.tags),
            review,
            release_date: first_text(row, &self.release_date),
            platforms: self.platforms(row, id),
            price,
            discount,
            discounted_price,
            scraped_at: Utc::now(),
        }
    }

    fn platforms(&self, row: ElementRef<'_>, id: ItemId) -> Vec<String> {
        row.select(&self.platform_icons)
            .filter_map(|icon| {
                let class = icon.value().attr("class").unwrap_or("").trim();
                let platform = platform_from_icon_class(class);
                if platform.is_none() {
                    tracing::debug!("Unknown platform icon '{}' for game {}", class, id);
                }
                platform
            })
            .map(str::to_string)
            .collect()
    }
}

/// Maps a platform icon's class list to a platform name
///
/// The VR icon only carries the shared button class and the Linux icon has
/// no class at all.
fn platform_from_icon_class(class: &str) -> Option<&'static str> {
    if class.contains("WindowsLogo") {
        Some("windows")
    } else if class.contains("AppleLogo") {
        Some("mac")
    } else if class.contains("SteamLogo") {
        Some("steam")
    } else if class == "SVGIcon_Button" {
        Some("vr")
    } else if class.is_empty() {
        Some("linux")
    } else {
        None
    }
}

/// Parses a review count such as "| 12.345 reseñas" or "(1,024)"
fn parse_count(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}
