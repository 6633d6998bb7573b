//! Game detail pages

use crate::crawler::extract::{all_texts, first_attr, first_text, selector, text_of};
use crate::crawler::records::{BundledContent, GameDetail};
use crate::state::ItemId;
use crate::ScraperError;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Breadcrumb labels that mark a page as downloadable content
const DLC_MARKERS: [&str; 2] = ["Contenido descargable", "Downloadable Content"];

/// Compiled selectors for a game's detail page
pub struct DetailExtractor {
    name: Selector,
    breadcrumb: Selector,
    header_image: Selector,
    short_description: Selector,
    recent_reviews: Selector,
    recent_reviews_count: Selector,
    all_reviews: Selector,
    all_reviews_count: Selector,
    review_anomaly: Selector,
    release_date: Selector,
    developer: Selector,
    publisher: Selector,
    tags: Selector,
    price: Selector,
    discount: Selector,
    discount_original_price: Selector,
    discount_final_price: Selector,
    bundled_content: Selector,
    genre: Selector,
    website: Selector,
    metacritic_score: Selector,
    metacritic_link: Selector,
}

impl DetailExtractor {
    pub fn new() -> Result<Self, ScraperError> {
        Ok(Self {
            name: selector("#appHubAppName")?,
            breadcrumb: selector(".blockbg")?,
            header_image: selector(".game_header_image_full")?,
            short_description: selector(".game_description_snippet")?,
            recent_reviews: selector(
                "#userReviews > div:nth-child(1) > div:nth-child(2) > span:nth-child(1)",
            )?,
            recent_reviews_count: selector(
                "#userReviews > div:nth-child(1) > div:nth-child(2) > span:nth-child(2)",
            )?,
            all_reviews: selector(
                "#userReviews > div:nth-child(2) > div:nth-child(2) > span:nth-child(1)",
            )?,
            all_reviews_count: selector(
                "#userReviews > div:nth-child(2) > div:nth-child(2) > span:nth-child(2)",
            )?,
            review_anomaly: selector("span.review_anomaly_icon")?,
            release_date: selector(".date")?,
            developer: selector("#developers_list > a")?,
            publisher: selector("div.dev_row:nth-child(4) > div:nth-child(2) > a")?,
            tags: selector("a.app_tag")?,
            price: selector("div.game_purchase_action_bg:nth-child(1) > div:nth-child(1)")?,
            discount: selector("div.discount_block:nth-child(1) > div:nth-child(1)")?,
            discount_original_price: selector(
                "div.discount_block:nth-child(1) > div:nth-child(2) > div:nth-child(1)",
            )?,
            discount_final_price: selector(
                "div.discount_block:nth-child(1) > div:nth-child(2) > div:nth-child(2)",
            )?,
            bundled_content: selector(".gameDlcBlocks > a")?,
            genre: selector("#genresAndManufacturer > span:nth-child(4) > a")?,
            website: selector("a.linkbar")?,
            metacritic_score: selector(".score")?,
            metacritic_link: selector("#game_area_metalink > a")?,
        })
    }

    /// Extracts a detail page
    ///
    /// `address` is the page that was fetched; relative links resolve
    /// against it.
    pub fn extract(&self, html: &str, id: ItemId, address: &Url) -> GameDetail {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let name = first_text(root, &self.name);
        if name.is_none() {
            tracing::warn!("No name found on detail page for game {}", id);
        }

        let is_dlc = root
            .select(&self.breadcrumb)
            .next()
            .map(|crumbs| {
                let text = text_of(crumbs);
                DLC_MARKERS.iter().any(|marker| text.contains(marker))
            })
            .unwrap_or(false);

        GameDetail {
            id,
            address: address.to_string(),
            name,
            is_dlc,
            image_address: first_attr(root, &self.header_image, "src"),
            short_description: first_text(root, &self.short_description),
            recent_reviews: first_text(root, &self.recent_reviews),
            recent_reviews_count: first_text(root, &self.recent_reviews_count),
            all_reviews: first_text(root, &self.all_reviews),
            all_reviews_count: first_text(root, &self.all_reviews_count),
            review_anomaly: root.select(&self.review_anomaly).next().is_some(),
            release_date: first_text(root, &self.release_date),
            developer: first_text(root, &self.developer),
            developer_address: first_attr(root, &self.developer, "href"),
            publisher: first_text(root, &self.publisher),
            publisher_address: first_attr(root, &self.publisher, "href"),
            tags: all_texts(root, &self.tags),
            price: first_text(root, &self.price),
            discount: first_text(root, &self.discount),
            discount_original_price: first_text(root, &self.discount_original_price),
            discount_final_price: first_text(root, &self.discount_final_price),
            bundled_content: self.bundled_content(root),
            genre: first_text(root, &self.genre),
            website: first_attr(root, &self.website, "href")
                .and_then(|href| unwrap_linkfilter(&href, address)),
            metacritic_score: first_text(root, &self.metacritic_score),
            metacritic_address: first_attr(root, &self.metacritic_link, "href"),
            scraped_at: Utc::now(),
        }
    }

    /// Content packs: each link holds a name block then a price block
    fn bundled_content(&self, root: ElementRef<'_>) -> Vec<BundledContent> {
        root.select(&self.bundled_content)
            .filter_map(|pack| {
                let mut blocks = pack
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|child| child.value().name() == "div")
                    .map(text_of);
                let name = blocks.next()?;
                let price = blocks.next()?;
                Some(BundledContent { name, price })
            })
            .collect()
    }
}

/// Recovers the real website from a link routed through the store's
/// outbound redirector (`.../linkfilter/?url=https://...`)
fn unwrap_linkfilter(href: &str, base: &Url) -> Option<String> {
    let link = base.join(href).ok()?;
    link.query_pairs()
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
}
