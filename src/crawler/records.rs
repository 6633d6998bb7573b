//! Records produced by the crawl tasks

use crate::state::ItemId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review summary shown on a listing row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    /// Label such as "Very Positive"
    pub category: Option<String>,

    /// Number of reviews behind the label
    pub count: Option<u64>,
}

/// One game as listed on a category page
///
/// Created by extraction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    /// Category whose listing this row was found on
    pub category: String,
    pub name: String,
    /// Detail-page address
    pub address: String,
    pub image_address: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub review: ReviewSummary,
    /// Release or listing date, as displayed
    pub release_date: Option<String>,
    pub platforms: Vec<String>,
    /// Current price, or the pre-discount price when discounted
    pub price: Option<String>,
    /// Discount label such as "-40%"
    pub discount: Option<String>,
    pub discounted_price: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// A content pack listed on a detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundledContent {
    pub name: String,
    pub price: String,
}

/// Full data from a game's detail page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameDetail {
    pub id: ItemId,
    pub address: String,
    pub name: Option<String>,
    pub is_dlc: bool,
    pub image_address: Option<String>,
    pub short_description: Option<String>,
    pub recent_reviews: Option<String>,
    pub recent_reviews_count: Option<String>,
    pub all_reviews: Option<String>,
    pub all_reviews_count: Option<String>,
    pub review_anomaly: bool,
    pub release_date: Option<String>,
    pub developer: Option<String>,
    pub developer_address: Option<String>,
    pub publisher: Option<String>,
    pub publisher_address: Option<String>,
    pub tags: Vec<String>,
    pub price: Option<String>,
    pub discount: Option<String>,
    pub discount_original_price: Option<String>,
    pub discount_final_price: Option<String>,
    pub bundled_content: Vec<BundledContent>,
    pub genre: Option<String>,
    pub website: Option<String>,
    pub metacritic_score: Option<String>,
    pub metacritic_address: Option<String>,
    pub scraped_at: DateTime<Utc>,
}
