//! Crawler module: the three crawl tasks and what they are built from
//!
//! This module contains:
//! - The listing crawl core (sequencing, classification, orchestration)
//! - Category discovery and the detail crawl
//! - Page rendering (Browserless, plain HTTP, pacing and robots.txt)
//! - Markup extraction for listing rows, detail pages and the index menu

mod browserless;
mod categories;
pub mod classifier;
mod delivery;
mod details;
pub mod extract;
mod fetcher;
mod orchestrator;
mod polite;
mod records;
pub mod sequencer;

pub use browserless::BrowserlessRenderer;
pub use categories::{discover_categories, DiscoveryOutcome};
pub use delivery::ItemStream;
pub use details::{load_ids, DetailCrawler};
pub use fetcher::{
    build_http_client, fetch_html, HttpRenderer, PageRenderer, RenderRequest, AGE_GATE_COOKIES,
};
pub use orchestrator::{ListingOutcome, ListingRun, ListingSettings, Orchestrator};
pub use polite::PoliteRenderer;
pub use records::{BundledContent, GameDetail, ItemRecord, ReviewSummary};
