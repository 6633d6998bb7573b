//! Category page sequencing
//!
//! Produces the listing addresses of one category, one at a time, from the
//! cursor persisted in the crawl state. Each request carries the cursor value
//! it was built from, so a failed page can be rewound exactly.

use crate::config::CategoryTarget;
use crate::state::CrawlState;
use crate::url::page_address;
use url::Url;

/// One listing page to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Listing address including the page offset
    pub address: Url,

    /// Cursor value this address was built from
    pub cursor: u32,
}

/// Lazily builds listing pages for one category
///
/// The cursor is advanced eagerly, before the page is fetched. The next
/// address is only built when asked for, after the outcome of the previous
/// page has been applied to the state.
#[derive(Debug)]
pub struct PageSequencer<'a> {
    target: &'a CategoryTarget,
    page_size: u32,
    max_pages: u32,
    issued: u32,
}

impl<'a> PageSequencer<'a> {
    /// Creates a sequencer that issues at most `max_pages` pages this run
    pub fn new(target: &'a CategoryTarget, page_size: u32, max_pages: u32) -> Self {
        Self {
            target,
            page_size,
            max_pages,
            issued: 0,
        }
    }

    /// Builds the next page and advances the category cursor
    ///
    /// Returns None once the category is exhausted or the page budget for
    /// this run is spent.
    pub fn next(&mut self, state: &mut CrawlState) -> Option<PageRequest> {
        let name = self.target.name.as_str();

        if state.cursor(name).is_exhausted() {
            if self.issued == 0 {
                tracing::info!("Category {} is already exhausted, skipping", name);
            }
            return None;
        }

        if self.budget_spent() {
            return None;
        }

        let cursor = state.advance(name)?;
        self.issued += 1;

        let address = page_address(&self.target.base_address, cursor, self.page_size);
        tracing::debug!("Category {} page {}: {}", name, cursor, address);

        Some(PageRequest { address, cursor })
    }

    /// Whether every page allowed this run has been issued
    pub fn budget_spent(&self) -> bool {
        self.issued >= self.max_pages
    }

    /// Number of pages issued so far
    pub fn issued(&self) -> u32 {
        self.issued
    }
}
