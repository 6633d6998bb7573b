use crate::state::cursor::PageCursor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Store-wide identifier of a game, parsed from its detail-page address
pub type ItemId = u64;

/// Incremental progress of the listing crawl
///
/// Holds the page cursor of every category seen so far and the global set of
/// item ids already emitted. The state is threaded explicitly through the
/// orchestrator and only changes through `advance`, `rewind`,
/// `mark_exhausted` and `admit`:
///
/// - an exhausted cursor never changes again
/// - `seen_ids` only grows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlState {
    #[serde(default)]
    categories: BTreeMap<String, PageCursor>,

    #[serde(default)]
    seen_ids: BTreeSet<ItemId>,

    /// When this snapshot was last written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
}

impl CrawlState {
    /// Creates an empty state (no prior run)
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cursor of a category, `Next(0)` if it was never crawled
    pub fn cursor(&self, category: &str) -> PageCursor {
        self.categories.get(category).copied().unwrap_or_default()
    }

    /// Advances a category's cursor by one page
    ///
    /// Returns the page index that was current before advancing, or None if
    /// the category is exhausted (in which case nothing changes).
    pub fn advance(&mut self, category: &str) -> Option<u32> {
        let cursor = self
            .categories
            .entry(category.to_string())
            .or_default();

        match *cursor {
            PageCursor::Next(index) => {
                *cursor = PageCursor::Next(index.saturating_add(1));
                Some(index)
            }
            PageCursor::Exhausted => None,
        }
    }

    /// Moves a category's cursor back to a page that must be fetched again
    ///
    /// Exhausted categories are left untouched. Returns true if the cursor
    /// was changed.
    pub fn rewind(&mut self, category: &str, index: u32) -> bool {
        let cursor = self
            .categories
            .entry(category.to_string())
            .or_default();

        if cursor.is_exhausted() {
            tracing::warn!(
                "Refusing to rewind exhausted category {} to page {}",
                category,
                index
            );
            return false;
        }

        *cursor = PageCursor::Next(index);
        true
    }

    /// Marks a category as fully crawled, permanently
    pub fn mark_exhausted(&mut self, category: &str) {
        self.categories
            .insert(category.to_string(), PageCursor::Exhausted);
    }

    /// Admits an item id for emission
    ///
    /// Returns false if the id was already seen; otherwise records it and
    /// returns true. Calling it twice with the same id returns false the
    /// second time.
    pub fn admit(&mut self, id: ItemId) -> bool {
        self.seen_ids.insert(id)
    }

    /// Withdraws an admitted id whose item never reached the consumer
    ///
    /// The id will be admitted again when its page is refetched.
    pub fn withdraw(&mut self, id: ItemId) -> bool {
        self.seen_ids.remove(&id)
    }

    /// Returns true if the id has already been emitted
    pub fn is_seen(&self, id: ItemId) -> bool {
        self.seen_ids.contains(&id)
    }

    /// Returns the set of ids seen so far
    pub fn seen_ids(&self) -> &BTreeSet<ItemId> {
        &self.seen_ids
    }

    /// Iterates over every category with a recorded cursor
    pub fn categories(&self) -> impl Iterator<Item = (&str, PageCursor)> {
        self.categories
            .iter()
            .map(|(name, cursor)| (name.as_str(), *cursor))
    }

    /// Returns when this state was last saved
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    pub(crate) fn touch(&mut self) {
        self.saved_at = Some(Utc::now());
    }
}

/// Progress of the detail-page crawl
///
/// An id is recorded before its page is requested, so a page that keeps
/// failing is not retried forever.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailState {
    #[serde(default)]
    crawled_ids: BTreeSet<ItemId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
}

impl DetailState {
    /// Creates an empty detail state
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an id as crawled; false if it already was
    pub fn mark_crawled(&mut self, id: ItemId) -> bool {
        self.crawled_ids.insert(id)
    }

    /// Returns true if the id's detail page was already requested
    pub fn is_crawled(&self, id: ItemId) -> bool {
        self.crawled_ids.contains(&id)
    }

    /// Returns the set of crawled ids
    pub fn crawled_ids(&self) -> &BTreeSet<ItemId> {
        &self.crawled_ids
    }

    pub(crate) fn touch(&mut self) {
        self.saved_at = Some(Utc::now());
    }
}
