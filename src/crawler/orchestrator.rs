//! Listing crawl orchestration
//!
//! The orchestrator walks every category in turn. For each one it asks the
//! sequencer for the next page, renders it, classifies the result and
//! applies the outcome to the crawl state before the following page is
//! built:
//!
//! - end-of-results marker: the category is marked exhausted for good
//! - item rows: unseen ids are extracted and streamed out, the walk goes on
//! - neither, rows without usable item links, or a failed render: the
//!   cursor is rewound to the failing page and the category is suspended
//!   until the next run
//! - items that could not be delivered are withdrawn from the seen set and
//!   their page is rewound, so the next run emits them
//!
//! The state lives in a `StateGuard` for the whole run, so it is written
//! back on completion, on error, on panic and when the task is dropped.

use crate::config::{CategoryTarget, CrawlerConfig};
use crate::crawler::classifier::{classify, PageFetchResult};
use crate::crawler::delivery::{item_channel, Handoff, ItemSender, ItemStream, Undelivered};
use crate::crawler::extract::{ListingExtractor, EMPTY_RESULTS_MARKER, ITEM_ROW};
use crate::crawler::fetcher::{PageRenderer, RenderRequest};
use crate::crawler::records::ItemRecord;
use crate::crawler::sequencer::{PageRequest, PageSequencer};
use crate::output::{CategoryReport, HarvestAnomaly, RunReport};
use crate::state::{CategoryPhase, CrawlState, StateGuard, SuspendReason};
use crate::ScraperError;
use scraper::Html;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Items buffered between the crawl task and its consumer
const ITEM_CHANNEL_CAPACITY: usize = 64;

/// Per-run knobs of the listing crawl
#[derive(Debug, Clone)]
pub struct ListingSettings {
    pub page_size: u32,
    pub max_pages_per_category: u32,
    pub scroll_script: String,
    pub wait_timeout: Duration,
}

impl ListingSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            page_size: config.page_size,
            max_pages_per_category: config.max_pages_per_category,
            scroll_script: config.scroll_script.clone(),
            wait_timeout: Duration::from_secs(config.wait_timeout),
        }
    }
}

/// Result of a listing run that reached its end
#[derive(Debug)]
pub struct ListingOutcome {
    pub report: RunReport,
    /// State as it was saved
    pub state: CrawlState,
}

/// A listing run in progress
///
/// Items arrive on `items` while pages are fetched. The stream ends when
/// the run ends; `handle` then yields the outcome. A page is not left behind
/// until its last item has been handled, and items the consumer drops
/// unhandled are found again by the next run.
pub struct ListingRun {
    pub items: ItemStream,
    pub handle: JoinHandle<Result<ListingOutcome, ScraperError>>,
}

/// What a rendered page meant for its category
enum PageOutcome {
    Items(Vec<ItemRecord>),
    Exhausted,
    Anomaly(String),
}

/// Drives the listing crawl over a set of categories
pub struct Orchestrator<R> {
    renderer: R,
    extractor: ListingExtractor,
    settings: ListingSettings,
    cancel: CancellationToken,
}

impl<R: PageRenderer + 'static> Orchestrator<R> {
    pub fn new(
        renderer: R,
        settings: ListingSettings,
        cancel: CancellationToken,
    ) -> Result<Self, ScraperError> {
        Ok(Self {
            renderer,
            extractor: ListingExtractor::new()?,
            settings,
            cancel,
        })
    }

    /// Starts the crawl on its own task
    pub fn run(self, targets: Vec<CategoryTarget>, guard: StateGuard<CrawlState>) -> ListingRun {
        let (sender, items) = item_channel(ITEM_CHANNEL_CAPACITY);
        let handle = tokio::spawn(async move { self.crawl(targets, guard, sender).await });
        ListingRun { items, handle }
    }

    /// Crawls every target in order, then saves the state
    async fn crawl(
        &self,
        targets: Vec<CategoryTarget>,
        mut guard: StateGuard<CrawlState>,
        mut sender: ItemSender,
    ) -> Result<ListingOutcome, ScraperError> {
        let mut report = RunReport::new("listings");
        tracing::info!("Crawling {} categories", targets.len());

        for target in &targets {
            if self.cancel.is_cancelled() {
                break;
            }
            let category = self
                .crawl_category(target, guard.state_mut(), &mut sender, &mut report)
                .await;
            report.record_category(category);
        }

        report.cancelled = self.cancel.is_cancelled();
        let unhandled = sender.close().await;
        restore(unhandled, guard.state_mut());
        report.finish();

        let state = guard.commit()?;
        tracing::info!(
            "Listing crawl finished: {} items emitted, {} ids seen overall",
            report.items_emitted,
            state.seen_ids().len()
        );

        Ok(ListingOutcome { report, state })
    }

    async fn crawl_category(
        &self,
        target: &CategoryTarget,
        state: &mut CrawlState,
        sender: &mut ItemSender,
        report: &mut RunReport,
    ) -> CategoryReport {
        let name = target.name.as_str();
        let mut stats = CategoryReport::new(name);
        let mut sequencer = PageSequencer::new(
            target,
            self.settings.page_size,
            self.settings.max_pages_per_category,
        );

        loop {
            if self.cancel.is_cancelled() {
                enter(&mut stats, CategoryPhase::Suspended(SuspendReason::Cancelled));
                break;
            }

            let Some(request) = sequencer.next(state) else {
                if state.cursor(name).is_exhausted() {
                    enter(&mut stats, CategoryPhase::Exhausted);
                } else {
                    tracing::info!(
                        "Category {} reached its budget of {} pages, next run resumes at page {}",
                        name,
                        self.settings.max_pages_per_category,
                        state.cursor(name)
                    );
                    enter(&mut stats, CategoryPhase::Suspended(SuspendReason::BudgetSpent));
                }
                break;
            };
            enter(&mut stats, CategoryPhase::Active);

            let render = self.render_request(&request);
            let rendered = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                result = self.renderer.render(&render) => Some(result),
            };

            let html = match rendered {
                None => {
                    tracing::info!("Cancelled while fetching {}", request.address);
                    enter(&mut stats, CategoryPhase::Suspended(SuspendReason::Cancelled));
                    break;
                }
                Some(Err(e)) => {
                    self.suspend(name, &request, SuspendReason::FetchFailed, e.to_string(), state, report);
                    enter(&mut stats, CategoryPhase::Suspended(SuspendReason::FetchFailed));
                    break;
                }
                Some(Ok(html)) => html,
            };
            stats.pages_fetched += 1;

            match self.process_page(&html, name, &request.address, state, &mut stats) {
                PageOutcome::Exhausted => {
                    state.mark_exhausted(name);
                    tracing::info!("Category {} has no more results after page {}", name, request.cursor);
                    enter(&mut stats, CategoryPhase::Exhausted);
                    break;
                }
                PageOutcome::Anomaly(message) => {
                    self.suspend(name, &request, SuspendReason::Anomaly, message, state, report);
                    enter(&mut stats, CategoryPhase::Suspended(SuspendReason::Anomaly));
                    break;
                }
                PageOutcome::Items(items) => {
                    tracing::info!(
                        "Category {} page {}: {} new items",
                        name,
                        request.cursor,
                        items.len()
                    );
                    let (handoff, unsent) = self.deliver(items, request.cursor, sender, &mut stats).await;
                    match handoff {
                        Handoff::Done => {}
                        Handoff::Cancelled => {
                            // Sent items may still be handled; only unsent ones go back
                            restore(unsent, state);
                            enter(&mut stats, CategoryPhase::Suspended(SuspendReason::Cancelled));
                            break;
                        }
                        Handoff::Closed => {
                            tracing::warn!("Item consumer went away, stopping the crawl");
                            self.cancel.cancel();
                            let mut lost = sender.take_unhandled();
                            stats.items_emitted = stats.items_emitted.saturating_sub(lost.len() as u64);
                            lost.extend(unsent);
                            restore(lost, state);
                            enter(&mut stats, CategoryPhase::Suspended(SuspendReason::Cancelled));
                            break;
                        }
                    }
                }
            }
        }

        stats
    }

    /// Sends a page's items in order and waits until they are handled
    ///
    /// Stops early on cancellation or when the consumer is gone, returning
    /// the items that were never sent.
    async fn deliver(
        &self,
        items: Vec<ItemRecord>,
        cursor: u32,
        sender: &mut ItemSender,
        stats: &mut CategoryReport,
    ) -> (Handoff, Vec<Undelivered>) {
        let mut items = items.into_iter();

        while let Some(item) = items.next() {
            let first_unsent = Undelivered {
                id: item.id,
                category: item.category.clone(),
                cursor,
            };
            match sender.send(item, cursor, &self.cancel).await {
                Handoff::Done => stats.items_emitted += 1,
                stopped => {
                    let mut unsent = vec![first_unsent];
                    unsent.extend(items.map(|item| Undelivered {
                        id: item.id,
                        category: item.category,
                        cursor,
                    }));
                    return (stopped, unsent);
                }
            }
        }

        (sender.flush(Some(&self.cancel)).await, Vec::new())
    }

    fn render_request(&self, request: &PageRequest) -> RenderRequest {
        RenderRequest {
            address: request.address.clone(),
            scroll_script: Some(self.settings.scroll_script.clone()),
            wait_for: Some(format!("{}, {}", ITEM_ROW, EMPTY_RESULTS_MARKER)),
            wait_timeout: self.settings.wait_timeout,
        }
    }

    /// Classifies a rendered page and extracts the rows not seen before
    ///
    /// Ids are admitted before the full extraction, so a row seen in an
    /// earlier page or run costs only its id lookup. A page whose rows carry
    /// no usable item link is an anomaly.
    fn process_page(
        &self,
        html: &str,
        category: &str,
        page: &Url,
        state: &mut CrawlState,
        stats: &mut CategoryReport,
    ) -> PageOutcome {
        let document = Html::parse_document(html);

        match classify(&document, &self.extractor) {
            PageFetchResult::EmptyResults => PageOutcome::Exhausted,
            PageFetchResult::AnomalousEmpty => PageOutcome::Anomaly(
                "page has neither item rows nor the end-of-results marker".to_string(),
            ),
            PageFetchResult::ItemBlocks(rows) => {
                let identified: Vec<_> = rows
                    .iter()
                    .filter_map(|row| self.extractor.item_id(*row, page).map(|id| (*row, id)))
                    .collect();
                if identified.is_empty() {
                    return PageOutcome::Anomaly(format!(
                        "page has {} item rows but none with a usable item link",
                        rows.len()
                    ));
                }

                let mut items = Vec::with_capacity(identified.len());
                for (row, id) in identified {
                    if !state.admit(id) {
                        stats.duplicates_skipped += 1;
                        continue;
                    }
                    items.push(self.extractor.extract(row, id, category, page));
                }
                PageOutcome::Items(items)
            }
        }
    }

    /// Rolls the cursor back to the failing page and records the anomaly
    fn suspend(
        &self,
        category: &str,
        request: &PageRequest,
        reason: SuspendReason,
        message: String,
        state: &mut CrawlState,
        report: &mut RunReport,
    ) {
        state.rewind(category, request.cursor);
        tracing::error!(
            "Category {} suspended at page {} ({}): {} [{}]",
            category,
            request.cursor,
            reason.as_str(),
            message,
            request.address
        );
        report.record_anomaly(HarvestAnomaly {
            category: category.to_string(),
            cursor: request.cursor,
            address: request.address.to_string(),
            reason,
            message,
        });
    }
}

/// Gives undelivered items back to the crawl state
///
/// Their ids are withdrawn from the seen set and each category is rewound
/// to the earliest page they came from, so a later run emits them again.
fn restore(undelivered: Vec<Undelivered>, state: &mut CrawlState) {
    let mut pages: BTreeMap<String, (u32, usize)> = BTreeMap::new();
    for item in undelivered {
        state.withdraw(item.id);
        let page = pages.entry(item.category).or_insert((item.cursor, 0));
        page.0 = page.0.min(item.cursor);
        page.1 += 1;
    }

    for (category, (cursor, count)) in pages {
        state.rewind(&category, cursor);
        tracing::warn!(
            "{} items of category {} were not handled, page {} will be fetched again",
            count,
            category,
            cursor
        );
    }
}

/// Moves a category to its next phase
fn enter(stats: &mut CategoryReport, next: CategoryPhase) {
    if stats.phase == next {
        return;
    }
    if !stats.phase.can_transition_to(next) {
        tracing::warn!(
            "Unexpected phase change for category {}: {} -> {}",
            stats.name,
            stats.phase,
            next
        );
    }
    tracing::debug!("Category {}: {} -> {}", stats.name, stats.phase, next);
    stats.phase = next;
}
