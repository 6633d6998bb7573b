//! Detail crawl task
//!
//! Fetches the detail page of every id exported by the listing crawl. Ids
//! are recorded as crawled before their page is requested, so a page that
//! keeps failing does not block later runs.

use crate::crawler::extract::DetailExtractor;
use crate::crawler::fetcher::{PageRenderer, RenderRequest};
use crate::output::{ItemSink, RunReport};
use crate::state::{DetailState, ItemId, StateGuard};
use crate::url::detail_address;
use crate::ScraperError;
use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Reads the ids exported by the listing crawl (a JSON array of integers)
pub fn load_ids(path: &Path) -> Result<Vec<ItemId>, ScraperError> {
    tracing::info!("Getting ids from {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| ScraperError::Input {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| ScraperError::Input {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Fetches and extracts detail pages
pub struct DetailCrawler<R> {
    renderer: R,
    extractor: DetailExtractor,
    detail_base: Url,
    cancel: CancellationToken,
}

impl<R: PageRenderer> DetailCrawler<R> {
    pub fn new(renderer: R, detail_base: Url, cancel: CancellationToken) -> Result<Self, ScraperError> {
        Ok(Self {
            renderer,
            extractor: DetailExtractor::new()?,
            detail_base,
            cancel,
        })
    }

    /// Crawls every id not crawled in an earlier run
    ///
    /// Detail records go to `sink` as they are extracted. Fetch failures are
    /// logged and counted; sink failures end the run. The detail state is
    /// saved on every exit path.
    pub async fn crawl(
        &self,
        ids: &[ItemId],
        mut guard: StateGuard<DetailState>,
        sink: &mut dyn ItemSink,
    ) -> Result<RunReport, ScraperError> {
        let mut report = RunReport::new("details");

        let pending: Vec<ItemId> = ids
            .iter()
            .copied()
            .filter(|id| !guard.state().is_crawled(*id))
            .collect();
        tracing::info!(
            "{} ids to crawl ({} already crawled)",
            pending.len(),
            ids.len() - pending.len()
        );

        for id in pending {
            if self.cancel.is_cancelled() {
                break;
            }
            if !guard.state_mut().mark_crawled(id) {
                continue;
            }

            let address = detail_address(&self.detail_base, id)?;
            let request = RenderRequest::plain(address.clone());
            let rendered = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                result = self.renderer.render(&request) => result,
            };
            report.pages_fetched += 1;

            let html = match rendered {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("Failed to fetch detail page of {}: {}", id, e);
                    report.fetch_failures += 1;
                    continue;
                }
            };

            let detail = self.extractor.extract(&html, id, &address);
            sink.write_detail(&detail)?;
            report.items_emitted += 1;
        }

        sink.finish()?;
        report.cancelled = self.cancel.is_cancelled();
        report.finish();
        guard.commit()?;

        Ok(report)
    }
}
