//! Category discovery task
//!
//! Reads the genre menu on the store index page and writes the resulting
//! name to address map, which the listing crawl later loads.

use crate::config::save_categories;
use crate::crawler::extract::extract_categories;
use crate::crawler::fetcher::{PageRenderer, RenderRequest};
use crate::output::RunReport;
use crate::ScraperError;
use std::collections::BTreeMap;
use std::path::Path;
use url::Url;

/// Categories found on the index page
#[derive(Debug)]
pub struct DiscoveryOutcome {
    pub categories: BTreeMap<String, String>,
    pub report: RunReport,
}

/// Fetches the index page and extracts its categories
///
/// The map is written to `output` unless it is None (dry run). An index
/// page without any category link is reported as an error rather than
/// overwriting a previous, useful file with an empty map.
pub async fn discover_categories<R: PageRenderer>(
    renderer: &R,
    index: &Url,
    output: Option<&Path>,
) -> Result<DiscoveryOutcome, ScraperError> {
    let mut report = RunReport::new("categories");
    tracing::info!("Fetching category menu from {}", index);

    let html = renderer.render(&RenderRequest::plain(index.clone())).await?;
    report.pages_fetched += 1;

    let categories = extract_categories(&html, index)?;
    if categories.is_empty() {
        return Err(ScraperError::Input {
            path: index.as_str().into(),
            message: "no category links found in the genre menu".to_string(),
        });
    }
    report.items_emitted = categories.len() as u64;

    for (name, address) in &categories {
        tracing::debug!("Found category {}: {}", name, address);
    }

    match output {
        Some(path) => save_categories(path, &categories)?,
        None => tracing::info!("Dry run, not writing {} categories", categories.len()),
    }

    report.finish();
    Ok(DiscoveryOutcome { categories, report })
}
