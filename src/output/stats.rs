//! Run statistics
//!
//! Each crawl task fills a `RunReport` while it runs and prints it when it
//! ends, whatever the outcome.

use crate::state::{CategoryPhase, SuspendReason};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// A listing page that could not be trusted
///
/// The category was suspended and its cursor left pointing at this page.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestAnomaly {
    pub category: String,
    pub cursor: u32,
    pub address: String,
    pub reason: SuspendReason,
    pub message: String,
}

/// Outcome of one category in a listing run
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryReport {
    pub name: String,
    pub phase: CategoryPhase,
    pub pages_fetched: u64,
    pub items_emitted: u64,
    pub duplicates_skipped: u64,
}

impl CategoryReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: CategoryPhase::Pending,
            pages_fetched: 0,
            items_emitted: 0,
            duplicates_skipped: 0,
        }
    }
}

/// Statistics for one task run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Task name (`categories`, `listings`, `details`)
    pub task: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cancelled: bool,

    /// Pages requested from the renderer or the store
    pub pages_fetched: u64,

    /// Records handed to the sink
    pub items_emitted: u64,

    /// Listing rows dropped because their id was already seen
    pub duplicates_skipped: u64,

    /// Pages that failed to fetch
    pub fetch_failures: u64,

    pub categories: Vec<CategoryReport>,
    pub anomalies: Vec<HarvestAnomaly>,
}

impl RunReport {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            started_at: Utc::now(),
            finished_at: None,
            cancelled: false,
            pages_fetched: 0,
            items_emitted: 0,
            duplicates_skipped: 0,
            fetch_failures: 0,
            categories: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    /// Adds a finished category and folds its counters into the totals
    pub fn record_category(&mut self, category: CategoryReport) {
        self.pages_fetched += category.pages_fetched;
        self.items_emitted += category.items_emitted;
        self.duplicates_skipped += category.duplicates_skipped;
        if category.phase == CategoryPhase::Suspended(SuspendReason::FetchFailed) {
            self.fetch_failures += 1;
        }
        self.categories.push(category);
    }

    pub fn record_anomaly(&mut self, anomaly: HarvestAnomaly) {
        self.anomalies.push(anomaly);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Wall time of the run, if it has finished
    pub fn duration(&self) -> Option<Duration> {
        self.finished_at
            .and_then(|end| (end - self.started_at).to_std().ok())
    }

    /// Categories whose listing has no more pages
    pub fn exhausted_categories(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| c.phase == CategoryPhase::Exhausted)
            .count()
    }
}

/// Prints a report to stdout
pub fn print_report(report: &RunReport) {
    println!("=== {} run ===\n", report.task);

    println!("Overview:");
    println!("  Pages fetched: {}", report.pages_fetched);
    println!("  Records written: {}", report.items_emitted);
    if report.duplicates_skipped > 0 {
        println!("  Already seen, skipped: {}", report.duplicates_skipped);
    }
    if report.fetch_failures > 0 {
        println!("  Fetch failures: {}", report.fetch_failures);
    }
    if let Some(duration) = report.duration() {
        println!("  Duration: {:.1}s", duration.as_secs_f64());
    }
    if report.cancelled {
        println!("  Interrupted before completion");
    }
    println!();

    if !report.categories.is_empty() {
        println!(
            "Categories ({} exhausted of {}):",
            report.exhausted_categories(),
            report.categories.len()
        );
        for category in &report.categories {
            println!(
                "  {}: {} ({} pages, {} new, {} seen)",
                category.name,
                category.phase,
                category.pages_fetched,
                category.items_emitted,
                category.duplicates_skipped
            );
        }
        println!();
    }

    if !report.anomalies.is_empty() {
        println!("Anomalies ({}):", report.anomalies.len());
        for anomaly in &report.anomalies {
            println!(
                "  - {} page {} [{}]: {} ({})",
                anomaly.category,
                anomaly.cursor,
                anomaly.reason.as_str(),
                anomaly.address,
                anomaly.message
            );
        }
        println!();
    }
}
