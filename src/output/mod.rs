//! Output module for crawled records and run reports
//!
//! This module handles:
//! - Writing listing items and detail records to a sink (JSON lines or SQLite)
//! - Recording per-run statistics and printing them at the end of a task

mod jsonl;
mod sqlite_output;
pub mod stats;

pub use jsonl::JsonLinesSink;
pub use sqlite_output::SqliteSink;
pub use stats::{print_report, CategoryReport, HarvestAnomaly, RunReport};

use crate::config::{OutputConfig, OutputFormat};
use crate::crawler::{GameDetail, ItemRecord};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing records
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Destination for crawled records
///
/// Records are written as they arrive; `finish` flushes whatever the sink
/// buffers and must be called once the task is done.
pub trait ItemSink: Send {
    /// Writes one listing item
    fn write_item(&mut self, item: &ItemRecord) -> OutputResult<()>;

    /// Writes one detail record
    fn write_detail(&mut self, detail: &GameDetail) -> OutputResult<()>;

    /// Flushes buffered records
    fn finish(&mut self) -> OutputResult<()>;
}

/// Opens the sink listing items are written to
pub fn open_items_sink(config: &OutputConfig) -> OutputResult<Box<dyn ItemSink>> {
    open_sink(config.format, Path::new(&config.items_path))
}

/// Opens the sink detail records are written to
///
/// SQLite keeps both record kinds in one database; JSON lines get their own
/// file.
pub fn open_details_sink(config: &OutputConfig) -> OutputResult<Box<dyn ItemSink>> {
    match config.format {
        OutputFormat::Jsonl => open_sink(config.format, Path::new(&config.details_path)),
        OutputFormat::Sqlite => open_sink(config.format, Path::new(&config.items_path)),
    }
}

fn open_sink(format: OutputFormat, path: &Path) -> OutputResult<Box<dyn ItemSink>> {
    tracing::info!("Writing records to {} ({:?})", path.display(), format);
    let sink: Box<dyn ItemSink> = match format {
        OutputFormat::Jsonl => Box::new(JsonLinesSink::open(path)?),
        OutputFormat::Sqlite => Box::new(SqliteSink::open(path)?),
    };
    Ok(sink)
}
