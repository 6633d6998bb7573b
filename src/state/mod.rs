//! State module for tracking crawl progress
//!
//! This module provides the incremental crawl state that survives restarts.
//!
//! # Components
//!
//! - `PageCursor`: next page index for a category, or the exhausted-sentinel
//! - `CrawlState`: per-category cursors plus the global seen-id set
//! - `DetailState`: ids whose detail pages have already been requested
//! - `CategoryPhase`: lifecycle of one category within a single run
//! - `StateStore` / `StateGuard`: JSON persistence with save-on-any-exit

mod crawl_state;
mod cursor;
mod guard;
mod phase;
mod store;

// Re-export main types
pub use crawl_state::{CrawlState, DetailState, ItemId};
pub use cursor::PageCursor;
pub use guard::StateGuard;
pub use phase::{CategoryPhase, SuspendReason};
pub use store::{Snapshot, StateStore};
