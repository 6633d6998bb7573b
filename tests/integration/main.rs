//! Integration tests for the crawl tasks
//!
//! Listing tests drive the orchestrator with a scripted in-memory renderer;
//! task tests run against wiremock servers.

mod common;
mod listings;
mod tasks;
