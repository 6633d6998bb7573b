//! Configuration module for Games-Scraper
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and turning the configured category source into crawl targets.
//!
//! # Example
//!
//! ```no_run
//! use games_scraper::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scraper.toml")).unwrap();
//! println!("Pages per category: {}", config.crawler.max_pages_per_category);
//! ```

mod categories;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_test_categories, CategoryEntry, Config, CrawlerConfig, OutputConfig, OutputFormat,
    RendererConfig, SiteConfig, UserAgentConfig,
};

// Re-export parser functions
pub use categories::{load_categories, load_targets, save_categories, CategoryTarget};
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
