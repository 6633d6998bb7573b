//! Category maps: written by category discovery, read by the listing crawl

use crate::config::types::{default_test_categories, Config};
use crate::url::parse_address;
use crate::ScraperError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use url::Url;

/// A category listing to crawl
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTarget {
    pub name: String,
    pub base_address: Url,
}

impl CategoryTarget {
    pub fn new(name: impl Into<String>, base_address: Url) -> Self {
        Self {
            name: name.into(),
            base_address,
        }
    }
}

/// Category files hold a name -> address object; feed exports wrap it in
/// a one-element array.
#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryFile {
    Map(BTreeMap<String, String>),
    Wrapped(Vec<BTreeMap<String, String>>),
}

/// Reads a category map from a JSON file
pub fn load_categories(path: &Path) -> Result<BTreeMap<String, String>, ScraperError> {
    let content = fs::read_to_string(path)?;
    let file: CategoryFile = serde_json::from_str(&content).map_err(|e| ScraperError::Input {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match file {
        CategoryFile::Map(map) => Ok(map),
        CategoryFile::Wrapped(mut maps) if maps.len() == 1 => Ok(maps.remove(0)),
        CategoryFile::Wrapped(maps) => Err(ScraperError::Input {
            path: path.to_path_buf(),
            message: format!("expected one category map, found {}", maps.len()),
        }),
    }
}

/// Writes a category map as a JSON object
pub fn save_categories(path: &Path, categories: &BTreeMap<String, String>) -> Result<(), ScraperError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(categories).map_err(|e| ScraperError::Input {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    fs::write(path, json)?;

    tracing::info!("Wrote {} categories to {}", categories.len(), path.display());
    Ok(())
}

/// Resolves the categories the listing crawl should visit
///
/// Uses the `[[test-category]]` entries (or the built-in pair) when
/// `use-test-categories` is set, otherwise the categories file.
pub fn load_targets(config: &Config) -> Result<Vec<CategoryTarget>, ScraperError> {
    let entries: Vec<(String, String)> = if config.crawler.use_test_categories {
        let fixtures = if config.test_categories.is_empty() {
            default_test_categories()
        } else {
            config.test_categories.clone()
        };
        tracing::info!("Using {} test categories", fixtures.len());
        fixtures.into_iter().map(|c| (c.name, c.url)).collect()
    } else {
        let path = Path::new(&config.output.categories_path);
        tracing::info!("Getting categories from {}", path.display());
        load_categories(path)?.into_iter().collect()
    };

    entries
        .into_iter()
        .map(|(name, url)| Ok(CategoryTarget::new(name, parse_address(&url)?)))
        .collect()
}
