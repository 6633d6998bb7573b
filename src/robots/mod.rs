//! Robots.txt handling module
//!
//! The store's robots.txt is fetched once per task and checked before every
//! request when `obey-robots` is enabled.

mod rules;

pub use rules::RobotsRules;

use crate::FetchError;
use reqwest::{Client, StatusCode};
use url::Url;

/// Fetches and parses robots.txt for the origin of `site`
///
/// A missing robots.txt (any 4xx) allows everything. Server errors and
/// network failures are returned so the caller decides whether to proceed.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `site` - Any address on the site
///
/// # Returns
///
/// * `Ok(RobotsRules)` - The rules to obey
/// * `Err(FetchError)` - robots.txt could not be retrieved
pub async fn fetch_robots(client: &Client, site: &Url) -> Result<RobotsRules, FetchError> {
    let robots_url = site.join("/robots.txt").map_err(|e| FetchError::Renderer {
        url: site.to_string(),
        message: format!("cannot build robots.txt address: {}", e),
    })?;

    tracing::debug!("Fetching robots.txt from {}", robots_url);

    let response = client
        .get(robots_url.as_str())
        .send()
        .await
        .map_err(|source| FetchError::Http {
            url: robots_url.to_string(),
            source,
        })?;

    let status = response.status();
    if status.is_client_error() {
        tracing::info!("No robots.txt at {} (HTTP {}), allowing all", robots_url, status);
        return Ok(RobotsRules::allow_all());
    }

    if status != StatusCode::OK {
        return Err(FetchError::Status {
            url: robots_url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| FetchError::Http {
        url: robots_url.to_string(),
        source,
    })?;

    Ok(RobotsRules::from_content(&body))
}
