//! Page fetching layer
//!
//! This module defines the capability the crawl core depends on, rendering a
//! page and returning its HTML, plus the plain HTTP implementation used for
//! pages that need no script execution (store index, detail pages):
//! - Building HTTP clients with the configured identity headers
//! - GET requests with status and timeout classification

use crate::config::UserAgentConfig;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, COOKIE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Cookies that get past the store's age gate on detail pages
pub const AGE_GATE_COOKIES: &str =
    "wants_mature_content=1; birthtime=786254401; lastagecheckage=1-0-1995";

/// One page to render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Address of the page
    pub address: Url,

    /// Script executed once the page has loaded
    pub scroll_script: Option<String>,

    /// CSS selector that must be present before the HTML is captured
    pub wait_for: Option<String>,

    /// How long to wait for `wait_for`
    pub wait_timeout: Duration,
}

impl RenderRequest {
    /// A request with no script and no wait condition
    pub fn plain(address: Url) -> Self {
        Self {
            address,
            scroll_script: None,
            wait_for: None,
            wait_timeout: Duration::from_secs(30),
        }
    }
}

/// Something that turns an address into rendered HTML
///
/// The crawl core depends only on this capability, not on a particular
/// rendering engine.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError>;
}

#[async_trait]
impl<R: PageRenderer + ?Sized> PageRenderer for std::sync::Arc<R> {
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
        (**self).render(request).await
    }
}

/// Builds an HTTP client with the configured identity headers
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `with_age_gate` - Whether to send the age-gate cookies on every request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(FetchError)` - Invalid header value or TLS backend failure
pub fn build_http_client(config: &UserAgentConfig, with_age_gate: bool) -> Result<Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_str(&config.accept_language).map_err(|e| FetchError::Renderer {
            url: String::new(),
            message: format!("invalid accept-language header: {}", e),
        })?,
    );
    if with_age_gate {
        headers.insert(COOKIE, HeaderValue::from_static(AGE_GATE_COOKIES));
    }

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|source| FetchError::Http {
            url: String::new(),
            source,
        })
}

/// Renders pages with a plain GET, ignoring script and wait condition
#[derive(Debug, Clone)]
pub struct HttpRenderer {
    client: Client,
}

impl HttpRenderer {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageRenderer for HttpRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
        fetch_html(&self.client, &request.address).await
    }
}

/// Fetches a page body, classifying failures
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx | body |
/// | other status | `Status` |
/// | timeout | `Timeout` |
/// | other transport error | `Http` |
pub async fn fetch_html(client: &Client, url: &Url) -> Result<String, FetchError> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| classify_transport_error(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(String::new());
    }

    response
        .text()
        .await
        .map_err(|e| classify_transport_error(url, e))
}

pub(crate) fn classify_transport_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
