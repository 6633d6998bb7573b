use serde::Deserialize;

/// Main configuration structure for Games-Scraper
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    pub site: SiteConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub renderer: RendererConfig,
    pub output: OutputConfig,
    #[serde(rename = "test-category", default)]
    pub test_categories: Vec<CategoryEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum listing pages requested per category in one run
    #[serde(rename = "max-pages-per-category", default = "default_max_pages")]
    pub max_pages_per_category: u32,

    /// Number of items the store shows per listing page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Fixed delay between two requests (milliseconds)
    #[serde(rename = "request-delay", default = "default_request_delay")]
    pub request_delay: u64,

    /// How long the renderer waits for listing content (seconds)
    #[serde(rename = "wait-timeout", default = "default_wait_timeout")]
    pub wait_timeout: u64,

    /// Script run in the page so lazily loaded rows are rendered
    #[serde(rename = "scroll-script", default = "default_scroll_script")]
    pub scroll_script: String,

    /// Whether robots.txt is fetched and obeyed
    #[serde(rename = "obey-robots", default = "default_true")]
    pub obey_robots: bool,

    /// Crawl the `[[test-category]]` entries instead of the categories file
    #[serde(rename = "use-test-categories", default)]
    pub use_test_categories: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages_per_category: default_max_pages(),
            page_size: default_page_size(),
            request_delay: default_request_delay(),
            wait_timeout: default_wait_timeout(),
            scroll_script: default_scroll_script(),
            obey_robots: true,
            use_test_categories: false,
        }
    }
}

/// Addresses of the target store
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Store front page, where the category menu lives
    #[serde(rename = "index-url")]
    pub index_url: String,

    /// Base address detail pages are resolved against (`app/<id>`)
    #[serde(rename = "detail-base-url")]
    pub detail_base_url: String,
}

/// Request identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language header; some extracted labels depend on it
    #[serde(rename = "accept-language", default = "default_accept_language")]
    pub accept_language: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

/// Headless browser service used for script-rendered listings
#[derive(Debug, Clone, Deserialize)]
pub struct RendererConfig {
    /// Base address of the Browserless-compatible service
    #[serde(default = "default_renderer_endpoint")]
    pub endpoint: String,

    /// API token, if the service requires one
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            endpoint: default_renderer_endpoint(),
            token: None,
        }
    }
}

/// Where items and crawl state are written
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Listing crawl state (cursors and seen ids)
    #[serde(rename = "state-path")]
    pub state_path: String,

    /// JSON array of every seen id, input of the detail crawl
    #[serde(rename = "ids-path")]
    pub ids_path: String,

    /// Category map written by discovery and read by the listing crawl
    #[serde(rename = "categories-path")]
    pub categories_path: String,

    /// Detail crawl state (ids already requested)
    #[serde(rename = "detail-state-path")]
    pub detail_state_path: String,

    /// Item sink location (the whole database for `sqlite`)
    #[serde(rename = "items-path")]
    pub items_path: String,

    /// Detail records, for the `jsonl` format
    #[serde(rename = "details-path", default = "default_details_path")]
    pub details_path: String,

    /// Item sink format
    #[serde(default)]
    pub format: OutputFormat,
}

/// Supported item sink formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    Jsonl,
    /// SQLite database with `items` and `details` tables
    Sqlite,
}

/// A fixed category used instead of the discovered ones
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub url: String,
}

fn default_max_pages() -> u32 {
    4
}

fn default_page_size() -> u32 {
    12
}

fn default_request_delay() -> u64 {
    2500
}

fn default_wait_timeout() -> u64 {
    15
}

fn default_scroll_script() -> String {
    "window.scrollTo(0, 2600)".to_string()
}

fn default_details_path() -> String {
    "data/details.jsonl".to_string()
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/112.0".to_string()
}

fn default_accept_language() -> String {
    "es-ES,es;q=0.8,en-US;q=0.5,en;q=0.3".to_string()
}

fn default_renderer_endpoint() -> String {
    "http://localhost:3000".to_string()
}

/// Categories crawled when `use-test-categories` is set and none are listed
pub fn default_test_categories() -> Vec<CategoryEntry> {
    vec![
        CategoryEntry {
            name: "singleplayer".to_string(),
            url: "https://store.steampowered.com/category/singleplayer/".to_string(),
        },
        CategoryEntry {
            name: "multiplayer".to_string(),
            url: "https://store.steampowered.com/category/multiplayer_online_competitive"
                .to_string(),
        },
    ]
}
