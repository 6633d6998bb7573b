use crate::config::types::{
    CategoryEntry, Config, CrawlerConfig, OutputConfig, RendererConfig, SiteConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_site_config(&config.site)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_renderer_config(&config.renderer)?;
    validate_output_config(&config.output)?;
    validate_test_categories(&config.test_categories)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages_per_category < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages_per_category must be >= 1, got {}",
            config.max_pages_per_category
        )));
    }

    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "page_size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    if config.request_delay < 100 {
        return Err(ConfigError::Validation(format!(
            "request_delay must be >= 100ms, got {}ms",
            config.request_delay
        )));
    }

    if config.wait_timeout < 1 || config.wait_timeout > 120 {
        return Err(ConfigError::Validation(format!(
            "wait_timeout must be between 1 and 120 seconds, got {}",
            config.wait_timeout
        )));
    }

    Ok(())
}

/// Validates the store addresses
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("index_url", &config.index_url)?;
    let detail_base = validate_http_url("detail_base_url", &config.detail_base_url)?;

    // Detail addresses are joined onto this base, which drops a last segment
    // not followed by a slash
    if !detail_base.path().ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "detail_base_url must end with '/', got '{}'",
            config.detail_base_url
        )));
    }

    Ok(())
}

/// Validates request identification
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.accept_language.trim().is_empty() {
        return Err(ConfigError::Validation(
            "accept_language cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the rendering service address
fn validate_renderer_config(config: &RendererConfig) -> Result<(), ConfigError> {
    validate_http_url("renderer endpoint", &config.endpoint)?;

    if matches!(&config.token, Some(token) if token.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "renderer token cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let paths = [
        ("state_path", &config.state_path),
        ("ids_path", &config.ids_path),
        ("categories_path", &config.categories_path),
        ("detail_state_path", &config.detail_state_path),
        ("items_path", &config.items_path),
        ("details_path", &config.details_path),
    ];

    for (name, path) in paths {
        if path.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    if config.state_path == config.detail_state_path {
        return Err(ConfigError::Validation(
            "state_path and detail_state_path must differ".to_string(),
        ));
    }

    Ok(())
}

/// Validates fixed test categories
fn validate_test_categories(entries: &[CategoryEntry]) -> Result<(), ConfigError> {
    for entry in entries {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "test category name cannot be empty".to_string(),
            ));
        }
        validate_http_url(&format!("test category '{}'", entry.name), &entry.url)?;
    }

    Ok(())
}

/// Parses an address and checks it is HTTP(S)
fn validate_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use HTTP or HTTPS",
            field, value
        )));
    }

    Ok(url)
}
