//! Headless-browser rendering through a Browserless-compatible service

use crate::config::{RendererConfig, UserAgentConfig};
use crate::crawler::fetcher::{classify_transport_error, PageRenderer, RenderRequest};
use crate::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Slack on top of the page wait before the HTTP call itself gives up
const REQUEST_SLACK: Duration = Duration::from_secs(15);

/// Renders pages with the service's `/content` endpoint
pub struct BrowserlessRenderer {
    client: Client,
    endpoint: String,
    token: Option<String>,
    user_agent: String,
    accept_language: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContentRequest<'a> {
    url: &'a str,
    user_agent: &'a str,
    #[serde(rename = "setExtraHTTPHeaders")]
    set_extra_http_headers: HashMap<&'static str, &'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    add_script_tag: Vec<ScriptTag<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for_selector: Option<WaitForSelector<'a>>,
}

#[derive(Serialize)]
struct ScriptTag<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct WaitForSelector<'a> {
    selector: &'a str,
    timeout: u64,
}

impl BrowserlessRenderer {
    pub fn new(renderer: &RendererConfig, identity: &UserAgentConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: renderer.endpoint.trim_end_matches('/').to_string(),
            token: renderer.token.clone(),
            user_agent: identity.user_agent.clone(),
            accept_language: identity.accept_language.clone(),
        }
    }

    fn content_endpoint(&self, page: &Url) -> Result<Url, FetchError> {
        let mut endpoint =
            Url::parse(&format!("{}/content", self.endpoint)).map_err(|e| FetchError::Renderer {
                url: page.to_string(),
                message: format!("invalid renderer endpoint {}: {}", self.endpoint, e),
            })?;
        if let Some(token) = &self.token {
            endpoint.query_pairs_mut().append_pair("token", token);
        }
        Ok(endpoint)
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
        let mut headers = HashMap::new();
        headers.insert("Accept-Language", self.accept_language.as_str());

        let body = ContentRequest {
            url: request.address.as_str(),
            user_agent: &self.user_agent,
            set_extra_http_headers: headers,
            add_script_tag: request
                .scroll_script
                .as_deref()
                .map(|content| vec![ScriptTag { content }])
                .unwrap_or_default(),
            wait_for_selector: request.wait_for.as_deref().map(|selector| WaitForSelector {
                selector,
                timeout: request.wait_timeout.as_millis() as u64,
            }),
        };

        tracing::debug!("Rendering {} via {}", request.address, self.endpoint);

        let response = self
            .client
            .post(self.content_endpoint(&request.address)?)
            .timeout(request.wait_timeout + REQUEST_SLACK)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(&request.address, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Renderer {
                url: request.address.to_string(),
                message: format!("HTTP {}: {}", status.as_u16(), message.trim()),
            });
        }

        response
            .text()
            .await
            .map_err(|e| classify_transport_error(&request.address, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn identity() -> UserAgentConfig {
        UserAgentConfig {
            user_agent: "TestCrawler/1.0".to_string(),
            accept_language: "es-ES".to_string(),
        }
    }

    fn listing_request() -> RenderRequest {
        RenderRequest {
            address: Url::parse("https://store.example.com/category/rpg/?offset=12").unwrap(),
            scroll_script: Some("window.scrollTo(0, 2600)".to_string()),
            wait_for: Some(".row, .empty".to_string()),
            wait_timeout: Duration::from_secs(15),
        }
    }

    #[tokio::test]
    async fn test_render_posts_script_and_wait_condition() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .and(query_param("token", "secret"))
            .and(body_partial_json(serde_json::json!({
                "url": "https://store.example.com/category/rpg/?offset=12",
                "userAgent": "TestCrawler/1.0",
                "setExtraHTTPHeaders": { "Accept-Language": "es-ES" },
                "addScriptTag": [{ "content": "window.scrollTo(0, 2600)" }],
                "waitForSelector": { "selector": ".row, .empty", "timeout": 15000 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>rendered</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let renderer = BrowserlessRenderer::new(
            &RendererConfig {
                endpoint: format!("{}/", server.uri()),
                token: Some("secret".to_string()),
            },
            &identity(),
        );

        let html = renderer.render(&listing_request()).await.unwrap();
        assert_eq!(html, "<html>rendered</html>");
    }

    #[tokio::test]
    async fn test_token_is_query_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .and(query_param("token", "a&b=c d"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let renderer = BrowserlessRenderer::new(
            &RendererConfig {
                endpoint: server.uri(),
                token: Some("a&b=c d".to_string()),
            },
            &identity(),
        );

        let endpoint = renderer.content_endpoint(&listing_request().address).unwrap();
        assert_eq!(endpoint.query(), Some("token=a%26b%3Dc+d"));
        renderer.render(&listing_request()).await.unwrap();
    }

    #[tokio::test]
    async fn test_render_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/content"))
            .respond_with(ResponseTemplate::new(408).set_body_string("Timed out waiting for selector"))
            .mount(&server)
            .await;

        let renderer = BrowserlessRenderer::new(
            &RendererConfig {
                endpoint: server.uri(),
                token: None,
            },
            &identity(),
        );

        match renderer.render(&listing_request()).await {
            Err(FetchError::Renderer { url, message }) => {
                assert!(url.contains("offset=12"));
                assert!(message.contains("408"));
            }
            other => panic!("expected renderer error, got {:?}", other),
        }
    }
}
