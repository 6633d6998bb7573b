//! Request pacing and robots.txt obedience for any renderer

use crate::crawler::fetcher::{PageRenderer, RenderRequest};
use crate::robots::RobotsRules;
use crate::FetchError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Wraps a renderer with a fixed delay between requests and robots.txt checks
///
/// The crawl core does no throttling of its own; every request to the store
/// goes through one of these.
pub struct PoliteRenderer<R> {
    inner: R,
    delay: Duration,
    robots: RobotsRules,
    user_agent: String,
    last_request: Mutex<Option<Instant>>,
}

impl<R: PageRenderer> PoliteRenderer<R> {
    /// Creates a wrapper enforcing `delay` between requests
    ///
    /// A `Crawl-delay` in `robots` longer than `delay` takes precedence.
    pub fn new(inner: R, delay: Duration, robots: RobotsRules, user_agent: impl Into<String>) -> Self {
        let user_agent = user_agent.into();
        let delay = match robots.crawl_delay(&user_agent) {
            Some(crawl_delay) if crawl_delay > delay => {
                tracing::info!(
                    "robots.txt asks for a {:?} crawl delay, using it instead of {:?}",
                    crawl_delay,
                    delay
                );
                crawl_delay
            }
            _ => delay,
        };

        Self {
            inner,
            delay,
            robots,
            user_agent,
            last_request: Mutex::new(None),
        }
    }

    /// The delay actually enforced between requests
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits until the next request may start and records it
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.delay {
                tokio::time::sleep(self.delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl<R: PageRenderer> PageRenderer for PoliteRenderer<R> {
    async fn render(&self, request: &RenderRequest) -> Result<String, FetchError> {
        if !self.robots.is_allowed(request.address.as_str(), &self.user_agent) {
            return Err(FetchError::Disallowed {
                url: request.address.to_string(),
            });
        }

        self.pace().await;
        self.inner.render(request).await
    }
}
