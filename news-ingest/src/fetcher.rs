use crate::parser::FeedParser;
use crate::rss_utils::url::is_valid_feed_url;
use crate::traits::FeedSource;
use crate::types::{FetchConfig, IngestError, RawEntry, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// HTTP feed retrieval with timeout, bounded retries and a body size cap.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

fn fetch_failed(url: &str, reason: impl Into<String>) -> IngestError {
    IngestError::FetchFailed {
        url: url.to_string(),
        reason: reason.into(),
    }
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetches and parses one feed. Any failure, including unparseable
    /// content, comes back as `FetchFailed`.
    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<RawEntry>> {
        let body = self.fetch_body(url).await?;

        FeedParser::parse_entries_at(&body, Some(url)).map_err(|e| fetch_failed(url, e.to_string()))
    }

    /// Retrieves the raw feed document. Network errors, 5xx and 429 are
    /// retried with exponential backoff; other statuses fail immediately.
    pub async fn fetch_body(&self, url: &str) -> Result<Vec<u8>> {
        if !is_valid_feed_url(url) {
            return Err(fetch_failed(url, "not an absolute http(s) URL"));
        }

        let start_time = Instant::now();
        let retry_delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut backoff = ExponentialBackoff {
            current_interval: retry_delay,
            initial_interval: retry_delay,
            max_interval: retry_delay * 32,
            multiplier: 2.0,
            max_elapsed_time: None,
            ..Default::default()
        };

        let mut last_error = String::from("no attempt made");

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = backoff.next_backoff().unwrap_or(retry_delay);
                warn!("Attempt {} failed for {}, retrying in {:?}", attempt, url, delay);
                tokio::time::sleep(delay).await;
            }

            debug!("Fetching feed: {} (attempt {})", url, attempt + 1);

            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) => {
                    last_error = format!("network error: {}", e);
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                last_error = format!("HTTP {}", status);
                continue;
            }
            if !status.is_success() {
                warn!("Feed {} answered HTTP {}, not retrying", url, status);
                return Err(fetch_failed(url, format!("HTTP {}", status)));
            }

            if let Some(content_length) = response.content_length() {
                self.check_size(url, content_length as usize)?;
            }

            match response.bytes().await {
                Ok(body) => {
                    self.check_size(url, body.len())?;
                    info!(
                        "Fetched feed: {} ({} bytes in {} ms)",
                        url,
                        body.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(body.to_vec());
                }
                Err(e) => {
                    last_error = format!("failed to read body: {}", e);
                }
            }
        }

        error!(
            "Failed to fetch feed after {} attempts: {} ({})",
            self.config.max_retries + 1,
            url,
            last_error
        );
        Err(fetch_failed(url, last_error))
    }

    fn check_size(&self, url: &str, size_bytes: usize) -> Result<()> {
        let limit = self.config.max_feed_size_mb * 1024 * 1024;
        if size_bytes > limit {
            return Err(fetch_failed(
                url,
                format!(
                    "feed is {} bytes, limit is {}MB",
                    size_bytes, self.config.max_feed_size_mb
                ),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedSource for Fetcher {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<RawEntry>> {
        self.fetch_feed(url).await
    }
}
