use crate::normalizer::{normalize_entries, TimestampMode};
use crate::traits::FeedSource;
use crate::types::{AggregateReport, FeedOutcome, NewsItem};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Fetches a list of feeds and concatenates their normalized items.
///
/// Feeds are fetched up to `max_concurrency` at a time, but results are
/// always assembled in the order the URLs were given, and entries keep
/// their order within a feed. A feed that fails is logged and skipped.
pub struct BatchAggregator<S> {
    source: S,
    max_concurrency: usize,
}

impl<S: FeedSource> BatchAggregator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// `1` makes the run strictly sequential.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Items from the first `limit` feeds (all feeds when `limit` is `None`).
    pub async fn aggregate(&self, feed_urls: &[String], limit: Option<usize>) -> Vec<NewsItem> {
        self.aggregate_report(feed_urls, limit).await.items
    }

    /// Like [`aggregate`](Self::aggregate), also reporting what happened to
    /// each feed.
    pub async fn aggregate_report(&self, feed_urls: &[String], limit: Option<usize>) -> AggregateReport {
        let selected = match limit {
            Some(limit) if limit < feed_urls.len() => &feed_urls[..limit],
            _ => feed_urls,
        };

        info!(
            "Aggregating {} of {} feeds (concurrency {})",
            selected.len(),
            feed_urls.len(),
            self.max_concurrency
        );

        // `buffered` yields in input order regardless of completion order.
        let per_feed: Vec<(FeedOutcome, Vec<NewsItem>)> = stream::iter(selected)
            .map(|url| self.collect_feed(url))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut report = AggregateReport::default();
        for (outcome, items) in per_feed {
            report.items.extend(items);
            report.feeds.push(outcome);
        }

        let failed = report.failed_feeds().count();
        info!(
            "Aggregated {} items from {}/{} feeds",
            report.items.len(),
            report.feeds.len() - failed,
            report.feeds.len()
        );

        report
    }

    async fn collect_feed(&self, url: &str) -> (FeedOutcome, Vec<NewsItem>) {
        match self.source.fetch_entries(url).await {
            Ok(entries) => {
                let (items, skipped) = normalize_entries(&entries, TimestampMode::Plain);
                let outcome = FeedOutcome {
                    url: url.to_string(),
                    items: items.len(),
                    skipped_entries: skipped,
                    error: None,
                };
                (outcome, items)
            }
            Err(e) => {
                warn!("Skipping feed {}: {}", url, e);
                let outcome = FeedOutcome {
                    url: url.to_string(),
                    items: 0,
                    skipped_entries: 0,
                    error: Some(e.to_string()),
                };
                (outcome, Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FeedRegistry;
    use crate::types::{IngestError, RawEntry, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serves canned entries per URL; unknown URLs fail like an unreachable host.
    #[derive(Default)]
    struct StubSource {
        feeds: HashMap<String, Vec<RawEntry>>,
        delays_ms: HashMap<String, u64>,
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl StubSource {
        fn with_feed(mut self, url: &str, entries: Vec<RawEntry>) -> Self {
            self.feeds.insert(url.to_string(), entries);
            self
        }

        fn with_delay(mut self, url: &str, delay_ms: u64) -> Self {
            self.delays_ms.insert(url.to_string(), delay_ms);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl FeedSource for StubSource {
        async fn fetch_entries(&self, url: &str) -> Result<Vec<RawEntry>> {
            self.calls.lock().unwrap().push(url.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delays_ms.get(url) {
                tokio::time::sleep(Duration::from_millis(*delay)).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.feeds
                .get(url)
                .cloned()
                .ok_or_else(|| IngestError::FetchFailed {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                })
        }
    }

    fn entry(title: &str, link: Option<&str>) -> RawEntry {
        RawEntry {
            title: Some(title.to_string()),
            link: link.map(str::to_string),
            ..Default::default()
        }
    }

    fn titles(items: &[NewsItem]) -> Vec<&str> {
        items.iter().map(|item| item.title.as_str()).collect()
    }

    #[tokio::test]
    async fn reddit_limit_one_skips_entry_without_link() {
        let registry = FeedRegistry::builtin();
        let urls = registry.list_feeds(Some("reddit")).unwrap();
        let source = StubSource::default().with_feed(
            &urls[0],
            vec![
                entry("first", Some("https://www.reddit.com/r/technology/1")),
                entry("no link", None),
                entry("third", Some("https://www.reddit.com/r/technology/3")),
            ],
        );
        let aggregator = BatchAggregator::new(source);

        let items = aggregator.aggregate(&urls, Some(1)).await;

        assert_eq!(titles(&items), vec!["first", "third"]);
        assert_eq!(aggregator.source().calls(), vec![urls[0].clone()]);
    }

    #[tokio::test]
    async fn failed_feed_contributes_nothing_and_does_not_abort() {
        let urls: Vec<String> = vec![
            "https://one.example.com/rss".to_string(),
            "http://unreachable.invalid/rss".to_string(),
            "https://two.example.com/rss".to_string(),
        ];
        let source = StubSource::default()
            .with_feed(&urls[0], vec![entry("one-a", Some("https://one.example.com/a"))])
            .with_feed(
                &urls[2],
                vec![
                    entry("two-a", Some("https://two.example.com/a")),
                    entry("two-b", Some("https://two.example.com/b")),
                ],
            );

        let report = BatchAggregator::new(source).aggregate_report(&urls, None).await;

        assert_eq!(titles(&report.items), vec!["one-a", "two-a", "two-b"]);
        let failed: Vec<&str> = report.failed_feeds().map(|o| o.url.as_str()).collect();
        assert_eq!(failed, vec!["http://unreachable.invalid/rss"]);
        assert_eq!(report.feeds[2].items, 2);
    }

    #[tokio::test]
    async fn output_follows_feed_order_even_when_fetches_finish_out_of_order() {
        let urls: Vec<String> = (1..=4).map(|n| format!("https://feed{}.example.com/rss", n)).collect();
        let mut source = StubSource::default();
        for (index, url) in urls.iter().enumerate() {
            source = source
                .with_feed(
                    url,
                    vec![
                        entry(&format!("{}-a", index + 1), Some(&format!("{}/a", url))),
                        entry(&format!("{}-b", index + 1), Some(&format!("{}/b", url))),
                    ],
                )
                // earlier feeds take longer
                .with_delay(url, 80 - 20 * index as u64);
        }

        let aggregator = BatchAggregator::new(source).with_max_concurrency(4);
        let items = aggregator.aggregate(&urls, None).await;

        assert_eq!(
            titles(&items),
            vec!["1-a", "1-b", "2-a", "2-b", "3-a", "3-b", "4-a", "4-b"]
        );
        assert!(aggregator.source().peak_in_flight.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn concurrency_of_one_is_sequential() {
        let urls: Vec<String> = (1..=3).map(|n| format!("https://feed{}.example.com/rss", n)).collect();
        let mut source = StubSource::default();
        for url in &urls {
            source = source
                .with_feed(url, vec![entry(url, Some(&format!("{}/a", url)))])
                .with_delay(url, 10);
        }

        let aggregator = BatchAggregator::new(source).with_max_concurrency(1);
        aggregator.aggregate(&urls, None).await;

        assert_eq!(aggregator.source().peak_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(aggregator.source().calls(), urls);
    }

    #[tokio::test]
    async fn limit_caps_feeds_not_items() {
        let urls: Vec<String> = (1..=3).map(|n| format!("https://feed{}.example.com/rss", n)).collect();
        let mut source = StubSource::default();
        for url in &urls {
            source = source.with_feed(
                url,
                (0..5)
                    .map(|n| entry(&format!("{} #{}", url, n), Some(&format!("{}/{}", url, n))))
                    .collect(),
            );
        }
        let aggregator = BatchAggregator::new(source);

        assert_eq!(aggregator.aggregate(&urls, Some(2)).await.len(), 10);
        assert_eq!(aggregator.aggregate(&urls, Some(10)).await.len(), 15);
        assert!(aggregator.aggregate(&urls, Some(0)).await.is_empty());
    }
}
