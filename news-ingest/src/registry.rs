use crate::rss_utils::url::is_valid_feed_url;
use crate::types::{IngestError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Category name that selects the whole registry.
pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSpec {
    pub url: String,
    pub category: String,
}

impl FeedSpec {
    pub fn new(url: &str, category: &str) -> Self {
        Self {
            url: url.to_string(),
            category: category.to_string(),
        }
    }
}

const BUILTIN_FEEDS: &[(&str, &str)] = &[
    // Arabic tech press
    ("arabic", "https://aitnews.com/feed"),
    ("arabic", "https://www.tech-wd.com/wd/feed"),
    ("arabic", "https://www.unlimit-tech.com/feed"),
    ("arabic", "https://www.electrony.net/feed/"),
    ("arabic", "https://menatech.net/feed/"),
    ("arabic", "http://feeds.feedburner.com/arabhardware"),
    ("arabic", "https://www.aljazeera.net/aljazeera/rss"),
    // International tech press
    ("international", "http://feeds.feedburner.com/TechCrunch"),
    ("international", "https://www.theverge.com/rss/index.xml"),
    ("international", "https://www.engadget.com/rss.xml"),
    ("international", "https://www.cnet.com/rss/news/"),
    ("international", "https://www.wired.com/feed/rss"),
    ("international", "http://feeds.arstechnica.com/arstechnica/index"),
    ("international", "https://gizmodo.com/rss"),
    ("international", "https://www.zdnet.com/news/rss.xml"),
    ("international", "https://www.techradar.com/rss"),
    ("international", "https://mashable.com/feeds/rss/tech"),
    // General news, technology sections
    ("general", "http://feeds.bbci.co.uk/news/technology/rss.xml"),
    ("general", "https://edition.cnn.com/rss/edition_technology.rss"),
    // Community discussion
    ("reddit", "https://www.reddit.com/r/technology/.rss"),
    ("reddit", "https://www.reddit.com/r/technews/.rss"),
];

/// Static, ordered catalog of feeds grouped into categories.
///
/// Categories are matched case-insensitively. Asking for a category the
/// registry does not contain is an error rather than a silent fallback to
/// every feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRegistry {
    feeds: Vec<FeedSpec>,
}

impl Default for FeedRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FeedRegistry {
    pub fn builtin() -> Self {
        let feeds = BUILTIN_FEEDS
            .iter()
            .map(|(category, url)| FeedSpec::new(url, category))
            .collect();
        Self { feeds }
    }

    /// Registry from caller-supplied feeds, kept in the given order.
    pub fn new(feeds: Vec<FeedSpec>) -> Result<Self> {
        for feed in &feeds {
            if !is_valid_feed_url(&feed.url) {
                return Err(IngestError::Config(format!("invalid feed URL: {}", feed.url)));
            }
            if feed.category.trim().is_empty() {
                return Err(IngestError::Config(format!("feed {} has no category", feed.url)));
            }
            if feed.category.eq_ignore_ascii_case(ALL_CATEGORIES) {
                return Err(IngestError::Config(format!(
                    "feed {} uses the reserved category name \"{}\"",
                    feed.url, ALL_CATEGORIES
                )));
            }
        }

        debug!("Loaded feed registry with {} feeds", feeds.len());
        Ok(Self { feeds })
    }

    pub fn feeds(&self) -> &[FeedSpec] {
        &self.feeds
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Distinct category names in first-appearance order.
    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = Vec::new();
        for feed in &self.feeds {
            if !categories.iter().any(|c| c.eq_ignore_ascii_case(&feed.category)) {
                categories.push(&feed.category);
            }
        }
        categories
    }

    /// Feed URLs of `category` in declaration order; `None` or `"all"`
    /// returns the whole registry.
    pub fn list_feeds(&self, category: Option<&str>) -> Result<Vec<String>> {
        let category = match category.map(str::trim) {
            None => return Ok(self.all_urls()),
            Some(name) if name.eq_ignore_ascii_case(ALL_CATEGORIES) => return Ok(self.all_urls()),
            Some(name) => name,
        };

        let urls: Vec<String> = self
            .feeds
            .iter()
            .filter(|feed| feed.category.eq_ignore_ascii_case(category))
            .map(|feed| feed.url.clone())
            .collect();

        if urls.is_empty() {
            return Err(IngestError::UnknownCategory(category.to_string()));
        }
        Ok(urls)
    }

    fn all_urls(&self) -> Vec<String> {
        self.feeds.iter().map(|feed| feed.url.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_expected_shape() {
        let registry = FeedRegistry::builtin();

        assert_eq!(registry.len(), 21);
        assert_eq!(
            registry.categories(),
            vec!["arabic", "international", "general", "reddit"]
        );
    }

    #[test]
    fn category_is_an_ordered_strict_subset() {
        let registry = FeedRegistry::builtin();
        let all = registry.list_feeds(None).unwrap();
        let arabic = registry.list_feeds(Some("arabic")).unwrap();

        assert_eq!(arabic.len(), 7);
        assert!(arabic.len() < all.len());
        // contiguous run of the full registry, same order
        let start = all.iter().position(|url| url == &arabic[0]).unwrap();
        assert_eq!(&all[start..start + arabic.len()], arabic.as_slice());
    }

    #[test]
    fn listing_is_repeatable() {
        let registry = FeedRegistry::builtin();

        assert_eq!(registry.list_feeds(None).unwrap(), registry.list_feeds(None).unwrap());
    }

    #[test]
    fn all_sentinel_and_case_are_accepted() {
        let registry = FeedRegistry::builtin();

        assert_eq!(
            registry.list_feeds(Some("ALL")).unwrap(),
            registry.list_feeds(None).unwrap()
        );
        assert_eq!(
            registry.list_feeds(Some("Reddit")).unwrap(),
            vec![
                "https://www.reddit.com/r/technology/.rss".to_string(),
                "https://www.reddit.com/r/technews/.rss".to_string(),
            ]
        );
    }

    #[test]
    fn unknown_category_is_an_error() {
        let registry = FeedRegistry::builtin();

        match registry.list_feeds(Some("sports")) {
            Err(IngestError::UnknownCategory(name)) => assert_eq!(name, "sports"),
            other => panic!("expected UnknownCategory, got {:?}", other),
        }
    }

    #[test]
    fn custom_registry_validates_entries() {
        let ok = FeedRegistry::new(vec![
            FeedSpec::new("https://blog.rust-lang.org/feed.xml", "rust"),
            FeedSpec::new("https://this-week-in-rust.org/rss.xml", "rust"),
        ])
        .unwrap();
        assert_eq!(ok.list_feeds(Some("rust")).unwrap().len(), 2);

        let bad_url = FeedRegistry::new(vec![FeedSpec::new("not-a-url", "rust")]);
        assert!(matches!(bad_url, Err(IngestError::Config(_))));

        let reserved = FeedRegistry::new(vec![FeedSpec::new("https://a.example.com/rss", "All")]);
        assert!(matches!(reserved, Err(IngestError::Config(_))));
    }
}
