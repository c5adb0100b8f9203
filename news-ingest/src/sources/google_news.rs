use crate::normalizer::{normalize_entries, TimestampMode};
use crate::recency::retain_recent;
use crate::rss_utils::url::encode_query;
use crate::traits::FeedSource;
use crate::types::{NewsItem, Result};
use chrono::{DateTime, Utc};
use tracing::info;

pub const GOOGLE_NEWS_BASE: &str = "https://news.google.com/rss";
pub const DEFAULT_HOURS_BACK: u32 = 6;
pub const DEFAULT_MAX_HEADLINES: usize = 100;

/// `hl`, `gl` and `ceid` parameters for a language/country edition.
fn edition_params(language: &str, country: &str) -> String {
    let hl = if language.contains('-') {
        language.to_string()
    } else {
        format!("{}-{}", language, country)
    };
    let ceid_language = language.split('-').next().unwrap_or(language);

    format!("hl={}&gl={}&ceid={}:{}", hl, country, country, ceid_language)
}

pub fn build_search_url(base: &str, query: &str, language: &str, country: &str) -> String {
    format!(
        "{}/search?q={}&{}",
        base,
        encode_query(query),
        edition_params(language, country)
    )
}

pub fn build_top_headlines_url(base: &str, language: &str, country: &str) -> String {
    format!("{}?{}", base, edition_params(language, country))
}

/// Google News RSS: keyword search over a recent window and top headlines
/// for an edition. Items carry ISO-8601 timestamps and the outlet name.
pub struct GoogleNewsSource<S> {
    source: S,
    base_url: String,
    language: String,
    country: String,
}

impl<S: FeedSource> GoogleNewsSource<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            base_url: GOOGLE_NEWS_BASE.to_string(),
            language: "en".to_string(),
            country: "US".to_string(),
        }
    }

    pub fn with_edition(mut self, language: &str, country: &str) -> Self {
        self.language = language.to_string();
        self.country = country.to_string();
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn search_url(&self, query: &str) -> String {
        build_search_url(&self.base_url, query, &self.language, &self.country)
    }

    pub fn top_headlines_url(&self) -> String {
        build_top_headlines_url(&self.base_url, &self.language, &self.country)
    }

    /// Articles matching `query` published within `hours_back` of `now`.
    pub async fn search(&self, query: &str, hours_back: u32, now: DateTime<Utc>) -> Result<Vec<NewsItem>> {
        let url = self.search_url(query);
        let entries = self.source.fetch_entries(&url).await?;
        let (items, skipped) = normalize_entries(&entries, TimestampMode::Structured);
        let total = items.len();
        let recent = retain_recent(items, hours_back, now);

        info!(
            "Google News search {:?}: {} recent of {} items ({} skipped, window {}h)",
            query,
            recent.len(),
            total,
            skipped,
            hours_back
        );
        Ok(recent)
    }

    /// The first `max_items` top stories, unfiltered by recency.
    pub async fn top_headlines(&self, max_items: usize) -> Result<Vec<NewsItem>> {
        let url = self.top_headlines_url();
        let mut entries = self.source.fetch_entries(&url).await?;
        entries.truncate(max_items);
        let (items, skipped) = normalize_entries(&entries, TimestampMode::Structured);

        info!(
            "Google News top headlines ({}/{}): {} items ({} skipped)",
            self.language,
            self.country,
            items.len(),
            skipped
        );
        Ok(items)
    }
}
