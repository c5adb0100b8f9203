use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Canonical record produced from one feed entry.
///
/// `link` is the identity of an item; there is no separate id. Items are
/// plain values: nothing deduplicates them across feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: Url,
    /// Source-provided timestamp text, or an empty string when absent.
    pub published: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// A feed entry as parsed from the syndication document, before validation.
///
/// Every field is optional; the accessors return the documented default
/// when a field is missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    /// Timestamp text exactly as it appeared in the document.
    pub published_text: Option<String>,
    /// Timestamp as understood by the feed parser.
    pub published: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    /// Name of the originating outlet, when the entry carries one.
    pub source: Option<String>,
}

impl RawEntry {
    /// Title, or `""`.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Trimmed link, or `None` when missing or blank.
    pub fn link(&self) -> Option<&str> {
        self.link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }

    /// Verbatim timestamp text, or `None` when missing or blank.
    pub fn published_text(&self) -> Option<&str> {
        self.published_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Structured publish time, or `None`.
    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.published
    }

    /// Summary, or `""`.
    pub fn summary(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }

    /// Outlet name, or `None` when missing or blank.
    pub fn source(&self) -> Option<&str> {
        self.source
            .as_deref()
            .map(str::trim)
            .filter(|source| !source.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "news-ingest/0.1".to_string(),
            timeout_seconds: 30,
            max_retries: 2,
            retry_delay_ms: 1000,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

/// What happened to one feed during an aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedOutcome {
    pub url: String,
    pub items: usize,
    pub skipped_entries: usize,
    pub error: Option<String>,
}

impl FeedOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateReport {
    pub items: Vec<NewsItem>,
    pub feeds: Vec<FeedOutcome>,
}

impl AggregateReport {
    pub fn failed_feeds(&self) -> impl Iterator<Item = &FeedOutcome> {
        self.feeds.iter().filter(|outcome| !outcome.is_success())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Failed to fetch feed {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Export to {} failed: {reason}", .path.display())]
    ExportFailed { path: PathBuf, reason: String },

    #[error("Unknown feed category: {0}")]
    UnknownCategory(String),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, IngestError>;
