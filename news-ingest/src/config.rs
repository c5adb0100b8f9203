/*!
Runtime configuration for news-ingest.

Everything is optional: an empty file (or no file) yields the defaults.

```toml
[fetch]
timeout_seconds = 20
max_retries = 1

[aggregate]
max_concurrency = 8

[export]
tabular_dir = "news_data"
markdown_dir = "article_summaries"

[[feeds]]
url = "https://blog.rust-lang.org/feed.xml"
category = "rust"
```
*/

use crate::aggregator::DEFAULT_MAX_CONCURRENCY;
use crate::export::{DEFAULT_MARKDOWN_DIR, DEFAULT_TABULAR_DIR};
use crate::registry::{FeedRegistry, FeedSpec};
use crate::types::{FetchConfig, IngestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub max_concurrency: usize,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub tabular_dir: PathBuf,
    pub markdown_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            tabular_dir: PathBuf::from(DEFAULT_TABULAR_DIR),
            markdown_dir: PathBuf::from(DEFAULT_MARKDOWN_DIR),
        }
    }
}

/// Top-level configuration (deserialized from a TOML file)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub fetch: FetchConfig,
    pub aggregate: AggregateConfig,
    pub export: ExportConfig,
    /// Replaces the built-in registry when non-empty.
    pub feeds: Vec<FeedSpec>,
}

impl AppConfig {
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path).await.map_err(|e| {
            IngestError::Config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        toml::from_str(data)
            .map_err(|e| IngestError::Config(format!("failed to parse TOML configuration: {}", e)))
    }

    pub fn registry(&self) -> Result<FeedRegistry> {
        if self.feeds.is_empty() {
            Ok(FeedRegistry::builtin())
        } else {
            FeedRegistry::new(self.feeds.clone())
        }
    }
}
