pub mod types;
pub mod config;
pub mod registry;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod normalizer;
pub mod recency;
pub mod aggregator;
pub mod export;
pub mod sources;
pub mod rss_utils;

pub use types::*;
pub use config::AppConfig;
pub use registry::{FeedRegistry, FeedSpec};
pub use traits::FeedSource;
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use normalizer::{normalize, TimestampMode};
pub use recency::is_recent;
pub use aggregator::BatchAggregator;
pub use export::{read_tabular, Exporter};
pub use sources::GoogleNewsSource;
