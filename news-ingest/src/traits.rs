use crate::types::{RawEntry, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Anything that can turn a feed URL into raw entries.
///
/// Implementations report every retrieval or parse problem as
/// [`IngestError::FetchFailed`](crate::IngestError::FetchFailed) so callers
/// can isolate failures per feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<RawEntry>>;
}

#[async_trait]
impl<T: FeedSource + ?Sized> FeedSource for Arc<T> {
    async fn fetch_entries(&self, url: &str) -> Result<Vec<RawEntry>> {
        (**self).fetch_entries(url).await
    }
}
