use crate::rss_utils::url::is_valid_feed_url;
use crate::types::{IngestError, NewsItem, RawEntry, Result};
use chrono::{DateTime, Utc};
use tracing::warn;
use url::Url;

/// How the `published` field of a [`NewsItem`] is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampMode {
    /// Keep the publisher's timestamp text as written.
    #[default]
    Plain,
    /// Render the parsed publish time as `YYYY-MM-DDTHH:MM:SS` (UTC) and
    /// carry the outlet name into `source`.
    Structured,
}

pub fn normalize(raw: &RawEntry, mode: TimestampMode) -> Result<NewsItem> {
    let link = raw
        .link()
        .ok_or_else(|| IngestError::InvalidItem("entry has no link".to_string()))?;

    let link = Url::parse(link)
        .map_err(|e| IngestError::InvalidItem(format!("malformed link {:?}: {}", link, e)))?;
    if !is_valid_feed_url(link.as_str()) {
        return Err(IngestError::InvalidItem(format!(
            "link {} is not an http(s) URL",
            link
        )));
    }

    let (published, source) = match mode {
        TimestampMode::Plain => {
            let published = raw
                .published_text()
                .map(str::to_string)
                .or_else(|| raw.published().map(|ts| ts.to_rfc2822()))
                .unwrap_or_default();
            (published, None)
        }
        TimestampMode::Structured => {
            let published = raw.published().map(iso_timestamp).unwrap_or_default();
            (published, raw.source().map(str::to_string))
        }
    };

    Ok(NewsItem {
        title: raw.title().to_string(),
        link,
        published,
        summary: raw.summary().to_string(),
        source,
    })
}

/// Normalizes every entry, skipping the ones that fail. Returns the items in
/// entry order and the number of skipped entries.
pub fn normalize_entries(entries: &[RawEntry], mode: TimestampMode) -> (Vec<NewsItem>, usize) {
    let mut items = Vec::with_capacity(entries.len());
    let mut skipped = 0;

    for entry in entries {
        match normalize(entry, mode) {
            Ok(item) => items.push(item),
            Err(e) => {
                warn!("Skipping entry {:?}: {}", entry.title(), e);
                skipped += 1;
            }
        }
    }

    (items, skipped)
}

pub fn iso_timestamp(ts: DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%dT%H:%M:%S").to_string()
}
