use crate::types::NewsItem;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Best-effort parse of a published timestamp. Accepts RFC 3339, RFC 2822
/// and offset-less ISO-8601 (read as UTC).
pub fn parse_published(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(text) {
        return Some(ts.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// An item is recent when its timestamp is not earlier than
/// `now - cutoff_hours`. Items without a parseable timestamp are kept.
pub fn is_recent(item: &NewsItem, cutoff_hours: u32, now: DateTime<Utc>) -> bool {
    let Some(published) = parse_published(&item.published) else {
        return true;
    };
    // a window reaching past the representable range has no lower bound
    match now.checked_sub_signed(Duration::hours(i64::from(cutoff_hours))) {
        Some(cutoff) => published >= cutoff,
        None => true,
    }
}

pub fn retain_recent(items: Vec<NewsItem>, cutoff_hours: u32, now: DateTime<Utc>) -> Vec<NewsItem> {
    items
        .into_iter()
        .filter(|item| is_recent(item, cutoff_hours, now))
        .collect()
}
